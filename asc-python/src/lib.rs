//! Python bindings for the ASC log decoder with numpy column access.
//!
//! Each record kind is exposed as a columnar table (one array per field),
//! which maps directly onto a pandas DataFrame via `to_dict()`.

use asc_core::{
    AscDecoder, Blink, DecodeError, DecodeResult, Eye, Fixation, MalformedLine, Message, Saccade,
    Sample,
};
use numpy::{IntoPyArray, PyArray1};
use pyo3::exceptions::PyIOError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn eye_tokens(eyes: &[Eye]) -> Vec<&'static str> {
    eyes.iter().map(Eye::as_str).collect()
}

/// Decoded gaze samples.
///
/// Missing gaze coordinates (the `.` sentinel) are NaN in `x` and `y`.
#[pyclass]
pub struct Samples {
    /// Timestamps in milliseconds
    timestamp: Vec<f64>,
    /// Horizontal gaze, NaN when missing
    x: Vec<f64>,
    /// Vertical gaze, NaN when missing
    y: Vec<f64>,
    /// Pupil sizes
    pupil_size: Vec<f64>,
}

#[pymethods]
impl Samples {
    fn __len__(&self) -> usize {
        self.timestamp.len()
    }

    fn __repr__(&self) -> String {
        let missing = self.x.iter().zip(&self.y).filter(|(x, y)| x.is_nan() || y.is_nan()).count();
        format!("Samples(count={}, missing_gaze={})", self.timestamp.len(), missing)
    }

    /// Returns the timestamps as a numpy array (in milliseconds).
    #[getter]
    fn timestamp<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.timestamp.clone().into_pyarray(py)
    }

    /// Returns the horizontal gaze positions as a numpy array.
    #[getter]
    fn x<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.x.clone().into_pyarray(py)
    }

    /// Returns the vertical gaze positions as a numpy array.
    #[getter]
    fn y<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.y.clone().into_pyarray(py)
    }

    #[getter]
    fn pupil_size<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.pupil_size.clone().into_pyarray(py)
    }

    /// Returns all columns as a dictionary.
    ///
    /// This is useful for creating a pandas DataFrame.
    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        dict.set_item("timestamp", self.timestamp.clone().into_pyarray(py))?;
        dict.set_item("x", self.x.clone().into_pyarray(py))?;
        dict.set_item("y", self.y.clone().into_pyarray(py))?;
        dict.set_item("pupil_size", self.pupil_size.clone().into_pyarray(py))?;
        Ok(dict.into())
    }
}

impl Samples {
    fn from_samples(samples: Vec<Sample>) -> Self {
        let len = samples.len();
        let mut timestamp = Vec::with_capacity(len);
        let mut x = Vec::with_capacity(len);
        let mut y = Vec::with_capacity(len);
        let mut pupil_size = Vec::with_capacity(len);

        for sample in samples {
            timestamp.push(sample.timestamp);
            x.push(sample.x.unwrap_or(f64::NAN));
            y.push(sample.y.unwrap_or(f64::NAN));
            pupil_size.push(sample.pupil_size);
        }

        Self {
            timestamp,
            x,
            y,
            pupil_size,
        }
    }
}

/// Decoded fixation events.
#[pyclass]
pub struct Fixations {
    eye: Vec<Eye>,
    start: Vec<u64>,
    end: Vec<u64>,
    duration: Vec<u64>,
    x: Vec<f64>,
    y: Vec<f64>,
    pupil_size: Vec<f64>,
}

#[pymethods]
impl Fixations {
    fn __len__(&self) -> usize {
        self.start.len()
    }

    fn __repr__(&self) -> String {
        format!("Fixations(count={})", self.start.len())
    }

    /// Returns the eye tokens ("L" or "R") as a list.
    #[getter]
    fn eye(&self) -> Vec<&'static str> {
        eye_tokens(&self.eye)
    }

    #[getter]
    fn start<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.start.clone().into_pyarray(py)
    }

    #[getter]
    fn end<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.end.clone().into_pyarray(py)
    }

    #[getter]
    fn duration<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.duration.clone().into_pyarray(py)
    }

    #[getter]
    fn x<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.x.clone().into_pyarray(py)
    }

    #[getter]
    fn y<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.y.clone().into_pyarray(py)
    }

    #[getter]
    fn pupil_size<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.pupil_size.clone().into_pyarray(py)
    }

    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        dict.set_item("eye", eye_tokens(&self.eye))?;
        dict.set_item("start", self.start.clone().into_pyarray(py))?;
        dict.set_item("end", self.end.clone().into_pyarray(py))?;
        dict.set_item("duration", self.duration.clone().into_pyarray(py))?;
        dict.set_item("x", self.x.clone().into_pyarray(py))?;
        dict.set_item("y", self.y.clone().into_pyarray(py))?;
        dict.set_item("pupil_size", self.pupil_size.clone().into_pyarray(py))?;
        Ok(dict.into())
    }
}

impl Fixations {
    fn from_fixations(fixations: Vec<Fixation>) -> Self {
        let len = fixations.len();
        let mut table = Self {
            eye: Vec::with_capacity(len),
            start: Vec::with_capacity(len),
            end: Vec::with_capacity(len),
            duration: Vec::with_capacity(len),
            x: Vec::with_capacity(len),
            y: Vec::with_capacity(len),
            pupil_size: Vec::with_capacity(len),
        };

        for fix in fixations {
            table.eye.push(fix.eye);
            table.start.push(fix.start);
            table.end.push(fix.end);
            table.duration.push(fix.duration);
            table.x.push(fix.x);
            table.y.push(fix.y);
            table.pupil_size.push(fix.pupil_size);
        }

        table
    }
}

/// Decoded saccade events.
#[pyclass]
pub struct Saccades {
    eye: Vec<Eye>,
    start: Vec<u64>,
    end: Vec<u64>,
    duration: Vec<u64>,
    start_x: Vec<f64>,
    start_y: Vec<f64>,
    end_x: Vec<f64>,
    end_y: Vec<f64>,
}

#[pymethods]
impl Saccades {
    fn __len__(&self) -> usize {
        self.start.len()
    }

    fn __repr__(&self) -> String {
        format!("Saccades(count={})", self.start.len())
    }

    #[getter]
    fn eye(&self) -> Vec<&'static str> {
        eye_tokens(&self.eye)
    }

    #[getter]
    fn start<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.start.clone().into_pyarray(py)
    }

    #[getter]
    fn end<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.end.clone().into_pyarray(py)
    }

    #[getter]
    fn duration<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.duration.clone().into_pyarray(py)
    }

    #[getter]
    fn start_x<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.start_x.clone().into_pyarray(py)
    }

    #[getter]
    fn start_y<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.start_y.clone().into_pyarray(py)
    }

    #[getter]
    fn end_x<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.end_x.clone().into_pyarray(py)
    }

    #[getter]
    fn end_y<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        self.end_y.clone().into_pyarray(py)
    }

    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        dict.set_item("eye", eye_tokens(&self.eye))?;
        dict.set_item("start", self.start.clone().into_pyarray(py))?;
        dict.set_item("end", self.end.clone().into_pyarray(py))?;
        dict.set_item("duration", self.duration.clone().into_pyarray(py))?;
        dict.set_item("start_x", self.start_x.clone().into_pyarray(py))?;
        dict.set_item("start_y", self.start_y.clone().into_pyarray(py))?;
        dict.set_item("end_x", self.end_x.clone().into_pyarray(py))?;
        dict.set_item("end_y", self.end_y.clone().into_pyarray(py))?;
        Ok(dict.into())
    }
}

impl Saccades {
    fn from_saccades(saccades: Vec<Saccade>) -> Self {
        let len = saccades.len();
        let mut table = Self {
            eye: Vec::with_capacity(len),
            start: Vec::with_capacity(len),
            end: Vec::with_capacity(len),
            duration: Vec::with_capacity(len),
            start_x: Vec::with_capacity(len),
            start_y: Vec::with_capacity(len),
            end_x: Vec::with_capacity(len),
            end_y: Vec::with_capacity(len),
        };

        for sacc in saccades {
            table.eye.push(sacc.eye);
            table.start.push(sacc.start);
            table.end.push(sacc.end);
            table.duration.push(sacc.duration);
            table.start_x.push(sacc.start_x);
            table.start_y.push(sacc.start_y);
            table.end_x.push(sacc.end_x);
            table.end_y.push(sacc.end_y);
        }

        table
    }
}

/// Decoded blink events.
#[pyclass]
pub struct Blinks {
    eye: Vec<Eye>,
    start: Vec<u64>,
    end: Vec<u64>,
}

#[pymethods]
impl Blinks {
    fn __len__(&self) -> usize {
        self.start.len()
    }

    fn __repr__(&self) -> String {
        format!("Blinks(count={})", self.start.len())
    }

    #[getter]
    fn eye(&self) -> Vec<&'static str> {
        eye_tokens(&self.eye)
    }

    #[getter]
    fn start<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.start.clone().into_pyarray(py)
    }

    #[getter]
    fn end<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.end.clone().into_pyarray(py)
    }

    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        dict.set_item("eye", eye_tokens(&self.eye))?;
        dict.set_item("start", self.start.clone().into_pyarray(py))?;
        dict.set_item("end", self.end.clone().into_pyarray(py))?;
        Ok(dict.into())
    }
}

impl Blinks {
    fn from_blinks(blinks: Vec<Blink>) -> Self {
        let len = blinks.len();
        let mut eye = Vec::with_capacity(len);
        let mut start = Vec::with_capacity(len);
        let mut end = Vec::with_capacity(len);

        for blink in blinks {
            eye.push(blink.eye);
            start.push(blink.start);
            end.push(blink.end);
        }

        Self { eye, start, end }
    }
}

/// Decoded experiment messages.
#[pyclass]
pub struct Messages {
    timestamp: Vec<u64>,
    text: Vec<String>,
}

#[pymethods]
impl Messages {
    fn __len__(&self) -> usize {
        self.timestamp.len()
    }

    fn __repr__(&self) -> String {
        format!("Messages(count={})", self.timestamp.len())
    }

    #[getter]
    fn timestamp<'py>(&self, py: Python<'py>) -> &'py PyArray1<u64> {
        self.timestamp.clone().into_pyarray(py)
    }

    /// Returns the message texts as a list of strings.
    #[getter]
    fn text(&self) -> Vec<String> {
        self.text.clone()
    }

    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        dict.set_item("timestamp", self.timestamp.clone().into_pyarray(py))?;
        dict.set_item("text", self.text.clone())?;
        Ok(dict.into())
    }
}

impl Messages {
    fn from_messages(messages: Vec<Message>) -> Self {
        let (timestamp, text) = messages
            .into_iter()
            .map(|msg| (msg.timestamp, msg.text))
            .unzip();
        Self { timestamp, text }
    }
}

/// Line counters and dropped-line diagnostics for one decode pass.
#[pyclass(name = "DecodeStats")]
pub struct Stats {
    #[pyo3(get)]
    lines: usize,
    #[pyo3(get)]
    missing_gaze: usize,
    #[pyo3(get)]
    unrecognized: usize,
    /// (table name, dropped lines) in table order
    malformed: Vec<(&'static str, usize)>,
    /// (line number, record kind, error, line text)
    diagnostics: Vec<(usize, String, String, String)>,
}

#[pymethods]
impl Stats {
    fn __repr__(&self) -> String {
        format!(
            "DecodeStats(lines={}, missing_gaze={}, unrecognized={}, malformed={})",
            self.lines,
            self.missing_gaze,
            self.unrecognized,
            self.total_malformed()
        )
    }

    /// Dropped lines per table, keyed by table name (`"fixations"`, ...).
    #[getter]
    fn malformed<'py>(&self, py: Python<'py>) -> PyResult<&'py PyDict> {
        let dict = PyDict::new(py);
        for &(name, count) in &self.malformed {
            dict.set_item(name, count)?;
        }
        Ok(dict)
    }

    #[getter]
    fn total_malformed(&self) -> usize {
        self.malformed.iter().map(|&(_, count)| count).sum()
    }

    /// Dropped lines as `(line_number, kind, error, text)` tuples, capped at
    /// the decoder's diagnostics limit.
    #[getter]
    fn diagnostics(&self) -> Vec<(usize, String, String, String)> {
        self.diagnostics.clone()
    }
}

impl Stats {
    fn from_result(stats: &asc_core::DecodeStats, diagnostics: Vec<MalformedLine>) -> Self {
        Self {
            lines: stats.lines,
            missing_gaze: stats.missing_gaze,
            unrecognized: stats.unrecognized,
            malformed: stats
                .malformed_counts()
                .map(|(kind, count)| (kind.table_name(), count))
                .collect(),
            diagnostics: diagnostics
                .into_iter()
                .map(|d| (d.line_number, d.kind.to_string(), d.error.to_string(), d.text))
                .collect(),
        }
    }
}

type Tables = (
    Py<Samples>,
    Py<Fixations>,
    Py<Saccades>,
    Py<Blinks>,
    Py<Messages>,
);

type TablesWithStats = (
    Py<Samples>,
    Py<Fixations>,
    Py<Saccades>,
    Py<Blinks>,
    Py<Messages>,
    Py<Stats>,
);

fn into_tables(py: Python<'_>, result: DecodeResult) -> PyResult<Tables> {
    Ok((
        Py::new(py, Samples::from_samples(result.samples))?,
        Py::new(py, Fixations::from_fixations(result.fixations))?,
        Py::new(py, Saccades::from_saccades(result.saccades))?,
        Py::new(py, Blinks::from_blinks(result.blinks))?,
        Py::new(py, Messages::from_messages(result.messages))?,
    ))
}

fn into_tables_with_stats(py: Python<'_>, mut result: DecodeResult) -> PyResult<TablesWithStats> {
    let diagnostics = std::mem::take(&mut result.diagnostics);
    let stats = Py::new(py, Stats::from_result(&result.stats, diagnostics))?;
    let (samples, fixations, saccades, blinks, messages) = into_tables(py, result)?;
    Ok((samples, fixations, saccades, blinks, messages, stats))
}

fn decode_path(py: Python<'_>, path: &str) -> PyResult<DecodeResult> {
    // Release the GIL while decoding
    py.allow_threads(|| AscDecoder::new().decode_file(path))
        .map_err(|e: DecodeError| PyIOError::new_err(format!("Failed to decode file: {}", e)))
}

/// Decodes an ASC log file.
///
/// Args:
///     path: Path to the .asc file
///
/// Returns:
///     tuple: (Samples, Fixations, Saccades, Blinks, Messages)
///
/// Raises:
///     IOError: if the file cannot be opened or read
///
/// Example:
///     >>> import ascdecode
///     >>> import pandas as pd
///     >>> samples, fixations, saccades, blinks, messages = ascdecode.decode_file("s01.asc")
///     >>> df = pd.DataFrame(fixations.to_dict())
#[pyfunction]
fn decode_file(py: Python<'_>, path: &str) -> PyResult<Tables> {
    let result = decode_path(py, path)?;
    into_tables(py, result)
}

/// Decodes an ASC log file and returns the line counters as well.
///
/// Args:
///     path: Path to the .asc file
///
/// Returns:
///     tuple: (Samples, Fixations, Saccades, Blinks, Messages, DecodeStats)
///
/// Example:
///     >>> *tables, stats = ascdecode.decode_file_with_stats("s01.asc")
///     >>> print(stats.malformed, stats.diagnostics[:3])
#[pyfunction]
fn decode_file_with_stats(py: Python<'_>, path: &str) -> PyResult<TablesWithStats> {
    let result = decode_path(py, path)?;
    into_tables_with_stats(py, result)
}

/// Decodes an in-memory ASC log.
///
/// Args:
///     text: Log contents
///
/// Returns:
///     tuple: (Samples, Fixations, Saccades, Blinks, Messages)
#[pyfunction]
fn decode_str(py: Python<'_>, text: &str) -> PyResult<Tables> {
    let result = AscDecoder::new().decode_str(text);
    into_tables(py, result)
}

/// Decodes an in-memory ASC log and returns the line counters as well.
///
/// Returns:
///     tuple: (Samples, Fixations, Saccades, Blinks, Messages, DecodeStats)
#[pyfunction]
fn decode_str_with_stats(py: Python<'_>, text: &str) -> PyResult<TablesWithStats> {
    let result = AscDecoder::new().decode_str(text);
    into_tables_with_stats(py, result)
}

/// ASC eye-tracker log decoder module for Python.
#[pymodule]
fn ascdecode(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(decode_file, m)?)?;
    m.add_function(wrap_pyfunction!(decode_file_with_stats, m)?)?;
    m.add_function(wrap_pyfunction!(decode_str, m)?)?;
    m.add_function(wrap_pyfunction!(decode_str_with_stats, m)?)?;
    m.add_class::<Samples>()?;
    m.add_class::<Fixations>()?;
    m.add_class::<Saccades>()?;
    m.add_class::<Blinks>()?;
    m.add_class::<Messages>()?;
    m.add_class::<Stats>()?;
    m.add("__version__", asc_core::VERSION)?;
    Ok(())
}
