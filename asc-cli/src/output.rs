//! Table writers for decoded ASC logs.
//!
//! Supports one CSV file per record kind, or the whole bundle as JSON.

use asc_core::{Blink, DecodeResult, Fixation, Message, RecordKind, Saccade, Sample};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during output writing.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One CSV file per record kind
    #[default]
    Csv,
    /// A single JSON document holding all five tables
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(OutputError::InvalidFormat(format!(
                "Unknown format: {}. Use csv or json",
                other
            ))),
        }
    }
}

/// A record that can be written as one CSV row.
pub trait CsvRecord {
    /// Header row for this record kind
    const HEADER: &'static str;

    /// Writes the record as a single CSV row, without the newline.
    fn write_row<W: Write>(&self, writer: &mut W) -> io::Result<()>;
}

/// Writes an optional coordinate; missing values become empty cells.
fn write_opt<W: Write>(writer: &mut W, value: Option<f64>) -> io::Result<()> {
    match value {
        Some(v) => write!(writer, "{}", v),
        None => Ok(()),
    }
}

/// Quotes a text cell when it contains a separator, quote, or line break.
fn write_text<W: Write>(writer: &mut W, text: &str) -> io::Result<()> {
    if text.contains([',', '"', '\n', '\r']) {
        write!(writer, "\"{}\"", text.replace('"', "\"\""))
    } else {
        writer.write_all(text.as_bytes())
    }
}

impl CsvRecord for Sample {
    const HEADER: &'static str = "timestamp,x,y,pupil_size";

    fn write_row<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{},", self.timestamp)?;
        write_opt(writer, self.x)?;
        writer.write_all(b",")?;
        write_opt(writer, self.y)?;
        write!(writer, ",{}", self.pupil_size)
    }
}

impl CsvRecord for Fixation {
    const HEADER: &'static str = "eye,start,end,duration,x,y,pupil_size";

    fn write_row<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(
            writer,
            "{},{},{},{},{},{},{}",
            self.eye, self.start, self.end, self.duration, self.x, self.y, self.pupil_size
        )
    }
}

impl CsvRecord for Saccade {
    const HEADER: &'static str = "eye,start,end,duration,start_x,start_y,end_x,end_y";

    fn write_row<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(
            writer,
            "{},{},{},{},{},{},{},{}",
            self.eye,
            self.start,
            self.end,
            self.duration,
            self.start_x,
            self.start_y,
            self.end_x,
            self.end_y
        )
    }
}

impl CsvRecord for Blink {
    const HEADER: &'static str = "eye,start,end";

    fn write_row<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{},{},{}", self.eye, self.start, self.end)
    }
}

impl CsvRecord for Message {
    const HEADER: &'static str = "timestamp,text";

    fn write_row<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{},", self.timestamp)?;
        write_text(writer, &self.text)
    }
}

/// CSV output writer for one record kind.
pub struct CsvWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> CsvWriter<W> {
    /// Creates a new CSV writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Writes the header row for `R`.
    pub fn write_header<R: CsvRecord>(&mut self) -> Result<(), OutputError> {
        writeln!(self.writer, "{}", R::HEADER)?;
        Ok(())
    }

    /// Writes a batch of records.
    pub fn write_records<R: CsvRecord>(&mut self, records: &[R]) -> Result<(), OutputError> {
        for record in records {
            record.write_row(&mut self.writer)?;
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes one table, header included, to a CSV file.
pub fn write_csv<P: AsRef<Path>, R: CsvRecord>(path: P, records: &[R]) -> Result<(), OutputError> {
    let file = File::create(path)?;
    let mut writer = CsvWriter::new(file);
    writer.write_header::<R>()?;
    writer.write_records(records)?;
    writer.flush()?;
    Ok(())
}

/// Path of the CSV file holding `kind` for a log with the given stem.
pub fn table_path(dir: &Path, stem: &str, kind: RecordKind) -> PathBuf {
    dir.join(format!("{}_{}.csv", stem, kind.table_name()))
}

/// Writes all five tables as `<stem>_<table>.csv` into `dir`.
///
/// Returns the written paths in record-kind order.
pub fn write_csv_tables(
    dir: &Path,
    stem: &str,
    result: &DecodeResult,
) -> Result<Vec<PathBuf>, OutputError> {
    let mut written = Vec::with_capacity(RecordKind::ALL.len());

    for kind in RecordKind::ALL {
        let path = table_path(dir, stem, kind);
        match kind {
            RecordKind::Sample => write_csv(&path, &result.samples)?,
            RecordKind::Fixation => write_csv(&path, &result.fixations)?,
            RecordKind::Saccade => write_csv(&path, &result.saccades)?,
            RecordKind::Blink => write_csv(&path, &result.blinks)?,
            RecordKind::Message => write_csv(&path, &result.messages)?,
        }
        written.push(path);
    }

    Ok(written)
}

/// Writes the whole bundle as a JSON document.
pub fn write_json<P: AsRef<Path>>(path: P, result: &DecodeResult) -> Result<(), OutputError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, result)?;
    writer.flush()?;
    Ok(())
}

/// Writes the decoded log to `dir` in the requested format.
pub fn write_result(
    dir: &Path,
    stem: &str,
    result: &DecodeResult,
    format: OutputFormat,
) -> Result<Vec<PathBuf>, OutputError> {
    match format {
        OutputFormat::Csv => write_csv_tables(dir, stem, result),
        OutputFormat::Json => {
            let path = dir.join(format!("{}.json", stem));
            write_json(&path, result)?;
            Ok(vec![path])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asc_core::{AscDecoder, Eye};
    use std::str::FromStr;

    fn render<R: CsvRecord>(records: &[R]) -> String {
        let mut output = Vec::new();
        {
            let mut writer = CsvWriter::new(&mut output);
            writer.write_header::<R>().unwrap();
            writer.write_records(records).unwrap();
            writer.flush().unwrap();
        }
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_str(" JSON ").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("parquet").is_err());
    }

    #[test]
    fn test_sample_csv_missing_gaze() {
        let output = render(&[
            Sample::new(1000.0, Some(512.5), Some(384.0), 950.0),
            Sample::new(1001.5, None, None, 0.0),
            Sample::new(1002.0, None, Some(10.0), 5.0),
        ]);

        assert_eq!(
            output,
            "timestamp,x,y,pupil_size\n1000,512.5,384,950\n1001.5,,,0\n1002,,10,5\n"
        );
    }

    #[test]
    fn test_event_csv_rows() {
        let fixations = render(&[Fixation {
            eye: Eye::Right,
            start: 100,
            end: 250,
            duration: 150,
            x: 512.3,
            y: 384.7,
            pupil_size: 950.0,
        }]);
        assert!(fixations.starts_with("eye,start,end,duration,x,y,pupil_size\n"));
        assert!(fixations.contains("R,100,250,150,512.3,384.7,950\n"));

        let blinks = render(&[Blink {
            eye: Eye::Left,
            start: 7,
            end: 9,
        }]);
        assert_eq!(blinks, "eye,start,end\nL,7,9\n");
    }

    #[test]
    fn test_message_csv_quoting() {
        let output = render(&[
            Message {
                timestamp: 1500,
                text: "Position changed".to_string(),
            },
            Message {
                timestamp: 1600,
                text: "VAR cond a,b \"quoted\"".to_string(),
            },
        ]);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "timestamp,text");
        assert_eq!(lines[1], "1500,Position changed");
        assert_eq!(lines[2], "1600,\"VAR cond a,b \"\"quoted\"\"\"");
    }

    #[test]
    fn test_write_csv_tables() {
        let dir = tempfile::tempdir().unwrap();
        let result = AscDecoder::new().decode_str(
            "1000 1.0 2.0 3.0\nEFIX L 1 2 1 1.0 2.0 3.0\nMSG 5 hello world\n",
        );

        let written = write_csv_tables(dir.path(), "rec", &result).unwrap();
        assert_eq!(written.len(), 5);
        assert_eq!(written[0], dir.path().join("rec_samples.csv"));

        let messages = std::fs::read_to_string(dir.path().join("rec_messages.csv")).unwrap();
        assert_eq!(messages, "timestamp,text\n5,hello world\n");

        let blinks = std::fs::read_to_string(dir.path().join("rec_blinks.csv")).unwrap();
        assert_eq!(blinks, "eye,start,end\n");
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let result = AscDecoder::new().decode_str("1000 . 2.0 3.0\nEBLINK R 4 6\n");

        let written = write_result(dir.path(), "rec", &result, OutputFormat::Json).unwrap();
        assert_eq!(written, vec![dir.path().join("rec.json")]);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert!(json["samples"][0]["x"].is_null());
        assert_eq!(json["samples"][0]["y"], 2.0);
        assert_eq!(json["blinks"][0]["eye"], "Right");
        assert_eq!(json["stats"]["missing_gaze"], 1);
    }
}
