//! Line-by-line ASC log decoder.
//!
//! The decoder makes a single sequential pass: each line is trimmed,
//! classified, handed to one field extractor, and the record appended to its
//! collection. Lines that carry a known prefix but break the grammar are
//! dropped, counted, and logged; they never abort the pass. Only a failure to
//! open or read the source does.

use crate::config::DecoderConfig;
use crate::parser::{self, FieldError, LineKind};
use crate::types::{DecodeResult, RecordKind};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a decode.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("source unavailable ({}): {source}", describe_source(.path))]
    SourceUnavailable {
        path: Option<PathBuf>,
        source: io::Error,
    },
}

impl From<io::Error> for DecodeError {
    fn from(source: io::Error) -> Self {
        Self::SourceUnavailable { path: None, source }
    }
}

fn describe_source(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "reader".to_string(),
    }
}

/// A line that matched a known prefix but was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedLine {
    /// 1-based line number in the source
    pub line_number: usize,
    /// Record kind the prefix announced
    pub kind: RecordKind,
    /// First field that failed
    pub error: FieldError,
    /// The trimmed line text
    pub text: String,
}

/// Buffer capacity for a single line; sample lines are well under this.
const LINE_CAPACITY: usize = 256;

/// Sequential ASC decoder.
///
/// Holds only the configuration and the current line number. Separate
/// instances share nothing, so files can be decoded in parallel.
#[derive(Debug, Default)]
pub struct AscDecoder {
    config: DecoderConfig,
    line_number: usize,
}

impl AscDecoder {
    /// Creates a decoder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with the given configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            line_number: 0,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Number of lines consumed since the last reset.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Resets the line counter.
    pub fn reset(&mut self) {
        self.line_number = 0;
    }

    /// Classifies and consumes a single line, appending to `result`.
    ///
    /// This is the core of the decode pass. Leading and trailing whitespace
    /// (including `\r`) is ignored.
    pub fn decode_line(&mut self, line: &str, result: &mut DecodeResult) {
        self.line_number += 1;
        result.stats.lines += 1;

        let line = line.trim();
        let kind = parser::classify_line(line);

        let outcome = match kind {
            LineKind::Blank => return,

            LineKind::Unrecognized => {
                result.stats.unrecognized += 1;
                return;
            }

            LineKind::Sample => parser::parse_sample(line).map(|sample| {
                if !sample.has_gaze() {
                    self.note_missing_gaze(line);
                    result.stats.missing_gaze += 1;
                }
                result.samples.push(sample);
            }),

            LineKind::Fixation => {
                parser::parse_fixation(line).map(|fixation| result.fixations.push(fixation))
            }

            LineKind::Saccade => {
                parser::parse_saccade(line).map(|saccade| result.saccades.push(saccade))
            }

            LineKind::Blink => parser::parse_blink(line).map(|blink| result.blinks.push(blink)),

            LineKind::Message => {
                parser::parse_message(line).map(|message| result.messages.push(message))
            }
        };

        if let Err(error) = outcome {
            // Unreachable for Blank/Unrecognized, which returned above
            if let Some(record_kind) = kind.record_kind() {
                self.drop_line(record_kind, line, error, result);
            }
        }
    }

    fn note_missing_gaze(&self, line: &str) {
        if self.config.warn_on_missing_gaze {
            log::warn!(
                "line {}: missing gaze coordinates: {}",
                self.line_number,
                line
            );
        } else {
            log::trace!(
                "line {}: missing gaze coordinates: {}",
                self.line_number,
                line
            );
        }
    }

    fn drop_line(
        &self,
        kind: RecordKind,
        line: &str,
        error: FieldError,
        result: &mut DecodeResult,
    ) {
        result.stats.record_malformed(kind);

        // Past the diagnostics cap, keep counting but stop flooding the log
        if result.stats.total_malformed() <= self.config.max_diagnostics {
            log::warn!(
                "line {}: dropped malformed {} line ({}): {}",
                self.line_number,
                kind,
                error,
                line
            );
        } else {
            log::debug!(
                "line {}: dropped malformed {} line ({})",
                self.line_number,
                kind,
                error
            );
        }

        if self.config.collect_diagnostics
            && result.diagnostics.len() < self.config.max_diagnostics
        {
            result.diagnostics.push(MalformedLine {
                line_number: self.line_number,
                kind,
                error,
                text: line.to_string(),
            });
        }
    }

    /// Decodes every line of a buffered reader.
    ///
    /// Bytes that are not valid UTF-8 are replaced per line rather than
    /// failing the decode. Any read error aborts the pass.
    pub fn decode_reader<R: BufRead>(&mut self, mut reader: R) -> Result<DecodeResult, DecodeError> {
        self.reset();

        let mut result = DecodeResult::default();
        let mut buffer = Vec::with_capacity(LINE_CAPACITY);

        loop {
            buffer.clear();
            let bytes_read = reader.read_until(b'\n', &mut buffer)?;
            if bytes_read == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buffer);
            self.decode_line(&line, &mut result);
        }

        log_summary(&result);
        Ok(result)
    }

    /// Decodes an in-memory log.
    pub fn decode_str(&mut self, text: &str) -> DecodeResult {
        self.reset();

        let mut result = DecodeResult::default();
        for line in text.lines() {
            self.decode_line(line, &mut result);
        }

        log_summary(&result);
        result
    }

    /// Decodes an ASC log file from disk.
    pub fn decode_file<P: AsRef<Path>>(&mut self, path: P) -> Result<DecodeResult, DecodeError> {
        let path = path.as_ref();
        log::debug!("Decoding ASC log: {:?}", path);

        let with_path = |source| DecodeError::SourceUnavailable {
            path: Some(path.to_path_buf()),
            source,
        };

        let file = File::open(path).map_err(with_path)?;
        self.decode_reader(BufReader::new(file))
            .map_err(|DecodeError::SourceUnavailable { source, .. }| with_path(source))
    }
}

fn log_summary(result: &DecodeResult) {
    log::debug!(
        "Decoded {} lines: {} samples ({} missing gaze), {} fixations, {} saccades, {} blinks, {} messages, {} malformed, {} ignored",
        result.stats.lines,
        result.samples.len(),
        result.stats.missing_gaze,
        result.fixations.len(),
        result.saccades.len(),
        result.blinks.len(),
        result.messages.len(),
        result.stats.total_malformed(),
        result.stats.unrecognized
    );
}

/// Decodes an ASC log file with the default configuration.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<DecodeResult, DecodeError> {
    AscDecoder::new().decode_file(path)
}
