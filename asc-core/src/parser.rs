//! Line classification and field extraction for ASC log lines.
//!
//! Every function here is stateless: it takes one trimmed line and either
//! returns a record or a [`FieldError`] naming the first field that did not
//! fit the grammar. Fields past the end of a grammar are ignored, since
//! recorders append extra columns (amplitude, peak velocity, resolution,
//! binocular data) depending on their configuration.

use crate::types::{Blink, Eye, Fixation, Message, RecordKind, Saccade, Sample};
use serde::Serialize;
use std::str::SplitWhitespace;
use thiserror::Error;

/// Token written in place of a gaze coordinate when the eye was lost.
pub const MISSING_GAZE: &str = ".";

pub const FIXATION_KEYWORD: &str = "EFIX";
pub const SACCADE_KEYWORD: &str = "ESACC";
pub const BLINK_KEYWORD: &str = "EBLINK";
pub const MESSAGE_KEYWORD: &str = "MSG";

/// Why a line with a known prefix could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldError {
    #[error("missing field {index} ({name})")]
    MissingField { index: usize, name: &'static str },

    #[error("invalid {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("invalid eye: {0:?} (expected L or R)")]
    InvalidEye(String),

    #[error("unexpected keyword: {0:?}")]
    BadKeyword(String),

    #[error("message has no text")]
    EmptyMessage,
}

/// Classification of a single trimmed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Sample,
    Fixation,
    Saccade,
    Blink,
    Message,
    /// Headers, comments, start/end markers and any other event type
    Unrecognized,
}

impl LineKind {
    /// The record kind this line decodes into, if any.
    pub fn record_kind(&self) -> Option<RecordKind> {
        match self {
            Self::Sample => Some(RecordKind::Sample),
            Self::Fixation => Some(RecordKind::Fixation),
            Self::Saccade => Some(RecordKind::Saccade),
            Self::Blink => Some(RecordKind::Blink),
            Self::Message => Some(RecordKind::Message),
            Self::Blank | Self::Unrecognized => None,
        }
    }
}

/// Classifies a trimmed line by its leading character or keyword.
///
/// Checked in priority order: digit, `EFIX`, `ESACC`, `EBLINK`, `MSG`.
#[inline]
pub fn classify_line(line: &str) -> LineKind {
    match line.as_bytes().first() {
        None => LineKind::Blank,
        Some(b) if b.is_ascii_digit() => LineKind::Sample,
        Some(_) if line.starts_with(FIXATION_KEYWORD) => LineKind::Fixation,
        Some(_) if line.starts_with(SACCADE_KEYWORD) => LineKind::Saccade,
        Some(_) if line.starts_with(BLINK_KEYWORD) => LineKind::Blink,
        Some(_) if line.starts_with(MESSAGE_KEYWORD) => LineKind::Message,
        Some(_) => LineKind::Unrecognized,
    }
}

/// Whitespace-separated field cursor that reports field positions in errors.
struct Fields<'a> {
    iter: SplitWhitespace<'a>,
    index: usize,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            iter: line.split_whitespace(),
            index: 0,
        }
    }

    /// Splits off the leading keyword, which must stand alone as a token.
    fn after_keyword(line: &'a str, keyword: &str) -> Result<Self, FieldError> {
        let mut fields = Self::new(line);
        let token = fields.next("keyword")?;
        if token != keyword {
            return Err(FieldError::BadKeyword(token.to_string()));
        }
        Ok(fields)
    }

    fn next(&mut self, name: &'static str) -> Result<&'a str, FieldError> {
        let index = self.index;
        self.index += 1;
        self.iter
            .next()
            .ok_or(FieldError::MissingField { index, name })
    }

    fn uint(&mut self, name: &'static str) -> Result<u64, FieldError> {
        parse_uint(self.next(name)?, name)
    }

    fn float(&mut self, name: &'static str) -> Result<f64, FieldError> {
        parse_float(self.next(name)?, name)
    }

    /// A gaze coordinate: a float, or the `.` sentinel.
    fn gaze(&mut self, name: &'static str) -> Result<Option<f64>, FieldError> {
        match self.next(name)? {
            MISSING_GAZE => Ok(None),
            token => parse_float(token, name).map(Some),
        }
    }

    fn eye(&mut self) -> Result<Eye, FieldError> {
        let token = self.next("eye")?;
        Eye::from_token(token).ok_or_else(|| FieldError::InvalidEye(token.to_string()))
    }
}

/// Parses an unsigned decimal integer field. Only ASCII digits are accepted.
#[inline]
pub fn parse_uint(token: &str, name: &'static str) -> Result<u64, FieldError> {
    let invalid = || FieldError::InvalidNumber {
        name,
        value: token.to_string(),
    };

    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    token.parse().map_err(|_| invalid())
}

/// Parses a finite floating point field. `nan` and `inf` spellings are rejected.
#[inline]
pub fn parse_float(token: &str, name: &'static str) -> Result<f64, FieldError> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FieldError::InvalidNumber {
            name,
            value: token.to_string(),
        }),
    }
}

// ============================================================================
// Sample: <time> <x> <y> <pupil> [...]
// ============================================================================

/// Decodes a sample line. `.` in either coordinate yields `None` for it.
pub fn parse_sample(line: &str) -> Result<Sample, FieldError> {
    let mut fields = Fields::new(line);
    let timestamp = fields.float("timestamp")?;
    let x = fields.gaze("x")?;
    let y = fields.gaze("y")?;
    let pupil_size = fields.float("pupil_size")?;
    Ok(Sample::new(timestamp, x, y, pupil_size))
}

// ============================================================================
// EFIX <eye> <start> <end> <duration> <x> <y> <pupil>
// ============================================================================

pub fn parse_fixation(line: &str) -> Result<Fixation, FieldError> {
    let mut fields = Fields::after_keyword(line, FIXATION_KEYWORD)?;
    Ok(Fixation {
        eye: fields.eye()?,
        start: fields.uint("start")?,
        end: fields.uint("end")?,
        duration: fields.uint("duration")?,
        x: fields.float("x")?,
        y: fields.float("y")?,
        pupil_size: fields.float("pupil_size")?,
    })
}

// ============================================================================
// ESACC <eye> <start> <end> <duration> <sx> <sy> <ex> <ey>
// ============================================================================

pub fn parse_saccade(line: &str) -> Result<Saccade, FieldError> {
    let mut fields = Fields::after_keyword(line, SACCADE_KEYWORD)?;
    Ok(Saccade {
        eye: fields.eye()?,
        start: fields.uint("start")?,
        end: fields.uint("end")?,
        duration: fields.uint("duration")?,
        start_x: fields.float("start_x")?,
        start_y: fields.float("start_y")?,
        end_x: fields.float("end_x")?,
        end_y: fields.float("end_y")?,
    })
}

// ============================================================================
// EBLINK <eye> <start> <end>
// ============================================================================

pub fn parse_blink(line: &str) -> Result<Blink, FieldError> {
    let mut fields = Fields::after_keyword(line, BLINK_KEYWORD)?;
    Ok(Blink {
        eye: fields.eye()?,
        start: fields.uint("start")?,
        end: fields.uint("end")?,
    })
}

// ============================================================================
// MSG <time> <text...>
// ============================================================================

/// Decodes a message line. Everything after the timestamp is kept verbatim,
/// internal whitespace included.
pub fn parse_message(line: &str) -> Result<Message, FieldError> {
    let rest = line.strip_prefix(MESSAGE_KEYWORD).unwrap_or(line);
    if rest.is_empty() {
        return Err(FieldError::MissingField {
            index: 1,
            name: "timestamp",
        });
    }
    if !rest.starts_with(char::is_whitespace) {
        let keyword = line.split_whitespace().next().unwrap_or_default();
        return Err(FieldError::BadKeyword(keyword.to_string()));
    }

    let rest = rest.trim_start();
    let (time_token, text) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], rest[idx..].trim_start()),
        None => (rest, ""),
    };

    if time_token.is_empty() {
        return Err(FieldError::MissingField {
            index: 1,
            name: "timestamp",
        });
    }
    let timestamp = parse_uint(time_token, "timestamp")?;

    if text.is_empty() {
        return Err(FieldError::EmptyMessage);
    }

    Ok(Message {
        timestamp,
        text: text.to_string(),
    })
}
