//! Core record types for decoded ASC logs.
//!
//! Each record kind is a plain value built once by the decoder and never
//! mutated afterwards. The [`DecodeResult`] bundle owns one ordered `Vec` per
//! kind, in file order.

use serde::Serialize;
use std::fmt;

use crate::decoder::MalformedLine;

/// Which eye an event was detected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Eye {
    /// Left eye (`L`)
    Left,
    /// Right eye (`R`)
    Right,
}

impl Eye {
    /// Parses the single-letter eye token used in event lines.
    #[inline]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "L" => Some(Self::Left),
            "R" => Some(Self::Right),
            _ => None,
        }
    }

    /// Returns the single-letter token for this eye.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::Right => "R",
        }
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw gaze sample.
///
/// Gaze coordinates are `None` when the tracker wrote the `.` sentinel for
/// that tick (eye lost). They are never carried over from a previous sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    /// Timestamp in milliseconds (may be fractional)
    pub timestamp: f64,
    /// Horizontal gaze position, if tracked
    pub x: Option<f64>,
    /// Vertical gaze position, if tracked
    pub y: Option<f64>,
    /// Pupil size in tracker units
    pub pupil_size: f64,
}

impl Sample {
    /// Creates a new sample.
    #[inline]
    pub fn new(timestamp: f64, x: Option<f64>, y: Option<f64>, pupil_size: f64) -> Self {
        Self {
            timestamp,
            x,
            y,
            pupil_size,
        }
    }

    /// True when both gaze coordinates are present.
    pub fn has_gaze(&self) -> bool {
        self.x.is_some() && self.y.is_some()
    }
}

/// End-of-fixation event (`EFIX`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fixation {
    pub eye: Eye,
    /// Start time in milliseconds
    pub start: u64,
    /// End time in milliseconds
    pub end: u64,
    /// Duration as reported by the tracker
    pub duration: u64,
    /// Average horizontal gaze position
    pub x: f64,
    /// Average vertical gaze position
    pub y: f64,
    /// Average pupil size
    pub pupil_size: f64,
}

impl Fixation {
    /// `end - start`, independent of the reported duration.
    pub fn span(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// End-of-saccade event (`ESACC`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Saccade {
    pub eye: Eye,
    pub start: u64,
    pub end: u64,
    pub duration: u64,
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl Saccade {
    /// `end - start`, independent of the reported duration.
    pub fn span(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// End-of-blink event (`EBLINK`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Blink {
    pub eye: Eye,
    pub start: u64,
    pub end: u64,
}

impl Blink {
    /// `end - start`; zero if the log has them reversed.
    pub fn span(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Free-form annotation written by the experiment program (`MSG`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Timestamp in milliseconds
    pub timestamp: u64,
    /// Message text, verbatim
    pub text: String,
}

/// The five record kinds a line can decode into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKind {
    Sample,
    Fixation,
    Saccade,
    Blink,
    Message,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Sample,
        RecordKind::Fixation,
        RecordKind::Saccade,
        RecordKind::Blink,
        RecordKind::Message,
    ];

    #[inline]
    fn index(self) -> usize {
        match self {
            Self::Sample => 0,
            Self::Fixation => 1,
            Self::Saccade => 2,
            Self::Blink => 3,
            Self::Message => 4,
        }
    }

    /// Lowercase plural table name, e.g. `"fixations"`.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Sample => "samples",
            Self::Fixation => "fixations",
            Self::Saccade => "saccades",
            Self::Blink => "blinks",
            Self::Message => "messages",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sample => "sample",
            Self::Fixation => "EFIX",
            Self::Saccade => "ESACC",
            Self::Blink => "EBLINK",
            Self::Message => "MSG",
        };
        f.write_str(name)
    }
}

/// Line-level counters collected during a decode pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Total lines read, blank lines included
    pub lines: usize,
    /// Samples with at least one `.` coordinate
    pub missing_gaze: usize,
    /// Non-empty lines that matched no known record kind
    pub unrecognized: usize,
    malformed: [usize; 5],
}

impl DecodeStats {
    /// Number of dropped lines of the given kind.
    pub fn malformed(&self, kind: RecordKind) -> usize {
        self.malformed[kind.index()]
    }

    /// Number of dropped lines across all kinds.
    pub fn total_malformed(&self) -> usize {
        self.malformed.iter().sum()
    }

    /// Per-kind dropped line counts, in [`RecordKind::ALL`] order.
    pub fn malformed_counts(&self) -> impl Iterator<Item = (RecordKind, usize)> + '_ {
        RecordKind::ALL.into_iter().map(|kind| (kind, self.malformed(kind)))
    }

    pub(crate) fn record_malformed(&mut self, kind: RecordKind) {
        self.malformed[kind.index()] += 1;
    }
}

/// Result of decoding an ASC log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecodeResult {
    pub samples: Vec<Sample>,
    pub fixations: Vec<Fixation>,
    pub saccades: Vec<Saccade>,
    pub blinks: Vec<Blink>,
    pub messages: Vec<Message>,
    /// Line counters for the pass
    pub stats: DecodeStats,
    /// Dropped lines, if diagnostics collection was enabled
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<MalformedLine>,
}

impl DecodeResult {
    /// Number of records of the given kind.
    pub fn len_of(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Sample => self.samples.len(),
            RecordKind::Fixation => self.fixations.len(),
            RecordKind::Saccade => self.saccades.len(),
            RecordKind::Blink => self.blinks.len(),
            RecordKind::Message => self.messages.len(),
        }
    }

    /// True when no record of any kind was decoded.
    pub fn is_empty(&self) -> bool {
        RecordKind::ALL.iter().all(|&kind| self.len_of(kind) == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_token_parsing() {
        assert_eq!(Eye::from_token("L"), Some(Eye::Left));
        assert_eq!(Eye::from_token("R"), Some(Eye::Right));
        assert_eq!(Eye::from_token("l"), None);
        assert_eq!(Eye::from_token("X"), None);
        assert_eq!(Eye::Right.to_string(), "R");
    }

    #[test]
    fn test_sample_has_gaze() {
        assert!(Sample::new(1.0, Some(2.0), Some(3.0), 900.0).has_gaze());
        assert!(!Sample::new(1.0, None, Some(3.0), 900.0).has_gaze());
        assert!(!Sample::new(1.0, None, None, 0.0).has_gaze());
    }

    #[test]
    fn test_span_ignores_reported_duration() {
        let fix = Fixation {
            eye: Eye::Left,
            start: 100,
            end: 250,
            duration: 999,
            x: 0.0,
            y: 0.0,
            pupil_size: 0.0,
        };
        assert_eq!(fix.span(), 150);

        let sacc = Saccade {
            eye: Eye::Right,
            start: 300,
            end: 340,
            duration: 7,
            start_x: 0.0,
            start_y: 0.0,
            end_x: 0.0,
            end_y: 0.0,
        };
        assert_eq!(sacc.span(), 40);

        let blink = Blink {
            eye: Eye::Left,
            start: 500,
            end: 400,
        };
        assert_eq!(blink.span(), 0);
    }

    #[test]
    fn test_stats_malformed_counters() {
        let mut stats = DecodeStats::default();
        stats.record_malformed(RecordKind::Fixation);
        stats.record_malformed(RecordKind::Fixation);
        stats.record_malformed(RecordKind::Message);
        assert_eq!(stats.malformed(RecordKind::Fixation), 2);
        assert_eq!(stats.malformed(RecordKind::Message), 1);
        assert_eq!(stats.malformed(RecordKind::Sample), 0);
        assert_eq!(stats.total_malformed(), 3);

        let counts: Vec<(RecordKind, usize)> = stats.malformed_counts().collect();
        assert_eq!(
            counts,
            vec![
                (RecordKind::Sample, 0),
                (RecordKind::Fixation, 2),
                (RecordKind::Saccade, 0),
                (RecordKind::Blink, 0),
                (RecordKind::Message, 1),
            ]
        );
    }

    #[test]
    fn test_empty_result() {
        let result = DecodeResult::default();
        assert!(result.is_empty());
        for kind in RecordKind::ALL {
            assert_eq!(result.len_of(kind), 0);
        }
    }
}
