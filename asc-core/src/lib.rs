//! Decoder library for eye-tracker ASC event logs.
//!
//! An ASC log is the plain-text export of a recording session: raw gaze
//! samples interleaved with end-of-event lines (`EFIX`, `ESACC`, `EBLINK`)
//! and free-form `MSG` annotations. This crate turns such a log into five
//! strongly-typed, file-ordered collections.
//!
//! # Example
//!
//! ```no_run
//! use asc_core::AscDecoder;
//!
//! let mut decoder = AscDecoder::new();
//! let result = decoder.decode_file("session01.asc").unwrap();
//!
//! println!("Decoded {} samples, {} fixations", result.samples.len(), result.fixations.len());
//! println!("Dropped {} malformed lines", result.stats.total_malformed());
//! ```
//!
//! # Behavior
//!
//! - Lines are classified by leading digit (sample) or keyword
//!   (`EFIX`, `ESACC`, `EBLINK`, `MSG`); anything else is ignored
//! - The `.` gaze sentinel produces a sample with `None` coordinates
//! - Malformed event lines are dropped, counted and logged, never fatal
//! - Only an unreadable source fails the decode
//!
//! Serializing the result is left to the caller; see the `asc-cli` crate.

pub mod config;
pub mod decoder;
pub mod parser;
pub mod types;

// Re-export commonly used types
pub use config::DecoderConfig;
pub use decoder::{decode_file, AscDecoder, DecodeError, MalformedLine};
pub use parser::FieldError;
pub use types::{
    Blink, DecodeResult, DecodeStats, Eye, Fixation, Message, RecordKind, Saccade, Sample,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
