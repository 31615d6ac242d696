//! Decoder configuration.
//!
//! Only observability knobs live here; the line grammar itself is fixed.

/// Default cap on the number of kept [`MalformedLine`](crate::MalformedLine) entries.
pub const DEFAULT_MAX_DIAGNOSTICS: usize = 1000;

/// Configuration for [`AscDecoder`](crate::AscDecoder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Keep a [`MalformedLine`](crate::MalformedLine) for each dropped line
    pub collect_diagnostics: bool,

    /// Maximum number of diagnostics kept. Counters in
    /// [`DecodeStats`](crate::DecodeStats) are never capped.
    pub max_diagnostics: usize,

    /// Log every sample carrying the `.` sentinel at `warn` instead of `trace`
    pub warn_on_missing_gaze: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            collect_diagnostics: true,
            max_diagnostics: DEFAULT_MAX_DIAGNOSTICS,
            warn_on_missing_gaze: false,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable diagnostics collection
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.collect_diagnostics = enabled;
        self
    }

    /// Builder method: cap the number of kept diagnostics
    pub fn with_max_diagnostics(mut self, max: usize) -> Self {
        self.max_diagnostics = max;
        self
    }

    /// Builder method: warn on each sample with missing gaze data
    pub fn with_missing_gaze_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_missing_gaze = enabled;
        self
    }
}
