// Error types for composition generation.
//
// Generation is all-or-nothing: any failure surfaces from `compose` before a
// `Composition` exists. Lookups that used to need a runtime fallback (a scale
// degree missing from the diatonic table) are unrepresentable here because
// `ScaleDegree` is an exhaustive enum. Unknown rhythm styles and chord
// patterns are not errors; they fall back to documented defaults.

use thiserror::Error;

/// Result type for composition operations.
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Errors that can occur while configuring, generating, or exporting.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A pitch string such as `"C#4"` could not be parsed.
    #[error("invalid pitch name: {0:?}")]
    InvalidPitchName(String),

    /// The configured key is not in the pitch-class table.
    #[error("unknown key: {0:?}")]
    UnknownKey(String),

    /// A configuration value is out of its valid range.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name as it appears in the config file.
        name: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// I/O error while reading a config or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MIDI encoding error.
    #[error("MIDI error: {0}")]
    Midi(String),
}
