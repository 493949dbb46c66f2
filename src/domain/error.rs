//! Domain error types.

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub(crate) fn at(position: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!("{input}\n{caret}\n{self}")
    }
}

/// Top-level error type for tacore.
#[derive(Debug, thiserror::Error)]
pub enum TaError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("index {index} out of range for series of {bar_count} bars")]
    IndexOutOfRange { index: usize, bar_count: usize },

    #[error("cannot enter at index {index}: a position is already open")]
    PositionAlreadyOpen { index: usize },

    #[error("cannot exit at index {index}: no position is open")]
    NoOpenPosition { index: usize },

    #[error("cannot operate at index {index}: the position is already closed")]
    PositionClosed { index: usize },

    #[error("trade index {index} precedes the last trade index {last}")]
    NonMonotonicIndex { index: usize, last: usize },

    #[error("position is still open; a final index of observation is required")]
    PositionStillOpen,

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data in {name}")]
    NoData { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TaError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        TaError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TaError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Reject zero-length windows at construction time.
pub(crate) fn require_period(name: &'static str, period: usize) -> Result<(), TaError> {
    if period == 0 {
        return Err(TaError::invalid(name, "must be at least 1"));
    }
    Ok(())
}

impl From<&TaError> for std::process::ExitCode {
    fn from(err: &TaError) -> Self {
        let code: u8 = match err {
            TaError::Io(_) => 1,
            TaError::InvalidParameter { .. }
            | TaError::ConfigParse { .. }
            | TaError::ConfigMissing { .. }
            | TaError::ConfigInvalid { .. } => 2,
            TaError::RuleParse(_) | TaError::RuleInvalid { .. } => 4,
            TaError::Data { .. } | TaError::NoData { .. } => 5,
            TaError::IndexOutOfRange { .. }
            | TaError::PositionAlreadyOpen { .. }
            | TaError::NoOpenPosition { .. }
            | TaError::PositionClosed { .. }
            | TaError::NonMonotonicIndex { .. }
            | TaError::PositionStillOpen => 6,
        };
        std::process::ExitCode::from(code)
    }
}
