//! Domain error types.

/// Top-level error type for allocbt.
#[derive(Debug, thiserror::Error)]
pub enum AllocbtError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no column named {name}")]
    UnknownColumn { name: String },

    #[error("unknown strategy kind: {name}")]
    UnknownStrategy { name: String },

    #[error("strategy name {name} is used more than once")]
    DuplicateStrategy { name: String },

    #[error("feature data has {features} rows but asset prices have {prices}")]
    LengthMismatch { features: usize, prices: usize },

    #[error("allocation at step {step} has {actual} entries, expected {expected}")]
    AllocationLength {
        step: usize,
        expected: usize,
        actual: usize,
    },

    #[error("non-finite {what} at step {step}")]
    NonFinite { step: usize, what: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AllocbtError> for std::process::ExitCode {
    fn from(err: &AllocbtError) -> Self {
        let code: u8 = match err {
            AllocbtError::Io(_) => 1,
            AllocbtError::ConfigParse { .. }
            | AllocbtError::ConfigMissing { .. }
            | AllocbtError::ConfigInvalid { .. } => 2,
            AllocbtError::Data { .. } | AllocbtError::UnknownColumn { .. } => 3,
            AllocbtError::UnknownStrategy { .. } | AllocbtError::DuplicateStrategy { .. } => 4,
            AllocbtError::LengthMismatch { .. }
            | AllocbtError::AllocationLength { .. }
            | AllocbtError::NonFinite { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
