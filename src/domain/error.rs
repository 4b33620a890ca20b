//! Domain error types.

/// Top-level error type for btcsim.
#[derive(Debug, thiserror::Error)]
pub enum BtcsimError {
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

    #[error("invalid simulation config: {reason}")]
    InvalidConfig { reason: String },

    #[error("no prediction aligned to bar at {timestamp}")]
    Alignment { timestamp: chrono::NaiveDateTime },

    #[error("insufficient funds: need {required:.2}, have {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("insufficient position: requested {requested:.8}, holding {held:.8}")]
    InsufficientPosition { requested: f64, held: f64 },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no price bars between {start} and {end}")]
    NoData {
        start: chrono::NaiveDateTime,
        end: chrono::NaiveDateTime,
    },

    #[error("simulation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&BtcsimError> for std::process::ExitCode {
    fn from(err: &BtcsimError) -> Self {
        let code: u8 = match err {
            BtcsimError::Io(_) => 1,
            BtcsimError::ConfigParse { .. }
            | BtcsimError::ConfigMissing { .. }
            | BtcsimError::ConfigInvalid { .. }
            | BtcsimError::InvalidConfig { .. } => 2,
            BtcsimError::Data { .. } | BtcsimError::NoData { .. } => 3,
            BtcsimError::Alignment { .. } => 4,
            BtcsimError::InsufficientFunds { .. } | BtcsimError::InsufficientPosition { .. } => 5,
            BtcsimError::Cancelled => 6,
        };
        std::process::ExitCode::from(code)
    }
}
