//! Domain error types.

/// Top-level error type for tastrat.
#[derive(Debug, thiserror::Error)]
pub enum TastratError {
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

    #[error("failed to load data for {instrument}: {reason}")]
    DataLoad { instrument: String, reason: String },

    #[error("no data for {instrument}")]
    NoData { instrument: String },

    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("timestamps not strictly increasing at index {index}")]
    UnorderedSeries { index: usize },

    #[error("empty series for {instrument}")]
    EmptySeries { instrument: String },

    #[error("insufficient data for {strategy}: have {bars} bars, need {minimum}")]
    InsufficientData {
        strategy: String,
        bars: usize,
        minimum: usize,
    },

    #[error("{strategy} requires volume but {instrument} has none")]
    MissingVolume {
        strategy: String,
        instrument: String,
    },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("invalid parameter {key} for {strategy}: {reason}")]
    InvalidParameter {
        strategy: String,
        key: String,
        reason: String,
    },

    #[error("invalid signal sequence: {reason}")]
    InvalidSignalSequence { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TastratError {
    /// Errors the batch runner may skip: the pair is unusable but the rest of
    /// the study can proceed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TastratError::InvalidSignalSequence { .. })
    }

    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            TastratError::Io(_) | TastratError::Report { .. } => 1,
            TastratError::ConfigParse { .. }
            | TastratError::ConfigMissing { .. }
            | TastratError::ConfigInvalid { .. } => 2,
            TastratError::UnknownStrategy { .. } | TastratError::InvalidParameter { .. } => 4,
            TastratError::DataLoad { .. }
            | TastratError::NoData { .. }
            | TastratError::InvalidBar { .. }
            | TastratError::UnorderedSeries { .. }
            | TastratError::EmptySeries { .. }
            | TastratError::InsufficientData { .. }
            | TastratError::MissingVolume { .. } => 5,
            TastratError::InvalidSignalSequence { .. } => 6,
        }
    }
}

impl From<&TastratError> for std::process::ExitCode {
    fn from(err: &TastratError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
