//! Domain error types.

use chrono::NaiveDate;

use crate::domain::validation::Frequency;

fn describe_frequency(inferred: &Option<Frequency>) -> String {
    match inferred {
        Some(freq) => freq.to_string(),
        None => "irregular".to_string(),
    }
}

/// Top-level error type for smacross.
#[derive(Debug, thiserror::Error)]
pub enum SmacrossError {
    #[error("insufficient data: have {available} observations, need {needed}")]
    InsufficientData { needed: usize, available: usize },

    #[error("series are not aligned: {reason}")]
    Alignment { reason: String },

    #[error("timestamps must be strictly increasing: {current} at index {index} follows {previous}")]
    UnsortedIndex {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("expected frequency {expected}, got {}", describe_frequency(.inferred))]
    FrequencyMismatch {
        expected: Frequency,
        inferred: Option<Frequency>,
    },

    #[error("missing value at index {index} ({date})")]
    MissingValue { index: usize, date: NaiveDate },

    #[error("negative equity {equity} at index {index} ({date})")]
    InvalidEquity {
        index: usize,
        date: NaiveDate,
        equity: f64,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("invalid close price {close} on {date}")]
    InvalidPrice { date: NaiveDate, close: f64 },

    #[error("data error: {reason}")]
    Data { reason: String },

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

    #[error("serialization error: {reason}")]
    Serialize { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SmacrossError> for std::process::ExitCode {
    fn from(err: &SmacrossError) -> Self {
        let code: u8 = match err {
            SmacrossError::Io(_) | SmacrossError::Serialize { .. } => 1,
            SmacrossError::ConfigParse { .. }
            | SmacrossError::ConfigMissing { .. }
            | SmacrossError::ConfigInvalid { .. } => 2,
            SmacrossError::Data { .. }
            | SmacrossError::InvalidPrice { .. }
            | SmacrossError::UnsortedIndex { .. }
            | SmacrossError::FrequencyMismatch { .. }
            | SmacrossError::MissingValue { .. }
            | SmacrossError::InvalidEquity { .. } => 3,
            SmacrossError::InvalidParameter { .. } | SmacrossError::Alignment { .. } => 4,
            SmacrossError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
