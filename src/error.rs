use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("No fee configuration for platform {platform} covers {date}")]
    ConfigNotFound { platform: String, date: NaiveDate },

    #[error("{count} fee configurations for platform {platform} cover {date}")]
    AmbiguousConfig {
        platform: String,
        date: NaiveDate,
        count: usize,
    },

    #[error("Fee configurations for platform {platform} overlap: version starting {first} and version starting {second}")]
    OverlappingConfigs {
        platform: String,
        first: NaiveDate,
        second: NaiveDate,
    },

    #[error("Fee configuration for platform {platform} has validTo {valid_to} before validFrom {valid_from}")]
    InvalidDateRange {
        platform: String,
        valid_from: NaiveDate,
        valid_to: NaiveDate,
    },

    #[error("Invalid {field} {value} for platform {platform}: must be a finite fraction between 0.0 and 1.0")]
    InvalidRate {
        platform: String,
        field: &'static str,
        value: f64,
    },

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Unknown collaboration status: {0}")]
    UnknownStatus(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Duplicate project id: {0}")]
    DuplicateProject(String),

    #[error("Aggregation consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SettlementError>;
