use thiserror::Error;

/// Validation and contract errors exposed by `skyfeed-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("latitude {value} is outside [-90, 90]")]
    LatitudeOutOfRange { value: f64 },
    #[error("longitude {value} is outside [-180, 180]")]
    LongitudeOutOfRange { value: f64 },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("invalid data type '{value}', expected one of current, forecast, historical")]
    InvalidDataType { value: String },
    #[error("invalid source '{value}', expected one of openweather, weatherapi, accuweather, noaa")]
    InvalidSource { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("job name cannot be empty")]
    EmptyJobName,
    #[error("job frequency must be at least 1 minute, got {minutes}")]
    InvalidJobFrequency { minutes: u64 },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
