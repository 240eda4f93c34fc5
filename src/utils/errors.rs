// src/utils/errors.rs

use std::{error::Error, fmt};
use actix_web::http::StatusCode;

/// Caller-side defects detected by the scanners. Never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScanError {
    #[error("insufficient data: need at least {required} candles, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ScanError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ScanError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Errors at the request/adapter level: CSV decoding, config and scan failures.
#[derive(Debug)]
pub enum ApiError {
    Csv(csv::Error),
    MissingColumns(Vec<String>),
    NoUsableRows { total: usize },
    Scan(ScanError),
    Config(String),
}

impl ApiError {
    /// HTTP status the request layer answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Scan(ScanError::InsufficientData { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Csv(e)               => write!(f, "CSV error: {}", e),
            ApiError::MissingColumns(cols) => write!(f, "missing required columns: {}", cols.join(", ")),
            ApiError::NoUsableRows { total } => write!(f, "no usable candle rows out of {}", total),
            ApiError::Scan(e)              => write!(f, "{}", e),
            ApiError::Config(msg)          => write!(f, "Config error: {}", msg),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiError::Csv(e)  => Some(e),
            ApiError::Scan(e) => Some(e),
            _                 => None,
        }
    }
}

impl From<csv::Error> for ApiError {
    fn from(err: csv::Error) -> Self { ApiError::Csv(err) }
}
impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self { ApiError::Scan(err) }
}
