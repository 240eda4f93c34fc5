use dotenv::dotenv;
use std::{env, str::FromStr};

use crate::services::scanner::{mtf::DEFAULT_BODY_RATIO_FILTER, zone_scan::non_negative, ScanParameters};
use crate::utils::errors::ApiError;

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_host: String,
    pub server_port: u16,
    /// Used when a request leaves a scan parameter out.
    pub scan_defaults: ScanParameters,
    pub body_ratio_filter: f64,
    pub max_body_bytes: usize,
    pub metrics_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".into(),
            server_port: 8000,
            scan_defaults: ScanParameters::default(),
            body_ratio_filter: DEFAULT_BODY_RATIO_FILTER,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            metrics_enabled: true,
        }
    }
}

/// Read `key`, falling back to `default` when unset. A set-but-unparsable
/// value is an error rather than a silent fallback.
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, ApiError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ApiError::Config(format!("{key} has an invalid value: {raw:?}"))),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn new() -> Result<Self, ApiError> {
        dotenv().ok(); // loads `.env` file automatically
        Self::from_env()
    }

    /// Build from the current process environment only.
    pub fn from_env() -> Result<Self, ApiError> {
        let d = Settings::default();

        let scan_defaults = ScanParameters {
            retest_window: env_or("SCAN_RETEST_WINDOW", d.scan_defaults.retest_window)?,
            sl_offset_points: env_or("SCAN_SL_OFFSET", d.scan_defaults.sl_offset_points)?,
            tp1_points: env_or("SCAN_TP1", d.scan_defaults.tp1_points)?,
            tp2_points: env_or("SCAN_TP2", d.scan_defaults.tp2_points)?,
        };
        scan_defaults
            .validate()
            .map_err(|e| ApiError::Config(format!("scan defaults: {e}")))?;

        let body_ratio_filter = env_or("SCAN_BODY_RATIO_FILTER", d.body_ratio_filter)?;
        non_negative("body_ratio_filter", body_ratio_filter)
            .map_err(|e| ApiError::Config(format!("scan defaults: {e}")))?;

        Ok(Self {
            server_host: env::var("SERVER_HOST").unwrap_or(d.server_host),
            server_port: env_or("SERVER_PORT", d.server_port)?,
            scan_defaults,
            body_ratio_filter,
            max_body_bytes: env_or("MAX_BODY_BYTES", d.max_body_bytes)?,
            metrics_enabled: env_or("METRICS_ENABLED", d.metrics_enabled)?,
        })
    }
}
