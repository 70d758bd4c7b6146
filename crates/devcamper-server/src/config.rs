use std::path::PathBuf;

use devcamper_core::AppError;
use devcamper_core::geo::DistanceUnit;
use devcamper_core::query::{QueryOptions, TotalCount};

pub const DEFAULT_HOSTNAME: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BASE_URI: &str = "/api/v1";
pub const DEFAULT_MAX_FILE_UPLOAD: usize = 1_000_000;
pub const DEFAULT_FILE_UPLOAD_PATH: &str = "./public/uploads";

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    /// Mount point of the REST API, without a trailing slash.
    pub base_uri: String,
    pub max_file_upload: usize,
    pub file_upload_path: PathBuf,
    pub radius_unit: DistanceUnit,
    pub query: QueryOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            port: DEFAULT_PORT,
            base_uri: DEFAULT_BASE_URI.to_string(),
            max_file_upload: DEFAULT_MAX_FILE_UPLOAD,
            file_upload_path: PathBuf::from(DEFAULT_FILE_UPLOAD_PATH),
            radius_unit: DistanceUnit::default(),
            query: QueryOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Read configuration from environment variables; see the README for the full list.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let invalid = |key: &str, raw: &str, expected: &str| {
            AppError::ConfigError(format!("Invalid {key} '{raw}': {expected}"))
        };

        let mut config = Self::default();

        if let Some(hostname) = var("APP_HOSTNAME") {
            config.hostname = hostname;
        }
        if let Some(raw) = var("APP_PORT") {
            config.port = raw
                .trim()
                .parse()
                .map_err(|_| invalid("APP_PORT", &raw, "must be a port number"))?;
        }
        if let Some(raw) = var("APP_BASEURI") {
            config.base_uri = normalize_base_uri(&raw)
                .ok_or_else(|| invalid("APP_BASEURI", &raw, "must be a path like /api/v1"))?;
        }
        if let Some(raw) = var("MAX_FILE_UPLOAD") {
            config.max_file_upload = raw
                .trim()
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("MAX_FILE_UPLOAD", &raw, "must be a positive byte count"))?;
        }
        if let Some(raw) = var("FILE_UPLOAD_PATH") {
            config.file_upload_path = PathBuf::from(raw);
        }
        if let Some(raw) = var("RADIUS_UNIT") {
            config.radius_unit = raw
                .parse()
                .map_err(|_| invalid("RADIUS_UNIT", &raw, "expected 'miles' or 'kilometers'"))?;
        }
        if let Some(raw) = var("PAGINATION_TOTAL") {
            config.query.total = raw
                .parse::<TotalCount>()
                .map_err(AppError::ConfigError)?;
        }
        if let Some(raw) = var("MAX_PAGE_SIZE") {
            let max = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("MAX_PAGE_SIZE", &raw, "must be a positive integer"))?;
            config.query.max_limit = Some(max);
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

/// `api/v1/` -> `/api/v1`. The root itself is not a valid mount point.
fn normalize_base_uri(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() || trimmed.contains(['{', '}', '*', '?', '#', ' ']) {
        return None;
    }
    Some(format!("/{trimmed}"))
}
