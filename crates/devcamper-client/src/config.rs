use std::str::FromStr;

use devcamper_core::AppError;

pub const DEFAULT_MAPQUEST_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

/// Supported geocoding backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeocoderProvider {
    #[default]
    MapQuest,
}

impl FromStr for GeocoderProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mapquest" => Ok(GeocoderProvider::MapQuest),
            other => Err(AppError::ConfigError(format!(
                "Unsupported GEOCODER_PROVIDER '{other}': only 'mapquest' is available"
            ))),
        }
    }
}

/// Geocoder settings read from the environment.
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub provider: GeocoderProvider,
    pub api_key: String,
    pub base_url: String,
}

impl GeocoderConfig {
    /// Read configuration from environment variables.
    ///
    /// - `GEOCODER_API_KEY` (required)
    /// - `GEOCODER_PROVIDER` (optional, defaults to `mapquest`)
    /// - `GEOCODER_BASE_URL` (optional, defaults to the provider endpoint)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let provider = match var("GEOCODER_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => GeocoderProvider::default(),
        };

        let api_key = var("GEOCODER_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::ConfigError("GEOCODER_API_KEY not set. Required for geocoding.".into())
            })?;

        let base_url = var("GEOCODER_BASE_URL").unwrap_or_else(|| DEFAULT_MAPQUEST_URL.to_string());
        url::Url::parse(&base_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid GEOCODER_BASE_URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            provider,
            api_key,
            base_url,
        })
    }
}
