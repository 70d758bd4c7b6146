use std::time::Duration;

use devcamper_core::error::AppError;
use devcamper_core::models::Location;
use devcamper_core::traits::Geocoder;
use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;

use crate::config::{GeocoderConfig, GeocoderProvider};

const DEFAULT_GEOCODER_TIMEOUT: Duration = Duration::from_secs(10);

/// MapQuest geocoding API client.
#[derive(Clone)]
pub struct MapQuestGeocoder {
    client: Client,
    base_url: String,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, AppError> {
        Self::with_timeout(api_key, base_url, DEFAULT_GEOCODER_TIMEOUT)
    }

    pub fn with_timeout(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::GeocoderError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &GeocoderConfig) -> Result<Self, AppError> {
        match config.provider {
            GeocoderProvider::MapQuest => Self::new(&config.api_key, &config.base_url),
        }
    }

    async fn lookup(&self, query: &str) -> Result<Option<Location>, AppError> {
        let url = url::Url::parse_with_params(
            &self.base_url,
            [("key", self.api_key.as_str()), ("location", query)],
        )
        .map_err(|e| AppError::GeocoderError(format!("Invalid geocoder URL: {e}")))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::GeocoderError("Geocoding request timed out".into())
                } else {
                    // The request URL carries the API key.
                    AppError::GeocoderError(format!(
                        "Geocoding request failed: {}",
                        e.without_url()
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GeocoderError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| {
                AppError::GeocoderError(format!("Failed to parse response: {}", e.without_url()))
            })?;

        let location = first_location(body)?;
        match &location {
            Some(loc) => tracing::debug!(
                query,
                lat = loc.latitude(),
                lng = loc.longitude(),
                "Geocoded"
            ),
            None => tracing::debug!(query, "No geocoding match"),
        }
        Ok(location)
    }
}

impl Geocoder for MapQuestGeocoder {
    fn geocode<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Option<Location>, AppError>> {
        Box::pin(self.lookup(query))
    }
}

// ---- MapQuest API types ----

#[derive(Deserialize)]
struct GeocodeResponse {
    info: Info,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct Info {
    statuscode: i64,
    #[serde(default)]
    messages: Vec<String>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: LatLng,
    #[serde(default)]
    street: Option<String>,
    /// City
    #[serde(default)]
    admin_area5: Option<String>,
    /// State
    #[serde(default)]
    admin_area3: Option<String>,
    /// Country
    #[serde(default)]
    admin_area1: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn first_location(body: GeocodeResponse) -> Result<Option<Location>, AppError> {
    if body.info.statuscode != 0 {
        let detail = if body.info.messages.is_empty() {
            format!("status {}", body.info.statuscode)
        } else {
            body.info.messages.join("; ")
        };
        return Err(AppError::GeocoderError(detail));
    }

    let Some(found) = body
        .results
        .into_iter()
        .next()
        .and_then(|r| r.locations.into_iter().next())
    else {
        return Ok(None);
    };

    let street = non_empty(found.street);
    let city = non_empty(found.admin_area5);
    let state = non_empty(found.admin_area3);
    let zipcode = non_empty(found.postal_code);
    let country = non_empty(found.admin_area1);

    let state_zip = [state.as_deref(), zipcode.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let formatted = [
        street.as_deref(),
        city.as_deref(),
        Some(state_zip.as_str()).filter(|s| !s.is_empty()),
        country.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ");

    Ok(Some(Location {
        formatted_address: Some(formatted).filter(|f| !f.is_empty()),
        street,
        city,
        state,
        zipcode,
        country,
        ..Location::point(found.lat_lng.lng, found.lat_lng.lat)
    }))
}
