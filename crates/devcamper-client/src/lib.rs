pub mod config;
pub mod geocoder;

pub use config::{GeocoderConfig, GeocoderProvider};
pub use geocoder::MapQuestGeocoder;
