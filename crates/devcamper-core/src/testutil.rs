//! Test utilities: an in-memory geocoder.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::error::AppError;
use crate::models::Location;
use crate::traits::Geocoder;

/// Geocoder that answers from a fixed table and records every query.
#[derive(Clone, Default)]
pub struct FixedGeocoder {
    places: Arc<Mutex<HashMap<String, Location>>>,
    error: Arc<Mutex<Option<AppError>>>,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl FixedGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a match for `query` at the given coordinates.
    pub fn with_place(self, query: &str, longitude: f64, latitude: f64, zipcode: &str) -> Self {
        let mut location = Location::point(longitude, latitude);
        location.zipcode = Some(zipcode.to_string());
        location.formatted_address = Some(query.to_string());
        self.places
            .lock()
            .unwrap()
            .insert(query.to_string(), location);
        self
    }

    /// The next call fails with `error`.
    pub fn with_error(self, error: AppError) -> Self {
        *self.error.lock().unwrap() = Some(error);
        self
    }
}

impl Geocoder for FixedGeocoder {
    fn geocode<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Option<Location>, AppError>> {
        Box::pin(async move {
            self.queries.lock().unwrap().push(query.to_string());
            if let Some(e) = self.error.lock().unwrap().take() {
                return Err(e);
            }
            Ok(self.places.lock().unwrap().get(query).cloned())
        })
    }
}
