//! Spherical distance math for radius search.

use std::str::FromStr;

use crate::error::AppError;
use crate::models::Location;

pub const EARTH_RADIUS_MILES: f64 = 3963.0;
pub const EARTH_RADIUS_KILOMETERS: f64 = 6378.0;

/// Unit of the `distance` path segment in radius search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn earth_radius(&self) -> f64 {
        match self {
            DistanceUnit::Miles => EARTH_RADIUS_MILES,
            DistanceUnit::Kilometers => EARTH_RADIUS_KILOMETERS,
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mi" | "mile" | "miles" => Ok(DistanceUnit::Miles),
            "km" | "kilometer" | "kilometers" | "kilometre" | "kilometres" => {
                Ok(DistanceUnit::Kilometers)
            }
            other => Err(format!(
                "Invalid distance unit '{other}': expected 'miles' or 'kilometers'"
            )),
        }
    }
}

/// A circle on the sphere: centre in degrees, radius as a central angle.
///
/// The great-circle test itself runs in SQL against the stored coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radians: f64,
}

impl RadiusQuery {
    pub fn new(center: &Location, distance: f64, unit: DistanceUnit) -> Self {
        Self {
            latitude: center.latitude(),
            longitude: center.longitude(),
            radians: distance / unit.earth_radius(),
        }
    }
}

/// Parse the `distance` path segment: a finite, non-negative number.
pub fn parse_distance(raw: &str) -> Result<f64, AppError> {
    match raw.trim().parse::<f64>() {
        Ok(d) if d.is_finite() && d >= 0.0 => Ok(d),
        _ => Err(AppError::Validation(format!(
            "Invalid distance '{raw}': expected a non-negative number"
        ))),
    }
}
