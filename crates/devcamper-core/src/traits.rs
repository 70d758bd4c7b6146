use futures::future::BoxFuture;

use crate::error::AppError;
use crate::models::Location;

/// Resolves a free-form address or postal code to a located point.
///
/// Object-safe so the server can hold any provider behind `Arc<dyn Geocoder>`.
pub trait Geocoder: Send + Sync {
    /// Returns `Ok(None)` when the provider has no match for `query`.
    fn geocode<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Option<Location>, AppError>>;
}

/// Geocode `query`, treating "no match" as a validation failure of `what`.
pub async fn resolve(
    geocoder: &dyn Geocoder,
    query: &str,
    what: &str,
) -> Result<Location, AppError> {
    geocoder
        .geocode(query)
        .await?
        .ok_or_else(|| AppError::Validation(format!("Could not geocode {what} '{query}'")))
}
