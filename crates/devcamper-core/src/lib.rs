pub mod aggregate;
pub mod error;
pub mod geo;
pub mod models;
pub mod query;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use error::AppError;
pub use models::{Bootcamp, Course, Location};
pub use query::{Page, Pagination, ResultQuery};
pub use traits::Geocoder;
