use std::sync::Arc;

use devcamper_core::Geocoder;
use devcamper_db::Database;

use crate::config::ServerConfig;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    pub geocoder: Arc<dyn Geocoder>,
    pub config: ServerConfig,
}
