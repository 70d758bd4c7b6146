use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use devcamper_client::{GeocoderConfig, MapQuestGeocoder};
use devcamper_db::{Database, DatabaseConfig};
use devcamper_server::config::ServerConfig;
use devcamper_server::routes;
use devcamper_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("devcamper=info".parse()?))
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let geocoder = MapQuestGeocoder::from_config(&GeocoderConfig::from_env()?)?;

    let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    db.migrate().await?;

    let addr = config.bind_addr();
    tracing::info!(
        base_uri = %config.base_uri,
        uploads = %config.file_upload_path.display(),
        "Configuration loaded"
    );

    let state = Arc::new(AppState {
        db,
        geocoder: Arc::new(geocoder),
        config,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
