mod api;
mod config;
mod db;
mod models;
mod raw_sql;
mod schema;
mod store;
mod telemetry;

use std::env;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use store::memory::MemoryStore;
use store::postgres::PgRecipeStore;
use store::RecipeStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecipeStore>,
    /// Deadline for each store call
    pub store_timeout: Duration,
    pub track_store_calls: bool,
}

/// Pick the backing store: PostgreSQL when configured, otherwise memory,
/// seeded from a file if one is given.
fn build_store(config: &Config) -> Result<Arc<dyn RecipeStore>, Box<dyn Error>> {
    if let Some(url) = &config.database_url {
        let pool = db::create_pool(url, config.store_timeout)?;
        tracing::info!("Using PostgreSQL recipe store");
        return Ok(Arc::new(PgRecipeStore::new(pool)));
    }

    let store = match &config.seed_file {
        Some(path) => MemoryStore::from_seed_file(path)?,
        None => MemoryStore::new(),
    };
    tracing::info!(recipes = store.len(), "Using in-memory recipe store");
    Ok(Arc::new(store))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        println!("{}", api::openapi().to_pretty_json()?);
        return Ok(());
    }

    let _telemetry = telemetry::init_telemetry();

    let config = Config::from_env()?;
    let store = build_store(&config)?;

    let state = AppState {
        store,
        store_timeout: config.store_timeout,
        track_store_calls: config.track_store_calls,
    };

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    let app = api::router(state)
        .merge(swagger_ui)
        .layer(telemetry::trace_layer());

    let listener = TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec available at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
