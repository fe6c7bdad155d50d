//! Worldhub API server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use worldhub_api::config::Config;
use worldhub_api::error::AppError;
use worldhub_api::state::AppState;
use worldhub_core::clock::SystemClock;
use worldhub_core::repository::WorldStore;
use worldhub_membership::application::capabilities::RoleCapabilities;
use worldhub_store::PgWorldStore;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Worldhub API server");

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    worldhub_store::schema::MIGRATOR.run(&pool).await?;

    let store: Arc<dyn WorldStore> = Arc::new(PgWorldStore::new(pool));
    let capabilities = RoleCapabilities::new(Arc::clone(&store), config.system_admin_ids.clone());
    let app_state = AppState::new(store, Arc::new(capabilities), Arc::new(SystemClock))
        .with_invite_policy(config.invite_policy)
        .with_ws_send_buffer(config.ws_send_buffer);

    // TODO: Restrict CorsLayer to the gateway origin instead of permissive().
    let app = worldhub_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr()?;
    tracing::info!(%addr, invite_policy = ?config.invite_policy, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
