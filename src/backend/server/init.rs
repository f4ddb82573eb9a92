/**
 * Server Initialization
 *
 * # Initialization Process
 *
 * 1. Load `ServerConfig` from the environment
 * 2. Open the database and run migrations
 * 3. Build the push providers that are configured
 * 4. Create `AppState`
 * 5. Start background tasks: the project event listener and the periodic
 *    cleanup of idle room channels
 * 6. Create the router
 */

use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::backend::chat::{spawn_project_listener, ProjectEvent};
use crate::backend::notifications::build_providers;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::load_database;
use crate::backend::server::state::AppState;
use crate::shared::{ConfigError, ServerConfig};

/// How often room channels without receivers are pruned
pub const CHANNEL_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create and configure the Axum application
///
/// Returns the router together with the configuration it was built from,
/// so the caller can bind `server_port`.
///
/// # Errors
///
/// A missing `JWT_SECRET`, an invalid numeric setting or an unreachable
/// database fail startup. Push providers never do: an unconfigured provider
/// is disabled with a warning.
pub async fn create_app() -> Result<(Router, ServerConfig), StartupError> {
    tracing::info!("[Server] Initializing Sentinel chat server");

    let config = ServerConfig::from_env()?;
    let pool = load_database(&config.database_url).await?;
    let providers = build_providers(&config);

    let (app_state, project_events) = AppState::new(config.clone(), pool, providers);
    tracing::info!(
        "[Server] Push providers enabled: {:?}",
        app_state.notifications.provider_kinds()
    );
    spawn_background_tasks(&app_state, project_events);

    let app = create_router(app_state);
    tracing::info!("[Server] Router configured");

    Ok((app, config))
}

/// Start the project event listener and the idle channel cleanup
pub fn spawn_background_tasks(app_state: &AppState, project_events: mpsc::Receiver<ProjectEvent>) {
    spawn_project_listener(app_state.pool.clone(), app_state.project_notifier(), project_events);

    let hub = app_state.hub.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHANNEL_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = hub.cleanup_inactive_channels();
            if removed > 0 {
                tracing::debug!("[Realtime] Cleaned up {} inactive room channels", removed);
            }
        }
    });
}
