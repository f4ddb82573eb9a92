/**
 * Router Configuration
 *
 * Combines all route configurations into a single Axum router.
 *
 * # Route Order
 *
 * 1. Gateway (`GET /ws`)
 * 2. API routes (chat rooms, messages, notifications)
 * 3. Health check
 * 4. Fallback handler (404)
 *
 * Every request is traced by `TraceLayer`; CORS is permissive since
 * clients authenticate with bearer tokens rather than cookies.
 */

use axum::{http::StatusCode, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::gateway::handle_ws_upgrade;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new().route("/ws", get(handle_ws_upgrade));

    let router = configure_api_routes(router);

    router
        .route("/health", get(|| async { "OK" }))
        .fallback(|| async { (StatusCode::NOT_FOUND, "404 Not Found") })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
