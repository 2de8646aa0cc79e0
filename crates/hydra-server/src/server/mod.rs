//! HTTP surface: REST routes, WebSocket upgrade, error mapping.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::AuthGateway;
use crate::engines::EngineService;
use crate::hub::RealtimeHub;

pub mod error;
pub mod extract;
pub mod routes_auth;
pub mod routes_trading;
pub mod ws;

#[cfg(test)]
mod routes_tests;
#[cfg(test)]
mod ws_tests;

pub use error::ApiError;

/// Ping cadence and eviction threshold for realtime connections.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatSettings {
    pub interval: Duration,
    pub missed_max: u32,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            missed_max: 2,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<AuthGateway>,
    pub engines: Arc<EngineService>,
    pub hub: Arc<RealtimeHub>,
    pub heartbeat: HeartbeatSettings,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/auth/challenge", post(routes_auth::challenge))
        .route("/auth/verify", post(routes_auth::verify))
        .route("/auth/refresh", post(routes_auth::refresh))
        .route("/auth/logout", post(routes_auth::logout))
        .route(
            "/trading/engines",
            get(routes_trading::list)
                .post(routes_trading::configure)
                .put(routes_trading::apply_action),
        )
        .route("/ws", get(ws::upgrade))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
