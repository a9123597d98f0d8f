//! HTTP routes.

use crate::auth::RequireApiKey;
use crate::honeypot::{Honeypot, HoneypotResponse, HoneypotStatus};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use scambait_detection::IntelBundle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub honeypot: Arc<Honeypot>,
    /// Expected `x-api-key` value; `None` disables the check.
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    #[must_use]
    pub fn new(honeypot: Arc<Honeypot>, api_key: Option<&str>) -> Self {
        Self {
            honeypot,
            api_key: api_key.map(Arc::from),
        }
    }
}

/// Inbound message body. A missing `message` is treated as empty.
#[derive(Debug, Default, Deserialize)]
pub struct InteractRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RootStatus {
    pub status: &'static str,
    pub message: &'static str,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root).post(interact))
        .route("/honeypot/interact", post(interact))
        .route("/honeypot/intel", get(intel))
        .route("/honeypot/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<RootStatus> {
    Json(RootStatus {
        status: "active",
        message: "Honeypot API is running. Send POST requests to / or /honeypot/interact",
    })
}

async fn interact(
    _: RequireApiKey,
    State(state): State<AppState>,
    Json(request): Json<InteractRequest>,
) -> Json<HoneypotResponse> {
    Json(state.honeypot.interact(&request.message).await)
}

async fn intel(_: RequireApiKey, State(state): State<AppState>) -> Json<IntelBundle> {
    Json(state.honeypot.intel())
}

async fn status(_: RequireApiKey, State(state): State<AppState>) -> Json<HoneypotStatus> {
    Json(state.honeypot.status())
}
