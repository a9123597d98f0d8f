//! API-key extractor for Axum.

use crate::routes::AppState;
use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor that admits a request only when it carries the configured API
/// key. With no key configured every request is admitted.
pub struct RequireApiKey;

impl<S> FromRequestParts<S> for RequireApiKey
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let Some(expected) = state.api_key.as_deref() else {
            return Ok(RequireApiKey);
        };

        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        match presented {
            Some(key) if key == expected => Ok(RequireApiKey),
            Some(_) => {
                debug!("rejected request with wrong API key");
                Err(AuthRejection::InvalidKey)
            }
            None => {
                debug!("rejected request without API key");
                Err(AuthRejection::InvalidKey)
            }
        }
    }
}

/// Rejection type for [`RequireApiKey`].
#[derive(Debug)]
pub enum AuthRejection {
    InvalidKey,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidKey => (
                StatusCode::FORBIDDEN,
                Json(json!({"detail": "Could not validate credentials"})),
            )
                .into_response(),
        }
    }
}
