use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{error::ShortenError, AppState};

pub mod redirect;
pub mod shorten;

/// Build the public router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/shorten", post(shorten::shorten))
        .route("/api/resolve/:code", get(shorten::resolve))
        // Short-link redirect; static routes above take priority.
        .route("/:code", get(redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// 404 with the same JSON shape as [`ApiError`].
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "short link not found" })),
    )
        .into_response()
}

/// [`ShortenError`] rendered as a JSON error body.
#[derive(Debug)]
pub struct ApiError(pub ShortenError);

impl From<ShortenError> for ApiError {
    fn from(err: ShortenError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ShortenError::InvalidLongUrl(_) | ShortenError::InvalidCodeFormat(_) => {
                StatusCode::BAD_REQUEST
            }
            err if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
