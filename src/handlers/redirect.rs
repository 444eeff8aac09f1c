use super::{not_found, ApiError};
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

/// GET /:code
///
/// Cache first, then the store (both inside [`crate::Shortener::resolve`]),
/// then a redirect to the original URL.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    match state.shortener.resolve(&code).await {
        Ok(Some(long_url)) => Redirect::to(&long_url).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::error!("Lookup failed for short code '{}'", code);
            ApiError(e).into_response()
        }
    }
}
