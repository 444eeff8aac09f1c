use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{not_found, ApiError};
use crate::{models::ShortUrl, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenRequest {
    pub long_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub long_url: String,
}

/// POST /shorten
///
/// Returns the existing short URL if `longUrl` was shortened before.
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ShortenRequest>,
) -> Result<Json<ShortUrl>, ApiError> {
    let short = state.shortener.shorten(&req.long_url).await?;
    Ok(Json(short))
}

/// GET /api/resolve/:code
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Response, ApiError> {
    Ok(match state.shortener.resolve(&code).await? {
        Some(long_url) => Json(ResolveResponse { long_url }).into_response(),
        None => not_found(),
    })
}
