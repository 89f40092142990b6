//! Catalog image serving

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::AppState;

/// GET /api/images/:file
///
/// Serves a catalog image downscaled to the configured display scale.
/// First access decodes and resizes; later requests come from the cache.
pub async fn serve_image(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let cached = state.images.get(&file).await.map_err(|err| match err {
        gearpoll_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
        gearpoll_common::Error::NotFound(msg) => ApiError::NotFound(msg),
        other => ApiError::Internal(other.to_string()),
    })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, cached.content_type),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        cached.bytes.clone(),
    )
        .into_response())
}
