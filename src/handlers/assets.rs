// src/handlers/assets.rs

use axum::{
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};

use crate::{client::AssetStore, error::AppError};

/// Serves a static asset from the CDN through the in-memory cache.
/// The `x-cache` header tells whether the cache answered.
pub async fn serve_asset(
    State(assets): State<AssetStore>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (resource, status) = assets.fetch(&path).await?;

    let content_type = resource
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let mut response = resource.body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert("x-cache", HeaderValue::from_static(status.as_str()));
    Ok(response)
}
