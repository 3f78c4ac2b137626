// src/client/assets.rs

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use reqwest::{StatusCode, header::CONTENT_TYPE};
use url::Url;

use crate::{
    error::{ClientError, GENERIC_FAILURE_MESSAGE},
    utils::cache::{CacheStats, CachedResource, ResourceCache},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
        }
    }
}

/// Static assets fetched from the CDN and kept in a shared [`ResourceCache`].
#[derive(Debug, Clone)]
pub struct AssetStore {
    http: reqwest::Client,
    cdn_base: Url,
    cache: Arc<Mutex<ResourceCache>>,
}

impl AssetStore {
    pub fn new(cdn_base: Url, cache: ResourceCache, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            cdn_base,
            cache: Arc::new(Mutex::new(cache)),
        })
    }

    /// Serves `path` from the cache, fetching it from the CDN on a miss.
    pub async fn fetch(&self, path: &str) -> Result<(CachedResource, CacheStatus), ClientError> {
        let url = asset_url(&self.cdn_base, path)?;

        if let Some(hit) = self.lock().get(path) {
            return Ok((hit, CacheStatus::Hit));
        }

        let response = self.http.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(format!("Asset '{}' not found", path)));
        }
        if !status.is_success() {
            tracing::warn!(path, %status, "CDN fetch failed");
            return Err(ClientError::Server {
                status,
                message: GENERIC_FAILURE_MESSAGE.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        let resource = CachedResource { body, content_type };
        if !self.lock().insert(path, resource.clone()) {
            tracing::debug!(path, size = resource.size(), "Asset too large to cache");
        }
        Ok((resource, CacheStatus::Miss))
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    /// Drops expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.lock().purge_expired(Instant::now())
    }

    // Poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, ResourceCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Only plain relative paths may reach the CDN. The path arrives already
/// percent-decoded, so a leftover `%`, `:` or backslash can only be an attempt to
/// have the URL parser reinterpret a segment.
fn validate_asset_path(path: &str) -> Result<(), ClientError> {
    let invalid = path.is_empty()
        || path.split('/').any(|segment| {
            segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains([':', '%', '\\'])
        });
    if invalid {
        return Err(ClientError::Validation(format!("Invalid asset path '{}'", path)));
    }
    Ok(())
}

/// Appends `path` below `cdn_base` segment by segment. Segments are
/// percent-encoded, never re-parsed, and the result must stay under the base.
fn asset_url(cdn_base: &Url, path: &str) -> Result<Url, ClientError> {
    validate_asset_path(path)?;

    let mut url = cdn_base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(cdn_base.to_string()))?
        .pop_if_empty()
        .extend(path.split('/'));

    if url.origin() != cdn_base.origin() || !url.path().starts_with(cdn_base.path()) {
        return Err(ClientError::Validation(format!("Invalid asset path '{}'", path)));
    }
    Ok(url)
}
