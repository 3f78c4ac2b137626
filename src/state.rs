// src/state.rs

use axum::extract::FromRef;

use crate::{
    client::{ApiClient, AssetStore},
    config::Config,
    error::ClientError,
    utils::cache::ResourceCache,
};

#[derive(Clone)]
pub struct AppState {
    pub api: ApiClient,
    pub assets: AssetStore,
    pub config: Config,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, ClientError> {
        let api = ApiClient::new(config.api_base_url.clone(), config.request_timeout)?;
        let cache = ResourceCache::new(config.asset_cache_max_bytes, config.asset_cache_ttl);
        let assets = AssetStore::new(config.asset_cdn_url.clone(), cache, config.request_timeout)?;
        Ok(Self {
            api,
            assets,
            config,
        })
    }
}

impl FromRef<AppState> for ApiClient {
    fn from_ref(state: &AppState) -> Self {
        state.api.clone()
    }
}

impl FromRef<AppState> for AssetStore {
    fn from_ref(state: &AppState) -> Self {
        state.assets.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
