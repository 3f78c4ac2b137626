// src/config.rs

use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use dotenvy::dotenv;
use thiserror::Error;
use url::Url;

/// Default asset cache budget: 64 MiB.
pub const DEFAULT_ASSET_CACHE_MAX_BYTES: usize = 64 * 1024 * 1024;
pub const DEFAULT_ASSET_CACHE_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the exam backend, always ending with '/'.
    pub api_base_url: Url,
    /// Base URL of the static asset CDN, always ending with '/'.
    pub asset_cdn_url: Url,
    pub static_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub rust_log: String,
    pub log_dir: PathBuf,
    pub request_timeout: Duration,
    pub asset_cache_max_bytes: usize,
    pub asset_cache_ttl: Duration,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let api_base_url = parse_base_url("API_BASE_URL", &required("API_BASE_URL")?)?;
        let asset_cdn_url = parse_base_url("ASSET_CDN_URL", &required("ASSET_CDN_URL")?)?;

        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("public"));

        let bind_addr = optional_parsed("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("logs"));

        let request_timeout = Duration::from_secs(optional_parsed(
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        let asset_cache_max_bytes =
            optional_parsed("ASSET_CACHE_MAX_BYTES", DEFAULT_ASSET_CACHE_MAX_BYTES)?;

        let asset_cache_ttl = Duration::from_secs(optional_parsed(
            "ASSET_CACHE_TTL_SECS",
            DEFAULT_ASSET_CACHE_TTL_SECS,
        )?);

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(raw) => parse_cors_origins(&raw)?,
            Err(_) => vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        };

        Ok(Self {
            api_base_url,
            asset_cdn_url,
            static_dir,
            bind_addr,
            rust_log,
            log_dir,
            request_timeout,
            asset_cache_max_bytes,
            asset_cache_ttl,
            cors_origins,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional_parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Splits a comma separated origin list. Credentials are allowed
/// cross-origin, so a wildcard is refused.
pub fn parse_cors_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();
    if origins.iter().any(|origin| origin == "*") {
        return Err(ConfigError::Invalid {
            name: "CORS_ORIGINS",
            reason: "'*' cannot be combined with credentials; list origins explicitly".to_string(),
        });
    }
    Ok(origins)
}

/// Parses a base URL and makes sure relative joins keep its last path segment.
pub fn parse_base_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Invalid {
            name,
            reason: "not a base url".to_string(),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
