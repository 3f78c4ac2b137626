// src/utils/session.rs

use axum::http::{HeaderMap, header};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Cookie the web app stores the access token in.
pub const TOKEN_COOKIE: &str = "token";

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_HOME_PATH: &str = "/dashboard";
pub const LEARNER_HOME_PATH: &str = "/user-dashboard/profile";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no access token")]
    Missing,

    #[error("malformed access token: {0}")]
    Malformed(String),

    #[error("access token expired")]
    Expired,
}

/// Role claim, with everything that is not an admin role treated as a learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    SuperAdmin,
    Admin,
    Learner(String),
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "superadmin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            _ => Role::Learner(raw.to_string()),
        }
    }
}

impl Role {
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    /// Where a signed-in user lands by default.
    pub fn home_path(&self) -> &'static str {
        if self.is_staff() {
            ADMIN_HOME_PATH
        } else {
            LEARNER_HOME_PATH
        }
    }
}

/// Typed claims read from the access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub role: Role,
    /// Expiration as a Unix timestamp. Tokens without one never expire here.
    pub exp: Option<u64>,
    pub user_id: Option<String>,
}

/// Claims as they appear on the wire. Issuers disagree on where the user id
/// lives, so every known spot is read.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    exp: Option<u64>,
    #[serde(default, rename = "userId")]
    user_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, rename = "_id")]
    object_id: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
}

fn id_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decodes the token payload without verifying its signature.
///
/// The gateway never holds the signing secret; the backend verifies every
/// token it receives. Claims are used for routing decisions only.
pub fn decode_claims(token: &str) -> Result<Claims, SessionError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<RawClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| SessionError::Malformed(e.to_string()))?;
    let raw = data.claims;

    let user_id = [raw.user_id, raw.id, raw.object_id, raw.sub]
        .into_iter()
        .flatten()
        .find_map(id_string);

    Ok(Claims {
        role: Role::from(raw.role.as_deref().unwrap_or_default()),
        exp: raw.exp,
        user_id,
    })
}

/// The signed-in user for one request, decoded once by the route gate and
/// shared with handlers through request extensions.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    pub claims: Claims,
}

impl Session {
    /// Decodes `token` and rejects it if it expired at or before `now`.
    pub fn from_token(token: &str, now: u64) -> Result<Self, SessionError> {
        let claims = decode_claims(token)?;
        if matches!(claims.exp, Some(exp) if exp <= now) {
            return Err(SessionError::Expired);
        }
        Ok(Self {
            token: token.to_string(),
            claims,
        })
    }

    /// Reads the token from the `token` cookie, falling back to an
    /// `Authorization: Bearer` header.
    pub fn from_request(jar: &CookieJar, headers: &HeaderMap) -> Result<Self, SessionError> {
        let token = token_from_request(jar, headers).ok_or(SessionError::Missing)?;
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        Self::from_token(&token, now)
    }

    /// Raw token, forwarded to the backend as a bearer credential.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn role(&self) -> &Role {
        &self.claims.role
    }

    pub fn user_id(&self) -> Option<&str> {
        self.claims.user_id.as_deref()
    }
}

pub fn token_from_request(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
