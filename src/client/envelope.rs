// src/client/envelope.rs

//! Response envelope decoding.
//!
//! The backend wraps the same payload in several shapes depending on the
//! endpoint and its version. Lists and single attempts each go through one
//! function here instead of ad hoc checks at every call site.

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    error::ClientError,
    models::{exam::Exam, exam_attempt::ExamAttempt},
};

/// Keys that may hold an attempt list, in lookup order.
const LIST_KEYS: [&str; 3] = ["examAttempts", "data", "attempts"];

/// Keys that may hold a single attempt, in lookup order.
const SINGLE_KEYS: [&str; 3] = ["examAttempt", "data", "attempt"];

/// Accepts a bare array or an object carrying the array under one of
/// [`LIST_KEYS`]. Any other shape yields an empty list. Items that fail to
/// decode are skipped.
pub fn normalize_list<T: DeserializeOwned>(raw: Value) -> Vec<T> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let found = LIST_KEYS.iter().find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            });
            match found {
                Some(items) => items,
                None => {
                    tracing::warn!(
                        keys = ?map.keys().collect::<Vec<_>>(),
                        "Unrecognized list envelope, treating as empty"
                    );
                    return Vec::new();
                }
            }
        }
        other => {
            tracing::warn!(kind = value_kind(&other), "Unrecognized list envelope, treating as empty");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(index, "Skipping undecodable list item: {}", e);
                None
            }
        })
        .collect()
}

pub fn normalize_attempt_list(raw: Value) -> Vec<ExamAttempt> {
    normalize_list(raw)
}

/// Finds an attempt in a single-object response: under one of
/// [`SINGLE_KEYS`], or the object itself when it carries an `_id`.
///
/// `Ok(None)` means the body holds no attempt at all.
pub fn extract_attempt(raw: Value) -> Result<Option<ExamAttempt>, ClientError> {
    let Value::Object(mut map) = raw else {
        return Ok(None);
    };

    for key in SINGLE_KEYS {
        if let Some(inner @ Value::Object(_)) = map.remove(key) {
            return serde_json::from_value(inner).map(Some).map_err(ClientError::from);
        }
    }

    if map.contains_key("_id") {
        return serde_json::from_value(Value::Object(map))
            .map(Some)
            .map_err(ClientError::from);
    }

    Ok(None)
}

pub fn normalize_attempt(raw: Value) -> Result<ExamAttempt, ClientError> {
    extract_attempt(raw)?
        .ok_or_else(|| ClientError::Decode("response carried no exam attempt".to_string()))
}

/// Reply to `start/{examId}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEnvelope {
    pub exam_attempt: ExamAttempt,
    pub exam: Exam,
}

/// Replies that only carry a status and a message (delete, bulk reveal).
#[derive(Debug, Default, Deserialize)]
pub struct MessageEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MessageEnvelope {
    /// An empty body is a valid reply as well.
    pub fn from_value(raw: Value) -> Result<Self, ClientError> {
        if raw.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(raw).map_err(ClientError::from)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
