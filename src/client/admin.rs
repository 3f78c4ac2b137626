// src/client/admin.rs

use reqwest::Method;
use validator::Validate;

use crate::{
    client::{
        base::{ApiClient, BaseClient},
        envelope::{MessageEnvelope, normalize_attempt, normalize_list},
    },
    error::ClientError,
    lifecycle::{AttemptEvent, AttemptState},
    models::exam_attempt::{ExamAttempt, ExamAttemptWithDetails, UpdateAttempt},
    utils::session::Session,
};

/// Exam-attempt management for instructors and admins.
#[derive(Debug, Clone)]
pub struct AdminClient {
    api: ApiClient,
    token: Option<String>,
}

impl BaseClient for AdminClient {
    fn api(&self) -> &ApiClient {
        &self.api
    }

    fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl AdminClient {
    pub fn new(api: ApiClient, token: Option<String>) -> Self {
        Self { api, token }
    }

    pub fn for_session(api: ApiClient, session: &Session) -> Self {
        Self::new(api, Some(session.token().to_string()))
    }

    /// Lists every attempt with learner, exam and course resolved.
    pub async fn list_all(&self) -> Result<Vec<ExamAttemptWithDetails>, ClientError> {
        let raw = self.send(Method::GET, &["exam-attempts", "v1"], None).await?;
        Ok(normalize_list(raw))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<ExamAttemptWithDetails, ClientError> {
        let raw = self
            .send(Method::GET, &["exam-attempts", "v1", id], None)
            .await?;
        normalize_attempt(raw)
    }

    /// Applies an admin override. Any field may be set, including
    /// `isCompleted`; the lifecycle rules bind learners, not admins.
    pub async fn update(&self, id: &str, update: &UpdateAttempt) -> Result<ExamAttempt, ClientError> {
        update.validate()?;

        let body = serde_json::to_value(update)?;
        let raw = self
            .send(Method::PUT, &["exam-attempts", "v1", id], Some(body))
            .await?;
        let attempt = normalize_attempt(raw)?;
        tracing::info!(attempt_id = id, "Exam attempt updated by admin");
        Ok(attempt)
    }

    /// Reveals the result of one submitted attempt.
    pub async fn reveal_result(&self, id: &str) -> Result<ExamAttempt, ClientError> {
        let current = self.get_by_id(id).await?;
        AttemptState::of(&current).apply(AttemptEvent::RevealResult)?;

        let update = UpdateAttempt {
            is_result_shown: Some(true),
            ..Default::default()
        };
        self.update(id, &update).await
    }

    /// Deletes an attempt. Returns the backend's confirmation message.
    pub async fn delete(&self, id: &str) -> Result<Option<String>, ClientError> {
        let raw = self
            .send(Method::DELETE, &["exam-attempts", "v1", id], None)
            .await?;
        let reply = MessageEnvelope::from_value(raw)?;
        tracing::info!(attempt_id = id, "Exam attempt deleted by admin");
        Ok(reply.message)
    }

    /// Reveals results for every completed attempt of `exam_id`.
    ///
    /// Idempotent: repeating the call leaves the same attempts revealed and
    /// succeeds again.
    pub async fn show_results_for_exam(&self, exam_id: &str) -> Result<Option<String>, ClientError> {
        let raw = self
            .send(
                Method::PUT,
                &["exam-attempts", "v1", "exam", exam_id, "show-results"],
                None,
            )
            .await?;
        let reply = MessageEnvelope::from_value(raw)?;
        tracing::info!(exam_id, status = ?reply.status, "Results revealed for exam");
        Ok(reply.message)
    }
}
