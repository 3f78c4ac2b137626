// src/handlers/admin.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    client::{AdminClient, ApiClient},
    error::AppError,
    lifecycle::{AttemptState, StatusBadge},
    models::exam_attempt::UpdateAttempt,
    utils::session::Session,
    views::{AdminAttemptView, AnswerReview},
};

/// Query parameters for listing attempts.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub exam_id: Option<String>,
    pub status: Option<StatusFilter>,
    /// Soft-deleted attempts are hidden unless asked for.
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    InProgress,
    PendingReview,
    Completed,
}

impl StatusFilter {
    fn matches(self, badge: StatusBadge) -> bool {
        matches!(
            (self, badge),
            (StatusFilter::InProgress, StatusBadge::InProgress)
                | (StatusFilter::PendingReview, StatusBadge::PendingReview)
                | (StatusFilter::Completed, StatusBadge::Completed)
        )
    }
}

/// Destructive actions must be confirmed with `?confirm=true`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmParams {
    #[serde(default)]
    pub confirm: bool,
}

impl ConfirmParams {
    fn require(&self, action: &str) -> Result<(), AppError> {
        if self.confirm {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Confirmation required to {}. Repeat the request with confirm=true.",
                action
            )))
        }
    }
}

/// DTO for one attempt with its reviewed answers.
#[derive(Debug, Serialize)]
pub struct AttemptDetailResponse {
    pub attempt: AdminAttemptView,
    pub answers: Vec<AnswerReview>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Lists exam attempts.
/// Admin only.
pub async fn list_attempts(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let client = AdminClient::for_session(api, &session);
    let attempts = client.list_all().await?;

    let views: Vec<AdminAttemptView> = attempts
        .iter()
        .filter(|a| params.include_deleted || !a.is_deleted)
        .filter(|a| params.exam_id.as_deref().is_none_or(|exam| a.exam_key() == Some(exam)))
        .filter(|a| {
            params
                .status
                .is_none_or(|status| status.matches(AttemptState::of(a).badge()))
        })
        .map(AdminAttemptView::from)
        .collect();

    Ok(Json(views))
}

/// Retrieves a single attempt with answers.
/// Admin only.
pub async fn get_attempt(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let client = AdminClient::for_session(api, &session);
    let attempt = client.get_by_id(&id).await?;

    Ok(Json(AttemptDetailResponse {
        answers: attempt.answers.iter().map(AnswerReview::from).collect(),
        attempt: AdminAttemptView::from(&attempt),
    }))
}

/// Applies a manual grading or correction.
/// Admin only.
pub async fn update_attempt(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAttempt>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let client = AdminClient::for_session(api, &session);
    let attempt = client.update(&id, &payload).await?;

    Ok(Json(AdminAttemptView::from(&attempt)))
}

/// Reveals the result of one attempt.
/// Admin only.
pub async fn reveal_result(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let client = AdminClient::for_session(api, &session);
    let attempt = client.reveal_result(&id).await?;

    Ok(Json(AdminAttemptView::from(&attempt)))
}

/// Deletes an attempt.
/// Admin only; requires confirmation.
pub async fn delete_attempt(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmParams>,
) -> Result<impl IntoResponse, AppError> {
    confirm.require("delete this attempt")?;

    let client = AdminClient::for_session(api, &session);
    let message = client
        .delete(&id)
        .await?
        .unwrap_or_else(|| "Exam attempt deleted".to_string());

    Ok(Json(MessageResponse { message }))
}

/// Reveals results for every completed attempt of an exam.
/// Admin only; requires confirmation.
pub async fn show_results(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(exam_id): Path<String>,
    Query(confirm): Query<ConfirmParams>,
) -> Result<impl IntoResponse, AppError> {
    confirm.require("reveal results for every attempt of this exam")?;

    let client = AdminClient::for_session(api, &session);
    let message = client
        .show_results_for_exam(&exam_id)
        .await?
        .unwrap_or_else(|| "Results are now visible".to_string());

    Ok(Json(MessageResponse { message }))
}
