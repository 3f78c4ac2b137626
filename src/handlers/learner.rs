// src/handlers/learner.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use crate::{
    client::{ApiClient, AttemptResult, LearnerClient, StartedAttempt, Submission},
    error::AppError,
    models::{
        exam::Exam,
        exam_attempt::{ExamAttempt, SaveProgressRequest, SubmitExamRequest},
    },
    utils::session::Session,
    views::{AnswerReview, LearnerAttemptView, PENDING_REVIEW_MESSAGE, ResultView},
};

/// DTO returned when an exam starts.
#[derive(Debug, Serialize)]
pub struct StartedAttemptResponse {
    pub attempt: ExamAttempt,
    pub exam: Exam,
}

/// Starts a new attempt of an exam for the signed-in learner.
pub async fn start_attempt(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(exam_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let client = LearnerClient::for_session(api, &session);
    let StartedAttempt { attempt, exam } = client.start_attempt(&exam_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(StartedAttemptResponse {
            attempt: attempt.into_inner(),
            exam,
        }),
    ))
}

/// Lists the learner's own attempts, newest data from the backend.
pub async fn list_my_attempts(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let client = LearnerClient::for_session(api, &session);
    let attempts = client.list_my_attempts().await?;

    let views: Vec<LearnerAttemptView> = attempts.iter().map(LearnerAttemptView::from).collect();
    Ok(Json(views))
}

/// Saves in-progress answers.
pub async fn save_progress(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(attempt_id): Path<String>,
    Json(payload): Json<SaveProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = LearnerClient::for_session(api, &session);
    let mut active = client.resume(&attempt_id).await?;
    client.save_progress(&mut active, payload.answers).await?;

    Ok(Json(LearnerAttemptView::from(active.attempt())))
}

/// Submits an attempt. The reply shows the score only if the exam releases
/// results automatically.
pub async fn submit_exam(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(attempt_id): Path<String>,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let client = LearnerClient::for_session(api, &session);
    let active = client.resume(&attempt_id).await?;
    let submission = Submission {
        answers: payload.answers,
        end_time: payload.end_time.unwrap_or_else(Utc::now),
        time_spent: payload.time_spent,
    };
    let attempt = client.submit_exam(active, submission).await?;

    Ok(Json(LearnerAttemptView::from(&attempt)))
}

/// Result page data: either the graded attempt or a pending notice.
pub async fn get_result(
    State(api): State<ApiClient>,
    Extension(session): Extension<Session>,
    Path(attempt_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let client = LearnerClient::for_session(api, &session);

    let view = match client.get_result(&attempt_id).await? {
        AttemptResult::Pending { attempt_id } => ResultView::Pending {
            attempt_id,
            message: PENDING_REVIEW_MESSAGE,
        },
        AttemptResult::Ready(attempt) => ResultView::Ready {
            answers: attempt.answers.iter().map(AnswerReview::from).collect(),
            attempt: LearnerAttemptView::from(&attempt),
        },
    };

    Ok(Json(view))
}
