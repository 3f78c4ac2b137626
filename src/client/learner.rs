// src/client/learner.rs

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};

use crate::{
    client::{
        base::{ApiClient, BaseClient, decode},
        envelope::{StartEnvelope, extract_attempt, normalize_attempt, normalize_attempt_list},
    },
    error::ClientError,
    lifecycle::{AttemptEvent, AttemptState, TransitionError},
    models::{
        exam::Exam,
        exam_attempt::{ExamAnswer, ExamAttempt, SaveProgressBody, SubmitBody},
    },
    utils::session::Session,
};

/// An attempt that has not been submitted.
///
/// Only constructible from an unfinished attempt; `submit_exam` consumes it,
/// so saving or submitting again after a submit cannot be written.
#[derive(Debug, Clone)]
pub struct ActiveAttempt {
    attempt: ExamAttempt,
}

impl TryFrom<ExamAttempt> for ActiveAttempt {
    type Error = TransitionError;

    fn try_from(attempt: ExamAttempt) -> Result<Self, Self::Error> {
        if attempt.is_completed {
            return Err(TransitionError::AlreadySubmitted {
                attempt_id: attempt.id,
            });
        }
        Ok(Self { attempt })
    }
}

impl ActiveAttempt {
    pub fn id(&self) -> &str {
        &self.attempt.id
    }

    pub fn attempt(&self) -> &ExamAttempt {
        &self.attempt
    }

    pub fn into_inner(self) -> ExamAttempt {
        self.attempt
    }
}

/// Result of starting an exam: the fresh attempt and the exam snapshot.
#[derive(Debug, Clone)]
pub struct StartedAttempt {
    pub attempt: ActiveAttempt,
    pub exam: Exam,
}

/// Final answers and timing for a submit.
#[derive(Debug, Clone)]
pub struct Submission {
    pub answers: Vec<ExamAnswer>,
    pub end_time: DateTime<Utc>,
    /// Minutes.
    pub time_spent: u32,
}

impl Submission {
    /// A submission ending now.
    pub fn new(answers: Vec<ExamAnswer>, time_spent: u32) -> Self {
        Self {
            answers,
            end_time: Utc::now(),
            time_spent,
        }
    }
}

/// What a learner may see of a submitted attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptResult {
    /// Submitted, waiting for an administrator to release results.
    Pending { attempt_id: String },
    /// Results released; scores and correctness are populated.
    Ready(ExamAttempt),
}

/// Exam-attempt operations on behalf of a learner.
#[derive(Debug, Clone)]
pub struct LearnerClient {
    api: ApiClient,
    token: Option<String>,
}

impl BaseClient for LearnerClient {
    fn api(&self) -> &ApiClient {
        &self.api
    }

    fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl LearnerClient {
    pub fn new(api: ApiClient, token: Option<String>) -> Self {
        Self { api, token }
    }

    pub fn for_session(api: ApiClient, session: &Session) -> Self {
        Self::new(api, Some(session.token().to_string()))
    }

    /// Starts a new attempt. Calling this twice starts two attempts.
    pub async fn start_attempt(&self, exam_id: &str) -> Result<StartedAttempt, ClientError> {
        let raw = self
            .send(Method::GET, &["exam-attempts", "start", exam_id], None)
            .await?;
        let StartEnvelope { exam_attempt, exam } = decode(raw)?;

        if !exam.is_active {
            return Err(ClientError::NotFound(format!(
                "Exam '{}' is not available",
                exam.title
            )));
        }

        let attempt = ActiveAttempt::try_from(exam_attempt)?;
        tracing::info!(exam_id, attempt_id = attempt.id(), "Exam attempt started");
        Ok(StartedAttempt { attempt, exam })
    }

    /// Picks up an unfinished attempt from the learner's own list.
    pub async fn resume(&self, attempt_id: &str) -> Result<ActiveAttempt, ClientError> {
        let attempt = self
            .list_my_attempts()
            .await?
            .into_iter()
            .find(|attempt| attempt.id == attempt_id)
            .ok_or_else(|| ClientError::NotFound("Exam attempt not found".to_string()))?;

        Ok(ActiveAttempt::try_from(attempt)?)
    }

    /// Upserts in-progress answers. Safe to repeat; the last write wins.
    pub async fn save_progress(
        &self,
        active: &mut ActiveAttempt,
        answers: Vec<ExamAnswer>,
    ) -> Result<(), ClientError> {
        AttemptState::of(active.attempt()).apply(AttemptEvent::SaveProgress)?;

        let answers: Vec<ExamAnswer> = answers
            .into_iter()
            .map(|mut answer| {
                answer.dedup_selection();
                answer
            })
            .collect();
        let body = serde_json::to_value(SaveProgressBody { answers: &answers })?;

        let raw = self
            .send(
                Method::POST,
                &["exam-attempts", "save-progress", active.id()],
                Some(body),
            )
            .await?;

        match extract_attempt(raw)? {
            Some(updated) if updated.is_completed => Err(TransitionError::AlreadySubmitted {
                attempt_id: updated.id,
            }
            .into()),
            Some(updated) => {
                active.attempt = updated;
                Ok(())
            }
            None => {
                tracing::debug!(attempt_id = active.id(), "Save reply had no attempt, keeping local answers");
                active.attempt.answers = answers;
                Ok(())
            }
        }
    }

    /// Submits the attempt. Unanswered questions are left out of the
    /// submitted answers; the backend grades them as not answered.
    pub async fn submit_exam(
        &self,
        active: ActiveAttempt,
        submission: Submission,
    ) -> Result<ExamAttempt, ClientError> {
        AttemptState::of(active.attempt()).apply(AttemptEvent::Submit)?;

        let answers: Vec<ExamAnswer> = submission
            .answers
            .into_iter()
            .filter(ExamAnswer::is_answered)
            .map(|mut answer| {
                answer.dedup_selection();
                answer
            })
            .collect();
        let body = serde_json::to_value(SubmitBody {
            answers: &answers,
            end_time: submission.end_time,
            time_spent: submission.time_spent,
        })?;

        let raw = self
            .send(
                Method::POST,
                &["exam-attempts", "submit", active.id()],
                Some(body),
            )
            .await?;
        let attempt = normalize_attempt(raw)?;

        if !attempt.is_completed {
            return Err(ClientError::Decode(format!(
                "attempt {} was not marked completed after submit",
                attempt.id
            )));
        }

        let expected = AttemptState::expected_after_submit(attempt.result_method);
        let actual = AttemptState::of(&attempt);
        if actual != expected {
            tracing::warn!(
                attempt_id = %attempt.id,
                ?expected,
                ?actual,
                "Backend result visibility differs from the exam's result method"
            );
        }

        tracing::info!(attempt_id = %attempt.id, answered = answers.len(), "Exam attempt submitted");
        Ok(learner_copy(attempt))
    }

    /// The learner's attempts. Grading details of attempts whose result is
    /// not released yet are stripped.
    pub async fn list_my_attempts(&self) -> Result<Vec<ExamAttempt>, ClientError> {
        let raw = self
            .send(Method::GET, &["exam-attempts", "my-attempts"], None)
            .await?;
        Ok(normalize_attempt_list(raw)
            .into_iter()
            .map(learner_copy)
            .collect())
    }

    /// Fetches the result of a submitted attempt.
    ///
    /// While results are held back the learner gets `Pending` and never any
    /// score fields.
    pub async fn get_result(&self, attempt_id: &str) -> Result<AttemptResult, ClientError> {
        let raw = match self
            .send(Method::GET, &["exam-attempts", "result", attempt_id], None)
            .await
        {
            Err(ClientError::Server { status, message }) if status == StatusCode::FORBIDDEN => {
                return self.result_withheld(attempt_id, status, message).await;
            }
            other => other?,
        };
        let attempt = normalize_attempt(raw)?;

        match AttemptState::of(&attempt) {
            AttemptState::CompletedVisible => Ok(AttemptResult::Ready(attempt)),
            AttemptState::CompletedPending => Ok(AttemptResult::Pending {
                attempt_id: attempt.id,
            }),
            AttemptState::NotStarted | AttemptState::InProgress => {
                Err(TransitionError::NotSubmitted {
                    attempt_id: attempt.id,
                }
                .into())
            }
        }
    }

    /// Interprets a 403 from `result/{id}`. It means "held back for review"
    /// only for a submitted attempt of the caller's own; anything else is a
    /// genuine refusal and passes through.
    async fn result_withheld(
        &self,
        attempt_id: &str,
        status: StatusCode,
        message: String,
    ) -> Result<AttemptResult, ClientError> {
        let own = self
            .list_my_attempts()
            .await?
            .into_iter()
            .find(|attempt| attempt.id == attempt_id);

        match own {
            Some(attempt) if attempt.is_completed => Ok(AttemptResult::Pending {
                attempt_id: attempt.id,
            }),
            Some(attempt) => Err(TransitionError::NotSubmitted {
                attempt_id: attempt.id,
            }
            .into()),
            None => Err(ClientError::Server { status, message }),
        }
    }
}

/// Scores never reach a learner before the result is released.
fn learner_copy(attempt: ExamAttempt) -> ExamAttempt {
    if AttemptState::of(&attempt) == AttemptState::CompletedVisible {
        attempt
    } else {
        attempt.without_scores()
    }
}
