// src/views.rs

//! View models shared by the learner and admin screens.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    lifecycle::{AttemptState, ScoreBand, StatusBadge},
    models::exam_attempt::{ExamAnswer, ExamAttempt, ResultMethod},
    utils::html::clean_description,
};

/// `85.0 -> "85%"`, `72.456 -> "72.5%"`.
pub fn format_percentage(percentage: f64) -> String {
    let rounded = format!("{:.1}", percentage);
    let trimmed = rounded.strip_suffix(".0").unwrap_or(&rounded);
    format!("{}%", trimmed)
}

/// `45 -> "45m"`, `65 -> "1h 5m"`, `120 -> "2h"`.
pub fn format_minutes(minutes: u32) -> String {
    let (hours, rest) = (minutes / 60, minutes % 60);
    match (hours, rest) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%b %d, %Y %H:%M").to_string()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub state: AttemptState,
    pub badge: StatusBadge,
    pub label: &'static str,
}

impl StatusView {
    pub fn of(attempt: &ExamAttempt) -> Self {
        let state = AttemptState::of(attempt);
        let badge = state.badge();
        Self {
            state,
            badge,
            label: badge.label(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreView {
    pub percentage: f64,
    pub display: String,
    pub band: ScoreBand,
    pub correct_answers: Option<u32>,
    pub incorrect_answers: Option<u32>,
    pub total_questions: Option<u32>,
}

impl ScoreView {
    fn of(attempt: &ExamAttempt) -> Option<Self> {
        let percentage = attempt.percentage?;
        Some(Self {
            percentage,
            display: format_percentage(percentage),
            band: ScoreBand::from_percentage(percentage),
            correct_answers: attempt.correct_answers,
            incorrect_answers: attempt.incorrect_answers,
            total_questions: attempt.total_questions,
        })
    }
}

/// Row in the learner's "my attempts" list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerAttemptView {
    pub id: String,
    pub exam_id: Option<String>,
    pub exam_title: Option<String>,
    pub course_title: Option<String>,
    pub status: StatusView,
    /// Only present once the result is visible to the learner.
    pub score: Option<ScoreView>,
    pub answered: usize,
    pub started_at: Option<String>,
    pub time_spent: Option<String>,
}

impl From<&ExamAttempt> for LearnerAttemptView {
    fn from(attempt: &ExamAttempt) -> Self {
        let status = StatusView::of(attempt);
        let score = if status.state == AttemptState::CompletedVisible {
            ScoreView::of(attempt)
        } else {
            None
        };

        Self {
            id: attempt.id.clone(),
            exam_id: attempt.exam_key().map(str::to_string),
            exam_title: attempt.exam_title().map(str::to_string),
            course_title: attempt.course_title().map(str::to_string),
            status,
            score,
            answered: attempt.answered_count(),
            started_at: attempt.start_time.as_ref().map(format_timestamp),
            time_spent: attempt.time_spent.map(format_minutes),
        }
    }
}

/// Row in the admin attempt table. Admins always see scores.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAttemptView {
    pub id: String,
    pub learner_name: Option<String>,
    pub learner_email: Option<String>,
    pub exam_id: Option<String>,
    pub exam_title: Option<String>,
    pub course_title: Option<String>,
    pub status: StatusView,
    pub result_method: ResultMethod,
    pub is_result_shown: bool,
    pub is_active: bool,
    pub score: Option<ScoreView>,
    pub started_at: Option<String>,
    pub submitted_at: Option<String>,
    pub time_spent: Option<String>,
}

impl From<&ExamAttempt> for AdminAttemptView {
    fn from(attempt: &ExamAttempt) -> Self {
        let learner = attempt.learner();
        Self {
            id: attempt.id.clone(),
            learner_name: learner.and_then(|u| u.full_name.clone()),
            learner_email: learner.and_then(|u| u.email.clone()),
            exam_id: attempt.exam_key().map(str::to_string),
            exam_title: attempt.exam_title().map(str::to_string),
            course_title: attempt.course_title().map(str::to_string),
            status: StatusView::of(attempt),
            result_method: attempt.result_method,
            is_result_shown: attempt.is_result_shown,
            is_active: attempt.is_active,
            score: ScoreView::of(attempt),
            started_at: attempt.start_time.as_ref().map(format_timestamp),
            submitted_at: attempt.end_time.as_ref().map(format_timestamp),
            time_spent: attempt.time_spent.map(format_minutes),
        }
    }
}

/// One question in the result review screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReview {
    pub question_id: String,
    pub question: String,
    pub selected_options: Vec<String>,
    pub correct_answers: Vec<String>,
    pub is_correct: Option<bool>,
    /// Sanitized HTML.
    pub answer_description: Option<String>,
    /// Sanitized HTML.
    pub user_description: Option<String>,
}

impl From<&ExamAnswer> for AnswerReview {
    fn from(answer: &ExamAnswer) -> Self {
        Self {
            question_id: answer.question_id.clone(),
            question: answer.question.clone(),
            selected_options: answer.selected_options.clone(),
            correct_answers: answer.correct_answers.clone(),
            is_correct: answer.is_correct,
            answer_description: clean_description(answer.answer_description.as_deref()),
            user_description: clean_description(answer.user_description.as_deref()),
        }
    }
}

/// What the learner's result page renders.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ResultView {
    Pending {
        #[serde(rename = "attemptId")]
        attempt_id: String,
        message: &'static str,
    },
    Ready {
        attempt: LearnerAttemptView,
        answers: Vec<AnswerReview>,
    },
}

pub const PENDING_REVIEW_MESSAGE: &str =
    "Your exam has been submitted. Results will be available once they are reviewed.";
