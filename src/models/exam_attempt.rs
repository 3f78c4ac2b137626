// src/models/exam_attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::reference::{
    CourseSummary, ExamSummary, QuestionPaperSetSummary, Reference, UserSummary,
};

/// How an exam's results are released to learners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultMethod {
    /// An administrator reveals results after review.
    #[default]
    Manual,
    /// The backend reveals results as part of submission.
    Automatic,
}

/// One answered question within an attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAnswer {
    pub question_id: String,

    /// Question text snapshot taken when the attempt started.
    #[serde(default)]
    pub question: String,

    /// The learner's choice(s). Order carries no meaning.
    #[serde(default)]
    pub selected_options: Vec<String>,

    /// Authoritative correct option(s), filled in by the backend.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub correct_answers: Vec<String>,

    /// Absent until the attempt is graded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_description: Option<String>,
}

impl ExamAnswer {
    pub fn new(question_id: impl Into<String>, selected: Vec<String>) -> Self {
        Self {
            question_id: question_id.into(),
            selected_options: selected,
            ..Default::default()
        }
    }

    pub fn is_answered(&self) -> bool {
        !self.selected_options.is_empty()
    }

    /// Drops duplicate selections, keeping first occurrences in place.
    pub fn dedup_selection(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.selected_options.retain(|opt| seen.insert(opt.clone()));
    }
}

/// One learner's attempt at one exam, as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamAttempt {
    #[serde(rename = "_id")]
    pub id: String,

    /// `null` once the learner or exam has been deleted.
    #[serde(default)]
    pub user_id: Option<Reference<UserSummary>>,
    #[serde(default)]
    pub exam_id: Option<Reference<ExamSummary>>,
    #[serde(default)]
    pub course_id: Option<Reference<CourseSummary>>,
    #[serde(default)]
    pub question_paper_set_id: Option<Reference<QuestionPaperSetSummary>>,

    /// Flips to true exactly once, on submission.
    #[serde(default)]
    pub is_completed: bool,

    #[serde(default)]
    pub answers: Vec<ExamAnswer>,

    // Scoring fields stay empty until grading has happened.
    #[serde(default)]
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub correct_answers: Option<u32>,
    #[serde(default)]
    pub incorrect_answers: Option<u32>,
    #[serde(default)]
    pub percentage: Option<f64>,

    /// Gates learner visibility of scores and correctness.
    #[serde(default)]
    pub is_result_shown: bool,

    #[serde(default)]
    pub result_method: ResultMethod,

    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Minutes spent, set on submission.
    #[serde(default, deserialize_with = "whole_minutes")]
    pub time_spent: Option<u32>,

    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Admin listings resolve `userId`, `examId` and `courseId` to embedded
/// summaries; the shape is otherwise identical.
pub type ExamAttemptWithDetails = ExamAttempt;

fn default_true() -> bool {
    true
}

/// Some clients report fractional minutes; round to the nearest whole one.
fn whole_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes = Option::<f64>::deserialize(deserializer)?;
    Ok(minutes
        .filter(|m| m.is_finite())
        .map(|m| m.round().clamp(0.0, f64::from(u32::MAX)) as u32))
}

impl ExamAttempt {
    pub fn exam_key(&self) -> Option<&str> {
        self.exam_id.as_ref().map(Reference::id)
    }

    pub fn exam_title(&self) -> Option<&str> {
        self.exam_id
            .as_ref()
            .and_then(Reference::embedded)
            .and_then(|e| e.title.as_deref())
    }

    pub fn course_title(&self) -> Option<&str> {
        self.course_id
            .as_ref()
            .and_then(Reference::embedded)
            .and_then(|c| c.title.as_deref())
    }

    pub fn learner(&self) -> Option<&UserSummary> {
        self.user_id.as_ref().and_then(Reference::embedded)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_answered()).count()
    }

    /// Returns a copy with every grading detail removed.
    pub fn without_scores(&self) -> Self {
        let mut redacted = self.clone();
        redacted.total_questions = None;
        redacted.correct_answers = None;
        redacted.incorrect_answers = None;
        redacted.percentage = None;
        for answer in &mut redacted.answers {
            answer.correct_answers.clear();
            answer.is_correct = None;
            answer.answer_description = None;
        }
        redacted
    }
}

/// Wire body for `save-progress`.
#[derive(Debug, Serialize)]
pub struct SaveProgressBody<'a> {
    pub answers: &'a [ExamAnswer],
}

/// Wire body for `submit`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody<'a> {
    pub answers: &'a [ExamAnswer],
    pub end_time: DateTime<Utc>,
    pub time_spent: u32,
}

/// DTO for saving in-progress answers through the gateway.
#[derive(Debug, Deserialize)]
pub struct SaveProgressRequest {
    #[serde(default)]
    pub answers: Vec<ExamAnswer>,
}

/// DTO for submitting an attempt through the gateway.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamRequest {
    #[serde(default)]
    pub answers: Vec<ExamAnswer>,

    /// Defaults to the moment the gateway receives the request.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,

    /// Minutes; capped at one day.
    #[validate(range(max = 1440))]
    pub time_spent: u32,
}

/// Partial update an administrator may apply to any attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_score_totals))]
pub struct UpdateAttempt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<ExamAnswer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incorrect_answers: Option<u32>,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_result_shown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_method: Option<ResultMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(max = 1440))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<u32>,
}

/// Correct plus incorrect answers may not exceed the question count.
fn validate_score_totals(update: &UpdateAttempt) -> Result<(), validator::ValidationError> {
    if let (Some(total), Some(correct), Some(incorrect)) = (
        update.total_questions,
        update.correct_answers,
        update.incorrect_answers,
    ) {
        if correct.saturating_add(incorrect) > total {
            return Err(validator::ValidationError::new("score_totals_exceed_questions"));
        }
    }
    Ok(())
}
