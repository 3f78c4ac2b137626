// src/models/exam.rs

use serde::{Deserialize, Serialize};

use crate::models::{
    exam_attempt::ResultMethod,
    reference::{CategorySummary, CourseSummary, QuestionPaperSetSummary, Reference},
};

/// Exam definition as handed out when an attempt starts. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Minutes allowed for one attempt.
    #[serde(default)]
    pub time_limit: Option<u32>,

    #[serde(default)]
    pub result_method: ResultMethod,

    #[serde(default)]
    pub question_paper_set_id: Option<Reference<QuestionPaperSetSummary>>,
    #[serde(default)]
    pub course_id: Option<Reference<CourseSummary>>,
    #[serde(default)]
    pub category_id: Option<Reference<CategorySummary>>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Question snapshot for this attempt (correct answers excluded).
    #[serde(default)]
    pub questions: Vec<ExamQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamQuestion {
    #[serde(rename = "_id", alias = "questionId")]
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    /// 'single' or 'multiple'.
    #[serde(default, rename = "type")]
    pub question_type: Option<String>,
}

fn default_true() -> bool {
    true
}
