// src/lifecycle.rs

//! Attempt lifecycle and result visibility.
//!
//! The backend stores an attempt as two flags, `isCompleted` and
//! `isResultShown`. This module turns the flag pair into an explicit state and
//! only admits the moves listed on [`AttemptState::apply`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::exam_attempt::{ExamAttempt, ResultMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptState {
    NotStarted,
    InProgress,
    CompletedPending,
    CompletedVisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEvent {
    Start,
    SaveProgress,
    Submit,
    RevealResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {event} an attempt that is {from}")]
    Illegal {
        from: AttemptState,
        event: AttemptEvent,
    },

    #[error("attempt {attempt_id} was already submitted")]
    AlreadySubmitted { attempt_id: String },

    #[error("attempt {attempt_id} has not been submitted yet")]
    NotSubmitted { attempt_id: String },
}

impl AttemptState {
    /// Derives the state of an attempt the backend already knows about.
    ///
    /// A result flagged visible on an unfinished attempt is still
    /// `InProgress`: visibility only means something after submission.
    pub fn of(attempt: &ExamAttempt) -> Self {
        match (attempt.is_completed, attempt.is_result_shown) {
            (false, _) => AttemptState::InProgress,
            (true, false) => AttemptState::CompletedPending,
            (true, true) => AttemptState::CompletedVisible,
        }
    }

    /// Transition function.
    ///
    /// `RevealResult` on an already visible attempt is a no-op so that the
    /// bulk reveal stays idempotent.
    pub fn apply(self, event: AttemptEvent) -> Result<Self, TransitionError> {
        use AttemptEvent::*;
        use AttemptState::*;

        match (self, event) {
            (NotStarted, Start) => Ok(InProgress),
            (InProgress, SaveProgress) => Ok(InProgress),
            (InProgress, Submit) => Ok(CompletedPending),
            (CompletedPending, RevealResult) => Ok(CompletedVisible),
            (CompletedVisible, RevealResult) => Ok(CompletedVisible),
            (from, event) => Err(TransitionError::Illegal { from, event }),
        }
    }

    /// State the backend is expected to report right after a submit.
    pub fn expected_after_submit(method: ResultMethod) -> Self {
        match method {
            ResultMethod::Automatic => AttemptState::CompletedVisible,
            ResultMethod::Manual => AttemptState::CompletedPending,
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(
            self,
            AttemptState::CompletedPending | AttemptState::CompletedVisible
        )
    }

    pub fn badge(self) -> StatusBadge {
        match self {
            AttemptState::NotStarted => StatusBadge::NotStarted,
            AttemptState::InProgress => StatusBadge::InProgress,
            AttemptState::CompletedPending => StatusBadge::PendingReview,
            AttemptState::CompletedVisible => StatusBadge::Completed,
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AttemptState::NotStarted => "not started",
            AttemptState::InProgress => "in progress",
            AttemptState::CompletedPending => "completed (pending review)",
            AttemptState::CompletedVisible => "completed",
        };
        f.write_str(text)
    }
}

impl fmt::Display for AttemptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AttemptEvent::Start => "start",
            AttemptEvent::SaveProgress => "save progress on",
            AttemptEvent::Submit => "submit",
            AttemptEvent::RevealResult => "reveal the result of",
        };
        f.write_str(text)
    }
}

/// Status badge shown next to an attempt in learner and admin lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusBadge {
    NotStarted,
    InProgress,
    PendingReview,
    Completed,
}

impl StatusBadge {
    pub fn label(self) -> &'static str {
        match self {
            StatusBadge::NotStarted => "Not Started",
            StatusBadge::InProgress => "In Progress",
            StatusBadge::PendingReview => "Pending Review",
            StatusBadge::Completed => "Completed",
        }
    }
}

pub fn status_badge(attempt: &ExamAttempt) -> StatusBadge {
    AttemptState::of(attempt).badge()
}

pub const GOOD_SCORE_THRESHOLD: f64 = 80.0;
pub const WARNING_SCORE_THRESHOLD: f64 = 60.0;

/// Colour band for a percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Good,
    Warning,
    Poor,
}

impl ScoreBand {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= GOOD_SCORE_THRESHOLD {
            ScoreBand::Good
        } else if percentage >= WARNING_SCORE_THRESHOLD {
            ScoreBand::Warning
        } else {
            // NaN lands here too
            ScoreBand::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attempt(is_completed: bool, is_result_shown: bool) -> ExamAttempt {
        serde_json::from_value(json!({
            "_id": "a1",
            "userId": "u1",
            "examId": "E1",
            "isCompleted": is_completed,
            "isResultShown": is_result_shown,
        }))
        .unwrap()
    }

    #[test]
    fn legal_path_reaches_visible() {
        let state = AttemptState::NotStarted
            .apply(AttemptEvent::Start)
            .and_then(|s| s.apply(AttemptEvent::SaveProgress))
            .and_then(|s| s.apply(AttemptEvent::SaveProgress))
            .and_then(|s| s.apply(AttemptEvent::Submit))
            .unwrap();
        assert_eq!(state, AttemptState::CompletedPending);

        let state = state.apply(AttemptEvent::RevealResult).unwrap();
        assert_eq!(state, AttemptState::CompletedVisible);
        assert_eq!(
            state.apply(AttemptEvent::RevealResult),
            Ok(AttemptState::CompletedVisible)
        );
    }

    #[test]
    fn completion_never_reverts() {
        for completed in [AttemptState::CompletedPending, AttemptState::CompletedVisible] {
            assert!(completed.apply(AttemptEvent::Submit).is_err());
            assert!(completed.apply(AttemptEvent::SaveProgress).is_err());
            assert!(completed.apply(AttemptEvent::Start).is_err());
        }
        assert!(AttemptState::InProgress.apply(AttemptEvent::RevealResult).is_err());
        assert!(AttemptState::NotStarted.apply(AttemptEvent::Submit).is_err());
    }

    #[test]
    fn illegal_transition_message_names_state_and_event() {
        let err = AttemptState::CompletedPending
            .apply(AttemptEvent::Submit)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot submit an attempt that is completed (pending review)"
        );
    }

    #[test]
    fn badge_follows_flags() {
        assert_eq!(status_badge(&attempt(false, false)).label(), "In Progress");
        assert_eq!(status_badge(&attempt(true, false)).label(), "Pending Review");
        assert_eq!(status_badge(&attempt(true, true)).label(), "Completed");
        assert_eq!(status_badge(&attempt(false, true)).label(), "In Progress");
    }

    #[test]
    fn expected_state_after_submit() {
        assert_eq!(
            AttemptState::expected_after_submit(ResultMethod::Automatic),
            AttemptState::CompletedVisible
        );
        assert_eq!(
            AttemptState::expected_after_submit(ResultMethod::Manual),
            AttemptState::CompletedPending
        );
    }

    #[test]
    fn score_bands() {
        assert_eq!(ScoreBand::from_percentage(85.0), ScoreBand::Good);
        assert_eq!(ScoreBand::from_percentage(65.0), ScoreBand::Warning);
        assert_eq!(ScoreBand::from_percentage(40.0), ScoreBand::Poor);
        assert_eq!(ScoreBand::from_percentage(80.0), ScoreBand::Good);
        assert_eq!(ScoreBand::from_percentage(60.0), ScoreBand::Warning);
        assert_eq!(ScoreBand::from_percentage(79.99), ScoreBand::Warning);
        assert_eq!(ScoreBand::from_percentage(f64::NAN), ScoreBand::Poor);
    }
}
