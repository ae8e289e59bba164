// src/models/attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{TIME_CRITICAL_SECS, TIME_WARNING_SECS};

/// Represents one record in the 'sman1_exam_results' collection:
/// a student's attempt at an exam. An attempt with `completed_at`
/// unset is still in progress and can be resumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub exam_id: String,

    pub student_id: String,

    /// Question id -> selected option letter.
    #[serde(default)]
    pub answers: HashMap<String, String>,

    /// Index of the question currently shown, kept so a resumed
    /// attempt lands where the student left off.
    #[serde(default)]
    pub current_question: usize,

    /// Final percentage score, set on submit.
    #[serde(default)]
    pub score: Option<u32>,

    pub started_at: DateTime<Utc>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Seconds between start and submit, capped at the exam duration.
    #[serde(default)]
    pub time_spent: Option<u64>,
}

impl ExamResult {
    pub fn new(exam_id: &str, student_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            exam_id: exam_id.to_owned(),
            student_id: student_id.to_owned(),
            answers: HashMap::new(),
            current_question: 0,
            score: None,
            started_at: now,
            completed_at: None,
            time_spent: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Seconds left on the countdown, never negative.
    pub fn remaining_seconds(&self, duration_minutes: u32, now: DateTime<Utc>) -> u64 {
        let deadline = self.started_at + Duration::seconds(i64::from(duration_minutes) * 60);
        (deadline - now).num_seconds().max(0) as u64
    }

    pub fn is_expired(&self, duration_minutes: u32, now: DateTime<Utc>) -> bool {
        self.remaining_seconds(duration_minutes, now) == 0
    }

    /// Seconds actually spent, capped at the exam duration.
    pub fn elapsed_seconds(&self, duration_minutes: u32, now: DateTime<Utc>) -> u64 {
        let elapsed = (now - self.started_at).num_seconds().max(0) as u64;
        elapsed.min(u64::from(duration_minutes) * 60)
    }

    /// Steps back one question; a no-op on the first question, like the
    /// disabled previous button.
    pub fn step_prev(&mut self) {
        if self.current_question > 0 {
            self.current_question -= 1;
        }
    }

    /// Steps forward one question; a no-op on the last question.
    pub fn step_next(&mut self, total_questions: usize) {
        if total_questions > 0 && self.current_question < total_questions - 1 {
            self.current_question += 1;
        }
    }

    /// Jumps straight to a question. Returns false if the index is out
    /// of range.
    pub fn jump_to(&mut self, index: usize, total_questions: usize) -> bool {
        if index < total_questions {
            self.current_question = index;
            true
        } else {
            false
        }
    }
}

/// Countdown warning level for the timer display: plain until five
/// minutes remain, then 'warning', then 'critical' from one minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWarning {
    None,
    Warning,
    Critical,
}

pub fn warning_level(remaining_secs: u64) -> TimeWarning {
    if remaining_secs <= TIME_CRITICAL_SECS {
        TimeWarning::Critical
    } else if remaining_secs <= TIME_WARNING_SECS {
        TimeWarning::Warning
    } else {
        TimeWarning::None
    }
}

/// Formats seconds as the MM:SS countdown clock.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// DTO for answering the question shown.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAnswerRequest {
    pub question_id: String,
    /// Selected option letter.
    pub option_id: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveAction {
    Next,
    Prev,
    Goto,
}

/// DTO for moving through the questions.
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub action: MoveAction,
    /// Target index, required for 'goto'.
    pub index: Option<usize>,
}

/// Live state of an in-progress attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStatus {
    pub current_question: usize,
    pub answered_count: usize,
    pub unanswered_count: usize,
    pub remaining_seconds: u64,
    /// MM:SS countdown text.
    pub clock: String,
    pub warning: TimeWarning,
    pub expired: bool,
}
