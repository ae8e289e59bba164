// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Exam lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Draft,
    Published,
    Completed,
    Graded,
}

impl ExamStatus {
    /// Status label shown on exam cards.
    pub fn display_name(&self) -> &'static str {
        match self {
            ExamStatus::Draft => "Draft",
            ExamStatus::Published => "Diterbitkan",
            ExamStatus::Completed => "Selesai",
            ExamStatus::Graded => "Telah Dinilai",
        }
    }
}

/// Represents one record in the 'sman1_exams' collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,

    pub title: String,

    pub subject: String,

    /// Exam kind, e.g. 'harian', 'uts', 'uas'.
    #[serde(rename = "type")]
    pub exam_type: String,

    /// Scheduled date (YYYY-MM-DD) and start time (HH:MM).
    pub date: String,
    pub time: String,

    /// Working time in minutes.
    pub duration: u32,

    pub total_questions: u32,

    pub max_score: u32,

    #[serde(default)]
    pub instructions: Option<String>,

    /// Class names the exam is assigned to.
    pub classes: Vec<String>,

    /// Name of the owning teacher.
    pub teacher: String,

    pub status: ExamStatus,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// DTO for creating an exam.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200, message = "Title must not be empty."))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Subject must not be empty."))]
    pub subject: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50, message = "Exam type must not be empty."))]
    pub exam_type: String,
    #[validate(length(min = 1, message = "Exam date must be set."))]
    pub date: String,
    #[validate(length(min = 1, message = "Exam time must be set."))]
    pub time: String,
    #[validate(range(
        min = 5,
        max = 180,
        message = "Exam duration must be between 5 and 180 minutes."
    ))]
    pub duration: u32,
    #[validate(range(min = 1, message = "Question count must be at least 1."))]
    pub total_questions: u32,
    #[validate(range(min = 1, max = 100, message = "Max score must be between 1 and 100."))]
    pub max_score: u32,
    pub instructions: Option<String>,
    #[validate(length(min = 1, message = "Select at least one class."))]
    pub classes: Vec<String>,
}

/// DTO for updating an exam. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    #[serde(rename = "type")]
    pub exam_type: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[validate(range(
        min = 5,
        max = 180,
        message = "Exam duration must be between 5 and 180 minutes."
    ))]
    pub duration: Option<u32>,
    #[validate(range(min = 1))]
    pub total_questions: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub max_score: Option<u32>,
    pub instructions: Option<String>,
    #[validate(length(min = 1, message = "Select at least one class."))]
    pub classes: Option<Vec<String>>,
}

/// DTO for moving an exam through its lifecycle.
#[derive(Debug, Deserialize)]
pub struct UpdateExamStatusRequest {
    pub status: ExamStatus,
}

/// Aggregated result statistics for one exam.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamStatistics {
    pub total_students: usize,
    pub average_score: u32,
    pub highest_score: u32,
    pub lowest_score: u32,
    /// Share of scores at or above the passing mark, in percent.
    pub passing_rate: f64,
}
