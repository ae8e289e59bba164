// src/models/grade.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents one record in the 'sman1_grades' collection.
/// Upserted by the owning teacher, keyed by (studentId, examId).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub student_id: String,

    pub exam_id: String,

    #[serde(default)]
    pub subject: Option<String>,

    /// Numeric grade, 0-100.
    pub grade: f64,

    /// Name of the teacher who entered the grade.
    pub teacher: String,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// DTO for entering or correcting a single grade.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertGradeRequest {
    #[validate(length(min = 1, message = "Student id must not be empty."))]
    pub student_id: String,
    #[validate(length(min = 1, message = "Exam id must not be empty."))]
    pub exam_id: String,
    #[validate(range(min = 0.0, max = 100.0, message = "Grade must be between 0 and 100."))]
    pub grade: f64,
}

/// DTO for giving the same grade to several students at once.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkGradeRequest {
    #[validate(length(min = 1, message = "Select at least one student."))]
    pub student_ids: Vec<String>,
    #[validate(length(min = 1, message = "Exam id must not be empty."))]
    pub exam_id: String,
    #[validate(range(min = 0.0, max = 100.0, message = "Grade must be between 0 and 100."))]
    pub grade: f64,
}

/// Maps a numeric score to the report-card letter.
pub fn letter_grade(score: f64) -> &'static str {
    if score >= 85.0 {
        "A"
    } else if score >= 70.0 {
        "B"
    } else if score >= 60.0 {
        "C"
    } else {
        "D"
    }
}
