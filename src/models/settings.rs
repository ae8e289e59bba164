// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The single object stored under 'sman1_settings'.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchoolSettings {
    pub school_name: String,
    pub school_address: String,
    pub school_phone: String,
    pub school_email: String,
    /// e.g. "2025/2026".
    pub academic_year: String,
    /// 'ganjil' or 'genap'.
    pub semester: String,
    /// Enrollment cap per class.
    pub max_students: u32,
    /// Grading scale label, e.g. "0-100".
    pub grade_scale: String,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// DTO for saving the settings form. The whole object is replaced.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveSettingsRequest {
    #[validate(length(min = 1, max = 200, message = "School name must not be empty."))]
    pub school_name: String,
    #[validate(length(max = 500))]
    pub school_address: String,
    #[validate(length(max = 50))]
    pub school_phone: String,
    #[validate(length(max = 100))]
    pub school_email: String,
    #[validate(length(min = 1, max = 20, message = "Academic year must be set."))]
    pub academic_year: String,
    #[validate(length(min = 1, max = 20, message = "Semester must be set."))]
    pub semester: String,
    #[validate(range(min = 1, message = "Max students must be at least 1."))]
    pub max_students: u32,
    #[validate(length(min = 1, max = 20))]
    pub grade_scale: String,
}
