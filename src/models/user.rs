// src/models/user.rs

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Account role. Serialized with the role names used throughout the
/// stored collections ('siswa', 'guru', 'admin').
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Siswa,
    Guru,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Siswa => "siswa",
            Role::Guru => "guru",
            Role::Admin => "admin",
        }
    }

    /// Display name shown on dashboards.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Siswa => "Siswa",
            Role::Guru => "Guru",
            Role::Admin => "Administrator",
        }
    }

    /// Prefix for ids of newly created accounts ('siswa_...', 'guru_...').
    pub fn id_prefix(&self) -> &'static str {
        self.as_str()
    }
}

/// Represents one record in the 'sman1_users' collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    /// Login name. Students log in with their NIS, teachers with a
    /// username or NIP.
    pub username: String,

    /// Argon2 password hash.
    pub password: String,

    pub role: Role,

    /// Student number, present on siswa accounts.
    #[serde(default)]
    pub nis: Option<String>,

    /// Teacher number, present on guru accounts.
    #[serde(default)]
    pub nip: Option<String>,

    /// Teaching subject (guru).
    #[serde(default)]
    pub mata_pelajaran: Option<String>,

    /// Home class (siswa), e.g. "XII IPA 1".
    #[serde(default)]
    pub kelas: Option<String>,

    /// 'active' or 'inactive'. Inactive accounts cannot log in.
    pub status: String,

    #[serde(default)]
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// User DTO for API responses. Excludes the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub username: String,
    pub role: Role,
    pub nis: Option<String>,
    pub nip: Option<String>,
    pub mata_pelajaran: Option<String>,
    pub kelas: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            role: user.role,
            nis: user.nis.clone(),
            nip: user.nip.clone(),
            mata_pelajaran: user.mata_pelajaran.clone(),
            kelas: user.kelas.clone(),
            status: user.status.clone(),
            created_at: user.created_at,
        }
    }
}

/// DTO for user login. The role picker on the login page scopes the
/// credential lookup.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    pub role: Role,
}

/// DTO for an admin creating a user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must not be empty."))]
    pub name: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    pub role: Role,
    pub mata_pelajaran: Option<String>,
    pub kelas: Option<String>,
}

/// DTO for updating a user. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    #[validate(length(min = 4, max = 128))]
    pub password: Option<String>,
    pub role: Option<Role>,
    pub status: Option<String>,
    pub mata_pelajaran: Option<String>,
    pub kelas: Option<String>,
}

/// Generates a mock student number: year cohort plus four digits
/// derived from the creation timestamp.
pub fn generate_nis(now: DateTime<Utc>) -> String {
    format!("{}{:04}", now.year(), now.timestamp_millis() % 10_000)
}

/// Generates a mock teacher number: year plus eight timestamp digits.
pub fn generate_nip(now: DateTime<Utc>) -> String {
    format!("{}{:08}", now.year(), now.timestamp_millis() % 100_000_000)
}
