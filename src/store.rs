// src/store.rs

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{Row, SqlitePool};

use crate::error::AppError;

/// Fixed storage keys. Each key holds one whole collection (or one
/// settings object) serialized as JSON.
pub mod keys {
    pub const USERS: &str = "sman1_users";
    pub const EXAMS: &str = "sman1_exams";
    pub const QUESTIONS: &str = "sman1_questions";
    pub const GRADES: &str = "sman1_grades";
    pub const SETTINGS: &str = "sman1_settings";
    pub const EXAM_RESULTS: &str = "sman1_exam_results";
}

/// Keys counted towards the storage usage percentage.
/// Exam results are excluded, matching the backup bundle.
pub const PRIMARY_KEYS: [&str; 5] = [
    keys::USERS,
    keys::EXAMS,
    keys::QUESTIONS,
    keys::GRADES,
    keys::SETTINGS,
];

/// Key-value storage access layer.
///
/// Every collection is read and written as a whole JSON blob under its
/// fixed key. There are no partial updates: callers load the full
/// collection, mutate it in memory, and save it back.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the single backing table if it does not exist yet.
    pub async fn init_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS storage (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reads the raw JSON string stored under `key`, if any.
    pub async fn read_raw(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM storage WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    /// Writes the raw JSON string under `key`, replacing any previous value.
    pub async fn write_raw(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loads the whole collection stored under `key`.
    /// A missing key is an empty collection.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, AppError> {
        match self.read_raw(key).await? {
            Some(raw) => {
                let items = serde_json::from_str(&raw).map_err(|e| {
                    tracing::error!("Corrupt collection under '{}': {}", key, e);
                    AppError::InternalServerError(e.to_string())
                })?;
                Ok(items)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Serializes and writes the whole collection back under `key`.
    pub async fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), AppError> {
        let raw = serde_json::to_string(items)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        self.write_raw(key, &raw).await
    }

    /// Loads a single stored object (the settings blob).
    /// A missing key yields the default.
    pub async fn load_object<T: DeserializeOwned + Default>(
        &self,
        key: &str,
    ) -> Result<T, AppError> {
        match self.read_raw(key).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw).map_err(|e| {
                    tracing::error!("Corrupt object under '{}': {}", key, e);
                    AppError::InternalServerError(e.to_string())
                })?;
                Ok(value)
            }
            None => Ok(T::default()),
        }
    }

    /// Serializes and writes a single object under `key`.
    pub async fn save_object<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        self.write_raw(key, &raw).await
    }

    /// Total serialized size of the primary collections, in bytes.
    pub async fn used_bytes(&self) -> Result<u64, AppError> {
        let mut total = 0u64;
        for key in PRIMARY_KEYS {
            if let Some(raw) = self.read_raw(key).await? {
                total += raw.len() as u64;
            }
        }
        Ok(total)
    }
}

/// Generates a timestamp-derived id with an entity prefix,
/// e.g. `exam_1736930400000`.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Utc::now().timestamp_millis())
}
