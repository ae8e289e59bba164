// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Minimum score (percentage) counted as passing in exam statistics.
pub const PASSING_SCORE: f64 = 75.0;

/// Storage budget used for the usage percentage on the admin dashboard.
pub const STORAGE_LIMIT_BYTES: u64 = 10 * 1024 * 1024;

/// Remaining-time thresholds for the exam countdown, in seconds.
pub const TIME_WARNING_SECS: u64 = 5 * 60;
pub const TIME_CRITICAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username,
            admin_password,
        }
    }
}
