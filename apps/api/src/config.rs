use std::time::Duration;

use anyhow::{Context, Result};

use crate::assessment::sync::RetryPolicy;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Appends the degraded fallback stage to the question resolver.
    pub enable_fallback_sampling: bool,
    /// JSON file of `{categoryId: [legacyId, ...]}` extending the equivalence table.
    pub category_aliases_path: Option<String>,
    pub save_max_retries: u32,
    pub save_backoff_base_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            enable_fallback_sampling: parse_flag(
                "ENABLE_FALLBACK_SAMPLING",
                std::env::var("ENABLE_FALLBACK_SAMPLING").ok().as_deref(),
            )?,
            category_aliases_path: std::env::var("CATEGORY_ALIASES_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty()),
            save_max_retries: std::env::var("SAVE_MAX_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse::<u32>()
                .context("SAVE_MAX_RETRIES must be a non-negative integer")?,
            save_backoff_base_ms: std::env::var("SAVE_BACKOFF_BASE_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse::<u64>()
                .context("SAVE_BACKOFF_BASE_MS must be a non-negative integer")?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.save_max_retries,
            base_delay: Duration::from_millis(self.save_backoff_base_ms),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset means false.
fn parse_flag(key: &str, raw: Option<&str>) -> Result<bool> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some(other) => anyhow::bail!("{key} must be a boolean, got '{other}'"),
    }
}
