//! Runtime configuration resolution for pulse-ai
//!
//! Multi-tier resolution with Database -> ENV -> TOML -> default priority.
//! The database is authoritative; values found only in a lower tier are
//! written back so the settings table converges on the effective
//! configuration.

use sqlx::SqlitePool;
use tracing::{info, warn};

use pulse_common::config::TomlConfig;
use pulse_common::Result;

use crate::db::settings;

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_WORKER_COUNT: usize = 1;
pub const DEFAULT_THROTTLE_MS: u64 = 100;
pub const DEFAULT_DB_MAX_LOCK_WAIT_MS: u64 = 5_000;

const ENV_OLLAMA_URL: &str = "PULSE_OLLAMA_URL";
const ENV_OLLAMA_MODEL: &str = "PULSE_OLLAMA_MODEL";

/// Effective enrichment configuration after tier resolution
#[derive(Debug, Clone)]
pub struct AiSettings {
    /// Inference endpoint base URL
    pub ollama_base_url: String,
    /// Model name passed in every generate request
    pub ollama_model: String,
    /// Per-call deadline for generate requests
    pub request_timeout_ms: u64,
    /// Enrichment worker pool width; 1 means strictly sequential
    pub worker_count: usize,
    /// Inter-row delay inside an enrichment run
    pub throttle_ms: u64,
    /// Retry budget for SQLite lock contention on enrichment writes
    pub db_max_lock_wait_ms: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            worker_count: DEFAULT_WORKER_COUNT,
            throttle_ms: DEFAULT_THROTTLE_MS,
            db_max_lock_wait_ms: DEFAULT_DB_MAX_LOCK_WAIT_MS,
        }
    }
}

impl AiSettings {
    /// Resolve the effective settings.
    ///
    /// String values (endpoint URL, model) go through the full
    /// Database -> ENV -> TOML -> default chain; the numeric tuning knobs
    /// live in the database only, falling back to compiled defaults.
    pub async fn resolve(pool: &SqlitePool, toml_config: &TomlConfig) -> Result<Self> {
        let ollama_base_url = resolve_string(
            pool,
            "ollama_base_url",
            ENV_OLLAMA_URL,
            toml_config.ollama_base_url.as_deref(),
            DEFAULT_OLLAMA_BASE_URL,
        )
        .await?;

        let ollama_model = resolve_string(
            pool,
            "ollama_model",
            ENV_OLLAMA_MODEL,
            toml_config.ollama_model.as_deref(),
            DEFAULT_OLLAMA_MODEL,
        )
        .await?;

        let request_timeout_ms = settings::get_setting_u64(pool, "ai_request_timeout_ms")
            .await
            .map_err(to_common)?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);

        let worker_count = settings::get_setting_usize(pool, "ai_worker_count")
            .await
            .map_err(to_common)?
            .unwrap_or(DEFAULT_WORKER_COUNT)
            .max(1);

        let throttle_ms = settings::get_setting_u64(pool, "ai_throttle_ms")
            .await
            .map_err(to_common)?
            .unwrap_or(DEFAULT_THROTTLE_MS);

        let db_max_lock_wait_ms = settings::get_setting_u64(pool, "ai_database_max_lock_wait_ms")
            .await
            .map_err(to_common)?
            .unwrap_or(DEFAULT_DB_MAX_LOCK_WAIT_MS);

        let resolved = Self {
            ollama_base_url,
            ollama_model,
            request_timeout_ms,
            worker_count,
            throttle_ms,
            db_max_lock_wait_ms,
        };

        info!(
            ollama_base_url = %resolved.ollama_base_url,
            ollama_model = %resolved.ollama_model,
            request_timeout_ms = resolved.request_timeout_ms,
            worker_count = resolved.worker_count,
            throttle_ms = resolved.throttle_ms,
            db_max_lock_wait_ms = resolved.db_max_lock_wait_ms,
            "Enrichment settings resolved"
        );

        Ok(resolved)
    }
}

/// Resolve one string setting across the tiers; the winning value is
/// written back to the database when it came from a lower tier.
async fn resolve_string(
    pool: &SqlitePool,
    key: &str,
    env_var: &str,
    toml_value: Option<&str>,
    default: &str,
) -> Result<String> {
    let db_value = settings::get_setting(pool, key).await.map_err(to_common)?;
    if let Some(value) = db_value {
        if !value.trim().is_empty() {
            return Ok(value);
        }
    }

    let env_value = std::env::var(env_var).ok().filter(|v| !v.trim().is_empty());
    let toml_owned = toml_value
        .map(|v| v.to_string())
        .filter(|v| !v.trim().is_empty());

    if env_value.is_some() && toml_owned.is_some() {
        warn!(
            key,
            "Setting found in both environment and TOML, using environment"
        );
    }

    let (value, source) = match (env_value, toml_owned) {
        (Some(v), _) => (v, "environment"),
        (None, Some(v)) => (v, "TOML"),
        (None, None) => (default.to_string(), "default"),
    };

    // Write back so the database becomes authoritative from now on
    settings::set_setting(pool, key, &value)
        .await
        .map_err(to_common)?;
    info!(key, source, value = %value, "Setting resolved and stored");

    Ok(value)
}

fn to_common(e: anyhow::Error) -> pulse_common::Error {
    pulse_common::Error::Internal(e.to_string())
}
