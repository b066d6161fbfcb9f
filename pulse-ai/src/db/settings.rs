//! Settings table access
//!
//! Runtime configuration lives in a key-value table so it can be changed
//! without restarting the service. Values are stored as strings and parsed
//! by the typed helpers.

use anyhow::Result;
use sqlx::SqlitePool;

/// Read a raw setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Write a setting (insert or update)
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Read a u64 setting; unparseable values count as absent
pub async fn get_setting_u64(pool: &SqlitePool, key: &str) -> Result<Option<u64>> {
    match get_setting(pool, key).await? {
        Some(v) => match v.trim().parse() {
            Ok(n) => Ok(Some(n)),
            Err(_) => {
                tracing::warn!(key, value = %v, "Ignoring unparseable setting");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

/// Read a usize setting; unparseable values count as absent
pub async fn get_setting_usize(pool: &SqlitePool, key: &str) -> Result<Option<usize>> {
    Ok(get_setting_u64(pool, key).await?.map(|n| n as usize))
}
