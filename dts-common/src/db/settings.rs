//! Tenant settings key/value storage
//!
//! Per-tenant configuration blobs such as custom disaggregations and hidden
//! columns, keyed by `country_accounts_id`.

use crate::Result;
use sqlx::SqlitePool;
use tracing::debug;

/// Tenant setting: custom disaggregation dimensions (versioned JSON)
pub const CUSTOM_DISAGGREGATIONS_KEY: &str = "he_custom_disaggregations";

/// Tenant setting: dimension columns hidden from editors (JSON)
pub const HIDDEN_COLUMNS_KEY: &str = "he_hidden_columns";

/// Read a tenant setting
pub async fn get_tenant_setting(
    pool: &SqlitePool,
    country_accounts_id: &str,
    key: &str,
) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar(
        "SELECT value FROM tenant_settings WHERE country_accounts_id = ? AND key = ?",
    )
    .bind(country_accounts_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(value)
}

/// Write a tenant setting (last write wins)
pub async fn set_tenant_setting(
    pool: &SqlitePool,
    country_accounts_id: &str,
    key: &str,
    value: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tenant_settings (country_accounts_id, key, value, updated_at)
        VALUES (?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(country_accounts_id, key) DO UPDATE SET
            value = excluded.value,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(country_accounts_id)
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    debug!(tenant = %country_accounts_id, key = %key, "Stored tenant setting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;

    #[tokio::test]
    async fn test_tenant_settings_isolated() {
        let pool = init_memory_database().await.unwrap();

        set_tenant_setting(&pool, "a", HIDDEN_COLUMNS_KEY, r#"{"cols":["sex"]}"#).await.unwrap();
        assert_eq!(
            get_tenant_setting(&pool, "a", HIDDEN_COLUMNS_KEY).await.unwrap().as_deref(),
            Some(r#"{"cols":["sex"]}"#)
        );
        assert!(get_tenant_setting(&pool, "b", HIDDEN_COLUMNS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tenant_setting_last_write_wins() {
        let pool = init_memory_database().await.unwrap();

        set_tenant_setting(&pool, "a", "k", "1").await.unwrap();
        set_tenant_setting(&pool, "a", "k", "2").await.unwrap();
        assert_eq!(get_tenant_setting(&pool, "a", "k").await.unwrap().as_deref(), Some("2"));
    }
}
