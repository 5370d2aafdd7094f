//! Disaster record persistence
//!
//! Every query is scoped by `country_accounts_id`; the caller supplies a
//! tenant id it has already authorised.

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

/// Approval workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Published,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
            RecordStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(RecordStatus::Draft),
            "pending" => Ok(RecordStatus::Pending),
            "approved" => Ok(RecordStatus::Approved),
            "published" => Ok(RecordStatus::Published),
            other => Err(Error::InvalidInput(format!("Unknown record status: {}", other))),
        }
    }
}

/// Stored disaster record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisasterRecord {
    pub id: Uuid,
    pub country_accounts_id: String,
    pub title: String,
    pub status: RecordStatus,
    pub hip_hazard_id: Option<String>,
    pub division_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub total_damages: Option<f64>,
    pub total_losses: Option<f64>,
}

/// Fields accepted when creating a record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDisasterRecord {
    pub title: String,
    #[serde(default)]
    pub status: RecordStatus,
    pub hip_hazard_id: Option<String>,
    pub division_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub total_damages: Option<f64>,
    pub total_losses: Option<f64>,
}

const RECORD_COLUMNS: &str = "id, country_accounts_id, title, status, hip_hazard_id, division_id, \
                              start_date, total_damages, total_losses";

fn record_from_row(row: &SqliteRow) -> Result<DisasterRecord> {
    let id: String = row.get("id");
    let status: String = row.get("status");
    let start_date: Option<String> = row.get("start_date");

    Ok(DisasterRecord {
        id: Uuid::parse_str(&id).map_err(|e| Error::InvalidInput(format!("Bad record id: {}", e)))?,
        country_accounts_id: row.get("country_accounts_id"),
        title: row.get("title"),
        status: RecordStatus::parse(&status)?,
        hip_hazard_id: row.get("hip_hazard_id"),
        division_id: row.get("division_id"),
        start_date: start_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        total_damages: row.get("total_damages"),
        total_losses: row.get("total_losses"),
    })
}

/// Create a disaster record for a tenant
pub async fn create_record(
    pool: &SqlitePool,
    country_accounts_id: &str,
    new: &NewDisasterRecord,
) -> Result<DisasterRecord> {
    if new.title.trim().is_empty() {
        return Err(Error::InvalidInput("Record title must not be empty".to_string()));
    }
    for (name, value) in [("totalDamages", new.total_damages), ("totalLosses", new.total_losses)] {
        if matches!(value, Some(v) if v < 0.0 || !v.is_finite()) {
            return Err(Error::InvalidInput(format!("{} must be a non-negative number", name)));
        }
    }

    if let Some(division_id) = &new.division_id {
        ensure_tenant_division(pool, country_accounts_id, division_id).await?;
    }

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO disaster_records (
            id, country_accounts_id, title, status, hip_hazard_id, division_id,
            start_date, total_damages, total_losses, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(id.to_string())
    .bind(country_accounts_id)
    .bind(new.title.trim())
    .bind(new.status.as_str())
    .bind(&new.hip_hazard_id)
    .bind(&new.division_id)
    .bind(new.start_date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(new.total_damages)
    .bind(new.total_losses)
    .execute(pool)
    .await?;

    info!(record_id = %id, tenant = %country_accounts_id, "Created disaster record");

    Ok(DisasterRecord {
        id,
        country_accounts_id: country_accounts_id.to_string(),
        title: new.title.trim().to_string(),
        status: new.status,
        hip_hazard_id: new.hip_hazard_id.clone(),
        division_id: new.division_id.clone(),
        start_date: new.start_date,
        total_damages: new.total_damages,
        total_losses: new.total_losses,
    })
}

/// Divisions are per tenant; another tenant's division reads as missing
async fn ensure_tenant_division(pool: &SqlitePool, country_accounts_id: &str, division_id: &str) -> Result<()> {
    let owned: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM divisions WHERE id = ? AND country_accounts_id = ?")
            .bind(division_id)
            .bind(country_accounts_id)
            .fetch_optional(pool)
            .await?;
    if owned.is_none() {
        warn!(division_id = %division_id, tenant = %country_accounts_id, "Record references a division outside this tenant");
        return Err(Error::InvalidInput("Referenced division does not exist".to_string()));
    }
    Ok(())
}

/// Load a record if it belongs to the tenant
pub async fn get_record(
    pool: &SqlitePool,
    country_accounts_id: &str,
    record_id: Uuid,
) -> Result<Option<DisasterRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM disaster_records WHERE id = ? AND country_accounts_id = ?",
        RECORD_COLUMNS
    ))
    .bind(record_id.to_string())
    .bind(country_accounts_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// True if the record exists and belongs to the tenant
///
/// Takes a connection so it can run inside a caller's transaction.
pub async fn record_belongs_to(
    conn: &mut SqliteConnection,
    country_accounts_id: &str,
    record_id: Uuid,
) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM disaster_records WHERE id = ? AND country_accounts_id = ?",
    )
    .bind(record_id.to_string())
    .bind(country_accounts_id)
    .fetch_optional(conn)
    .await?;

    Ok(found.is_some())
}

/// Count a tenant's records
pub async fn count_records(pool: &SqlitePool, country_accounts_id: &str) -> Result<i64> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM disaster_records WHERE country_accounts_id = ?")
            .bind(country_accounts_id)
            .fetch_one(pool)
            .await?;
    Ok(total)
}

/// List a tenant's records, newest first
pub async fn list_records(
    pool: &SqlitePool,
    country_accounts_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<DisasterRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM disaster_records WHERE country_accounts_id = ?
         ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
        RECORD_COLUMNS
    ))
    .bind(country_accounts_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Delete a record; effect rows and presence flags cascade
///
/// Returns false if the tenant has no such record.
pub async fn delete_record(
    pool: &SqlitePool,
    country_accounts_id: &str,
    record_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM disaster_records WHERE id = ? AND country_accounts_id = ?")
        .bind(record_id.to_string())
        .bind(country_accounts_id)
        .execute(pool)
        .await?;

    let deleted = result.rows_affected() > 0;
    if deleted {
        info!(record_id = %record_id, "Deleted disaster record");
    }
    Ok(deleted)
}
