//! Effect rows and their storage
//!
//! An effect row is one measured set of counts for a
//! `(record, table, dimension tuple)` key. The tuple is stored twice: as a
//! JSON object (`dimensions`) and as its canonical string (`dimension_key`)
//! which carries the UNIQUE constraint.

use super::dimensions::{ColumnDef, TableId};
use crate::{HeError, HeResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Set dimension values of a row; absent keys are "unset"
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DimensionTuple(BTreeMap<String, String>);

impl DimensionTuple {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear one dimension
    pub fn set(&mut self, key: &str, value: Option<String>) {
        match value {
            Some(v) => {
                self.0.insert(key.to_string(), v);
            }
            None => {
                self.0.remove(key);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Grand-total row: no dimension set
    pub fn is_total(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Canonical string form used by the uniqueness constraint
    ///
    /// JSON object with keys in sorted order; the total row is `{}`.
    pub fn storage_key(&self) -> String {
        self.to_json().to_string()
    }

    fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }

    /// Human-readable form for error messages
    pub fn describe(&self) -> String {
        if self.is_total() {
            return "total".to_string();
        }
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One stored human-effects row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectRow {
    pub id: Uuid,
    pub record_id: Uuid,
    pub table: TableId,
    pub dimensions: DimensionTuple,
    pub metrics: BTreeMap<String, Option<i64>>,
}

impl EffectRow {
    /// Row values aligned to `defs` (unset dimensions and missing counts are null)
    pub fn positional(&self, defs: &[ColumnDef]) -> Vec<Value> {
        defs.iter()
            .map(|def| {
                if def.is_dimension() {
                    self.dimensions
                        .get(&def.key)
                        .map(|v| Value::String(v.to_string()))
                        .unwrap_or(Value::Null)
                } else {
                    self.metrics
                        .get(&def.key)
                        .copied()
                        .flatten()
                        .map(Value::from)
                        .unwrap_or(Value::Null)
                }
            })
            .collect()
    }

    /// Count for a metric, treating "not entered" as 0
    pub fn metric_or_zero(&self, key: &str) -> i64 {
        self.metrics.get(key).copied().flatten().unwrap_or(0)
    }
}

fn row_from_sql(row: &SqliteRow) -> HeResult<EffectRow> {
    let id: String = row.get("id");
    let record_id: String = row.get("record_id");
    let table: String = row.get("table_id");
    let dimensions: String = row.get("dimensions");
    let metrics: String = row.get("metrics");

    let parse_id = |s: &str| Uuid::parse_str(s).map_err(|_| HeError::UnknownRow(s.to_string()));

    Ok(EffectRow {
        id: parse_id(&id)?,
        record_id: parse_id(&record_id)?,
        table: table.parse()?,
        dimensions: serde_json::from_str(&dimensions)?,
        metrics: serde_json::from_str(&metrics)?,
    })
}

const ROW_COLUMNS: &str = "id, record_id, table_id, dimensions, metrics";

/// All rows of one record/table in creation order
pub async fn load_rows(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    table: TableId,
) -> HeResult<Vec<EffectRow>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM human_effect_rows WHERE record_id = ? AND table_id = ?
         ORDER BY created_at ASC, rowid ASC",
        ROW_COLUMNS
    ))
    .bind(record_id.to_string())
    .bind(table.as_str())
    .fetch_all(conn)
    .await?;

    rows.iter().map(row_from_sql).collect()
}

pub(crate) async fn find_row(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    table: TableId,
    row_id: Uuid,
) -> HeResult<Option<EffectRow>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM human_effect_rows WHERE id = ? AND record_id = ? AND table_id = ?",
        ROW_COLUMNS
    ))
    .bind(row_id.to_string())
    .bind(record_id.to_string())
    .bind(table.as_str())
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(row_from_sql).transpose()
}

/// Id of the row currently holding a tuple, if any
pub(crate) async fn find_id_by_tuple(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    table: TableId,
    tuple: &DimensionTuple,
) -> HeResult<Option<Uuid>> {
    let id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM human_effect_rows WHERE record_id = ? AND table_id = ? AND dimension_key = ?",
    )
    .bind(record_id.to_string())
    .bind(table.as_str())
    .bind(tuple.storage_key())
    .fetch_optional(conn)
    .await?;

    id.map(|s| Uuid::parse_str(&s).map_err(|_| HeError::UnknownRow(s)))
        .transpose()
}

fn duplicate_or(err: sqlx::Error, row: &EffectRow) -> HeError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => HeError::DuplicateDimensionTuple {
            table: row.table.to_string(),
            tuple: row.dimensions.describe(),
        },
        _ => HeError::Database(err),
    }
}

pub(crate) async fn insert_row(conn: &mut SqliteConnection, row: &EffectRow) -> HeResult<()> {
    sqlx::query(
        r#"
        INSERT INTO human_effect_rows (
            id, record_id, table_id, dimension_key, dimensions, metrics, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(row.id.to_string())
    .bind(row.record_id.to_string())
    .bind(row.table.as_str())
    .bind(row.dimensions.storage_key())
    .bind(serde_json::to_string(&row.dimensions)?)
    .bind(serde_json::to_string(&row.metrics)?)
    .execute(conn)
    .await
    .map_err(|e| duplicate_or(e, row))?;

    Ok(())
}

pub(crate) async fn update_row(conn: &mut SqliteConnection, row: &EffectRow) -> HeResult<()> {
    sqlx::query(
        r#"
        UPDATE human_effect_rows
        SET dimension_key = ?, dimensions = ?, metrics = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ? AND record_id = ? AND table_id = ?
        "#,
    )
    .bind(row.dimensions.storage_key())
    .bind(serde_json::to_string(&row.dimensions)?)
    .bind(serde_json::to_string(&row.metrics)?)
    .bind(row.id.to_string())
    .bind(row.record_id.to_string())
    .bind(row.table.as_str())
    .execute(conn)
    .await
    .map_err(|e| duplicate_or(e, row))?;

    Ok(())
}

/// Delete one row; returns whether it existed
pub(crate) async fn delete_row(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    table: TableId,
    row_id: Uuid,
) -> HeResult<bool> {
    let result = sqlx::query("DELETE FROM human_effect_rows WHERE id = ? AND record_id = ? AND table_id = ?")
        .bind(row_id.to_string())
        .bind(record_id.to_string())
        .bind(table.as_str())
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every row of a record/table; returns the count
pub(crate) async fn delete_all_rows(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    table: TableId,
) -> HeResult<u64> {
    let result = sqlx::query("DELETE FROM human_effect_rows WHERE record_id = ? AND table_id = ?")
        .bind(record_id.to_string())
        .bind(table.as_str())
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}
