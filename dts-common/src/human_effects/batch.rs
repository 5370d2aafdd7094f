//! Row diff / batch update engine
//!
//! A save from the editable table arrives as one payload of deletes, sparse
//! positional updates and new rows. The positional shape only exists at the
//! wire boundary: [`BatchPlan::from_wire`] resolves column indices against the
//! table's visible definitions and validates every value before any SQL runs.
//!
//! [`apply_batch`] then applies the plan in one transaction, in the fixed order
//! deletes → updates → inserts, so a row whose tuple changed can be deleted
//! and recreated in the same save without tripping the uniqueness constraint.
//! Any error drops the transaction; nothing from the batch is kept.

use super::dimensions::{Cell, ColumnDef, DimensionRegistry, TableId};
use super::rows::{self, DimensionTuple, EffectRow};
use crate::db::records::record_belongs_to;
use crate::{HeError, HeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Save payload: `{ table, data: { deletes?, updates?, newRows? } }`
#[derive(Debug, Clone, Deserialize)]
pub struct SaveRequest {
    pub table: String,
    #[serde(default)]
    pub data: BatchData,
}

/// Wire-level batch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchData {
    #[serde(default)]
    pub deletes: Vec<String>,
    /// row id → (column index → value)
    #[serde(default)]
    pub updates: BTreeMap<String, BTreeMap<usize, Value>>,
    #[serde(default)]
    pub new_rows: Option<NewRows>,
}

/// New rows, either keyed by a client-side key or as a plain list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NewRows {
    Keyed(BTreeMap<String, Vec<Value>>),
    List(Vec<Vec<Value>>),
}

impl NewRows {
    fn into_keyed(self) -> Vec<(String, Vec<Value>)> {
        match self {
            NewRows::Keyed(map) => map.into_iter().collect(),
            NewRows::List(list) => list
                .into_iter()
                .enumerate()
                .map(|(i, row)| (i.to_string(), row))
                .collect(),
        }
    }
}

/// Validated column values keyed by column key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRow {
    pub dimensions: BTreeMap<String, Option<String>>,
    pub metrics: BTreeMap<String, Option<i64>>,
}

impl PartialRow {
    fn set(&mut self, def: &ColumnDef, value: &Value) -> HeResult<()> {
        match def.parse(value)? {
            Cell::Dimension(v) => {
                self.dimensions.insert(def.key.clone(), v);
            }
            Cell::Metric(v) => {
                self.metrics.insert(def.key.clone(), v);
            }
        }
        Ok(())
    }

    /// Overlay onto an existing row (columns not mentioned keep their value)
    fn merge_into(&self, row: &mut EffectRow) {
        for (key, value) in &self.dimensions {
            row.dimensions.set(key, value.clone());
        }
        for (key, value) in &self.metrics {
            row.metrics.insert(key.clone(), *value);
        }
    }
}

/// Typed, validated batch ready to apply
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub table: TableId,
    /// Remove every existing row of the table before the other steps
    pub replace_all: bool,
    pub deletes: Vec<Uuid>,
    pub updates: Vec<(Uuid, PartialRow)>,
    pub inserts: Vec<(String, PartialRow)>,
}

fn parse_row_id(raw: &str) -> HeResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        warn!(row_id = %raw, "Batch references a malformed row id");
        HeError::UnknownRow(raw.to_string())
    })
}

impl BatchPlan {
    pub fn empty(table: TableId) -> Self {
        Self {
            table,
            replace_all: false,
            deletes: Vec::new(),
            updates: Vec::new(),
            inserts: Vec::new(),
        }
    }

    /// Resolve positional wire data against `defs` (the visible columns)
    pub fn from_wire(table: TableId, data: BatchData, defs: &[ColumnDef]) -> HeResult<Self> {
        let mut plan = Self::empty(table);

        for raw in &data.deletes {
            plan.deletes.push(parse_row_id(raw)?);
        }

        for (raw_id, cells) in &data.updates {
            let id = parse_row_id(raw_id)?;
            let mut partial = PartialRow::default();
            for (index, value) in cells {
                let def = defs.get(*index).ok_or_else(|| {
                    HeError::invalid(format!("#{}", index), format!("table has {} columns", defs.len()))
                })?;
                partial.set(def, value)?;
            }
            plan.updates.push((id, partial));
        }

        if let Some(new_rows) = data.new_rows {
            for (key, values) in new_rows.into_keyed() {
                if values.len() != defs.len() {
                    return Err(HeError::invalid(
                        format!("row {}", key),
                        format!("expected {} values, got {}", defs.len(), values.len()),
                    ));
                }
                let mut partial = PartialRow::default();
                for (def, value) in defs.iter().zip(values.iter()) {
                    partial.set(def, value)?;
                }
                plan.inserts.push((key, partial));
            }
        }

        Ok(plan)
    }

    pub fn is_empty(&self) -> bool {
        !self.replace_all && self.deletes.is_empty() && self.updates.is_empty() && self.inserts.is_empty()
    }
}

/// What a committed batch did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub deleted: u64,
    pub updated: u64,
    pub inserted: u64,
    /// client key → id of the created row
    pub new_ids: BTreeMap<String, Uuid>,
}

/// Parse a wire save request against the tenant registry
pub fn plan_save(registry: &DimensionRegistry, request: SaveRequest) -> HeResult<BatchPlan> {
    let table: TableId = request.table.parse()?;
    let defs = registry.definitions_for(table);
    BatchPlan::from_wire(table, request.data, &defs)
}

/// Apply a plan to one record's table atomically
pub async fn apply_batch(
    pool: &SqlitePool,
    country_accounts_id: &str,
    record_id: Uuid,
    plan: &BatchPlan,
) -> HeResult<BatchOutcome> {
    let mut tx = pool.begin().await?;

    if !record_belongs_to(&mut tx, country_accounts_id, record_id).await? {
        return Err(HeError::RecordNotFound);
    }

    let result = apply_in_transaction(&mut tx, record_id, plan).await;
    match result {
        Ok(outcome) => {
            tx.commit().await?;
            info!(
                record_id = %record_id,
                table = %plan.table,
                deleted = outcome.deleted,
                updated = outcome.updated,
                inserted = outcome.inserted,
                "Applied human effects batch"
            );
            Ok(outcome)
        }
        Err(e) => {
            // Dropping the transaction rolls it back
            warn!(record_id = %record_id, table = %plan.table, error = %e, "Human effects batch rejected");
            Err(e)
        }
    }
}

async fn apply_in_transaction(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    plan: &BatchPlan,
) -> HeResult<BatchOutcome> {
    let table = plan.table;
    let mut outcome = BatchOutcome::default();

    if plan.replace_all {
        outcome.deleted += rows::delete_all_rows(conn, record_id, table).await?;
    }

    for id in &plan.deletes {
        if rows::delete_row(conn, record_id, table, *id).await? {
            outcome.deleted += 1;
        } else {
            debug!(row_id = %id, "Delete skipped, row already gone");
        }
    }

    for (id, partial) in &plan.updates {
        let mut row = rows::find_row(conn, record_id, table, *id)
            .await?
            .ok_or_else(|| {
                warn!(row_id = %id, table = %table, "Update references a row outside this table");
                HeError::UnknownRow(id.to_string())
            })?;
        partial.merge_into(&mut row);

        ensure_tuple_free(conn, &row).await?;
        rows::update_row(conn, &row).await?;
        outcome.updated += 1;
    }

    for (key, partial) in &plan.inserts {
        let mut row = EffectRow {
            id: Uuid::new_v4(),
            record_id,
            table,
            dimensions: DimensionTuple::new(),
            metrics: BTreeMap::new(),
        };
        partial.merge_into(&mut row);

        ensure_tuple_free(conn, &row).await?;
        rows::insert_row(conn, &row).await?;
        outcome.new_ids.insert(key.clone(), row.id);
        outcome.inserted += 1;
    }

    Ok(outcome)
}

/// Fail if another row already holds this row's tuple
async fn ensure_tuple_free(conn: &mut SqliteConnection, row: &EffectRow) -> HeResult<()> {
    match rows::find_id_by_tuple(conn, row.record_id, row.table, &row.dimensions).await? {
        Some(existing) if existing != row.id => Err(HeError::DuplicateDimensionTuple {
            table: row.table.to_string(),
            tuple: row.dimensions.describe(),
        }),
        _ => Ok(()),
    }
}
