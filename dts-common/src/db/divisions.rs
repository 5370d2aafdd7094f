//! Geographic division storage
//!
//! Divisions are tenant-scoped. An import is merged with the tenant's stored
//! divisions and validated as one tree before the transaction starts; levels
//! are derived from tree depth (roots are level 1).

use crate::hierarchy::divisions::division_hierarchy;
use crate::{HeError, HeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Stored division
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Division {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub level: i64,
    /// GeoJSON geometry object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
}

/// Divisions of one tenant ordered by level then id
pub async fn load_divisions(pool: &SqlitePool, country_accounts_id: &str) -> HeResult<Vec<Division>> {
    let rows = sqlx::query(
        "SELECT id, parent_id, name, level, geojson FROM divisions
         WHERE country_accounts_id = ? ORDER BY level, id",
    )
    .bind(country_accounts_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| -> HeResult<Division> {
            let geojson: Option<String> = r.get("geojson");
            Ok(Division {
                id: r.get("id"),
                parent_id: r.get("parent_id"),
                name: r.get("name"),
                level: r.get("level"),
                geometry: geojson.map(|g| serde_json::from_str(&g)).transpose()?,
            })
        })
        .collect()
}

/// Upsert divisions for a tenant (all-or-nothing); returns the count written
pub async fn import_divisions(
    pool: &SqlitePool,
    country_accounts_id: &str,
    import: Vec<Division>,
) -> HeResult<usize> {
    for division in &import {
        if division.id.trim().is_empty() || division.name.trim().is_empty() {
            return Err(HeError::InvalidHierarchy("division id and name must not be empty".into()));
        }
        if let Some(geometry) = &division.geometry {
            if !geometry.get("type").map(Value::is_string).unwrap_or(false) {
                return Err(HeError::InvalidHierarchy(format!(
                    "division '{}' geometry is not a GeoJSON object",
                    division.id
                )));
            }
        }
    }

    // Ids are global primary keys; another tenant's id cannot be taken over
    for division in &import {
        let owner: Option<String> =
            sqlx::query_scalar("SELECT country_accounts_id FROM divisions WHERE id = ?")
                .bind(&division.id)
                .fetch_optional(pool)
                .await?;
        if matches!(owner, Some(o) if o != country_accounts_id) {
            return Err(HeError::InvalidHierarchy(format!(
                "division id '{}' is already in use",
                division.id
            )));
        }
    }

    let mut seen = BTreeSet::new();
    if let Some(dup) = import.iter().find(|d| !seen.insert(d.id.as_str())) {
        return Err(HeError::InvalidHierarchy(format!("duplicate division id '{}'", dup.id)));
    }

    let mut merged: BTreeMap<String, Division> = load_divisions(pool, country_accounts_id)
        .await?
        .into_iter()
        .map(|d| (d.id.clone(), d))
        .collect();
    for division in &import {
        merged.insert(division.id.clone(), division.clone());
    }
    let merged: Vec<Division> = merged.into_values().collect();
    let hierarchy = division_hierarchy(&merged)?;

    let mut tx = pool.begin().await?;
    for division in &merged {
        let level = hierarchy.depth(&division.id).map(|d| d as i64 + 1).unwrap_or(1);
        let geojson = division.geometry.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO divisions (id, country_accounts_id, parent_id, name, level, geojson)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                parent_id = excluded.parent_id,
                name = excluded.name,
                level = excluded.level,
                geojson = excluded.geojson
            "#,
        )
        .bind(&division.id)
        .bind(country_accounts_id)
        .bind(&division.parent_id)
        .bind(&division.name)
        .bind(level)
        .bind(geojson)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(tenant = %country_accounts_id, imported = import.len(), total = merged.len(), "Imported divisions");
    Ok(import.len())
}
