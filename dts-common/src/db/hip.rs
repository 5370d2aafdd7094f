//! HIP hazard taxonomy storage
//!
//! Type → Cluster → Hazard, shared by every tenant. Imports upsert by id and
//! are validated as a whole tree (existing entries merged with the import)
//! before anything is written.

use crate::hierarchy::hip::hip_hierarchy;
use crate::HeResult;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HipType {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HipCluster {
    pub id: String,
    pub type_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HipHazard {
    pub id: String,
    pub cluster_id: String,
    pub name: String,
}

/// The whole taxonomy, or an import batch of it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HipTaxonomy {
    #[serde(default)]
    pub types: Vec<HipType>,
    #[serde(default)]
    pub clusters: Vec<HipCluster>,
    #[serde(default)]
    pub hazards: Vec<HipHazard>,
}

impl HipTaxonomy {
    /// Overlay `other` onto `self` by id (entries in `other` win)
    pub fn merged_with(&self, other: &HipTaxonomy) -> HipTaxonomy {
        fn merge<T: Clone>(base: &[T], update: &[T], id: impl Fn(&T) -> &str) -> Vec<T> {
            let mut by_id: BTreeMap<String, T> = base.iter().map(|t| (id(t).to_string(), t.clone())).collect();
            for t in update {
                by_id.insert(id(t).to_string(), t.clone());
            }
            by_id.into_values().collect()
        }

        HipTaxonomy {
            types: merge(&self.types, &other.types, |t| t.id.as_str()),
            clusters: merge(&self.clusters, &other.clusters, |c| c.id.as_str()),
            hazards: merge(&self.hazards, &other.hazards, |h| h.id.as_str()),
        }
    }
}

/// Counts written by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HipImportOutcome {
    pub types: usize,
    pub clusters: usize,
    pub hazards: usize,
}

/// Load the full taxonomy ordered by id
pub async fn load_hip(pool: &SqlitePool) -> HeResult<HipTaxonomy> {
    let types = sqlx::query("SELECT id, name FROM hip_types ORDER BY id")
        .fetch_all(pool)
        .await?
        .iter()
        .map(|r| HipType {
            id: r.get("id"),
            name: r.get("name"),
        })
        .collect();

    let clusters = sqlx::query("SELECT id, type_id, name FROM hip_clusters ORDER BY id")
        .fetch_all(pool)
        .await?
        .iter()
        .map(|r| HipCluster {
            id: r.get("id"),
            type_id: r.get("type_id"),
            name: r.get("name"),
        })
        .collect();

    let hazards = sqlx::query("SELECT id, cluster_id, name FROM hip_hazards ORDER BY id")
        .fetch_all(pool)
        .await?
        .iter()
        .map(|r| HipHazard {
            id: r.get("id"),
            cluster_id: r.get("cluster_id"),
            name: r.get("name"),
        })
        .collect();

    Ok(HipTaxonomy {
        types,
        clusters,
        hazards,
    })
}

/// Upsert a taxonomy batch (all-or-nothing)
pub async fn import_hip(pool: &SqlitePool, import: &HipTaxonomy) -> HeResult<HipImportOutcome> {
    let existing = load_hip(pool).await?;
    hip_hierarchy(&existing.merged_with(import))?;

    let mut tx = pool.begin().await?;

    // Parents first so foreign keys hold at every statement
    for t in &import.types {
        sqlx::query(
            "INSERT INTO hip_types (id, name) VALUES (?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&t.id)
        .bind(&t.name)
        .execute(&mut *tx)
        .await?;
    }
    for c in &import.clusters {
        sqlx::query(
            "INSERT INTO hip_clusters (id, type_id, name) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET type_id = excluded.type_id, name = excluded.name",
        )
        .bind(&c.id)
        .bind(&c.type_id)
        .bind(&c.name)
        .execute(&mut *tx)
        .await?;
    }
    for h in &import.hazards {
        sqlx::query(
            "INSERT INTO hip_hazards (id, cluster_id, name) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET cluster_id = excluded.cluster_id, name = excluded.name",
        )
        .bind(&h.id)
        .bind(&h.cluster_id)
        .bind(&h.name)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let outcome = HipImportOutcome {
        types: import.types.len(),
        clusters: import.clusters.len(),
        hazards: import.hazards.len(),
    };
    info!(
        types = outcome.types,
        clusters = outcome.clusters,
        hazards = outcome.hazards,
        "Imported HIP taxonomy"
    );
    Ok(outcome)
}
