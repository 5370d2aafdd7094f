//! Category presence flags
//!
//! Per record and table, editors mark which disaggregation categories they
//! have data for. Flags are independent of effect rows; the only link is the
//! advisory [`validate_total_group`] check shown alongside the table.

use super::dimensions::{ColumnDef, DimensionRegistry, TableId};
use super::rows::EffectRow;
use crate::db::records::record_belongs_to;
use crate::{HeError, HeResult};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// dimension key → present
pub type PresenceFlags = BTreeMap<String, bool>;

/// Store presence flags (upsert, last write wins per key)
pub async fn presence_set(
    pool: &SqlitePool,
    country_accounts_id: &str,
    record_id: Uuid,
    table: TableId,
    registry: &DimensionRegistry,
    flags: &PresenceFlags,
) -> HeResult<()> {
    let known = registry.dimension_keys(table, true);
    if let Some(unknown) = flags.keys().find(|k| !known.contains(k)) {
        return Err(HeError::UnknownDimension(unknown.clone()));
    }

    let mut tx = pool.begin().await?;
    if !record_belongs_to(&mut tx, country_accounts_id, record_id).await? {
        return Err(HeError::RecordNotFound);
    }

    for (dimension, present) in flags {
        sqlx::query(
            r#"
            INSERT INTO human_category_presence (record_id, table_id, dimension, present, updated_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(record_id, table_id, dimension) DO UPDATE SET
                present = excluded.present,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(record_id.to_string())
        .bind(table.as_str())
        .bind(dimension)
        .bind(*present)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    debug!(record_id = %record_id, table = %table, flags = flags.len(), "Stored category presence");
    Ok(())
}

/// Presence flags for a record/table
///
/// Every visible dimension defaults to `false`; stored flags (hidden
/// dimensions included) overlay the defaults.
pub async fn presence_get(
    pool: &SqlitePool,
    country_accounts_id: &str,
    record_id: Uuid,
    table: TableId,
    registry: &DimensionRegistry,
) -> HeResult<PresenceFlags> {
    let mut conn = pool.acquire().await?;
    if !record_belongs_to(&mut conn, country_accounts_id, record_id).await? {
        return Err(HeError::RecordNotFound);
    }

    let mut flags: PresenceFlags = registry
        .dimension_keys(table, false)
        .into_iter()
        .map(|k| (k, false))
        .collect();

    let rows = sqlx::query(
        "SELECT dimension, present FROM human_category_presence WHERE record_id = ? AND table_id = ?",
    )
    .bind(record_id.to_string())
    .bind(table.as_str())
    .fetch_all(&mut *conn)
    .await?;

    for row in rows {
        let dimension: String = row.get("dimension");
        let present: bool = row.get("present");
        flags.insert(dimension, present);
    }

    Ok(flags)
}

/// Advisory findings about a table's grand total
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "code")]
pub enum TotalGroupWarning {
    /// Categories are marked present but no grand-total row exists
    MissingTotal { dimensions: Vec<String> },
    /// Rows split by one dimension add up to more than the grand total
    DisaggregationExceedsTotal {
        dimension: String,
        metric: String,
        total: i64,
        disaggregated: i64,
    },
}

/// Check the total group against presence flags and stored rows
///
/// Never blocks a save; the result is shown to editors.
pub fn validate_total_group(
    defs: &[ColumnDef],
    flags: &PresenceFlags,
    rows: &[EffectRow],
) -> Vec<TotalGroupWarning> {
    let mut warnings = Vec::new();

    let flagged: Vec<String> = flags
        .iter()
        .filter(|(_, present)| **present)
        .map(|(k, _)| k.clone())
        .collect();

    let total = rows.iter().find(|r| r.dimensions.is_total());
    let Some(total) = total else {
        if !flagged.is_empty() {
            warnings.push(TotalGroupWarning::MissingTotal { dimensions: flagged });
        }
        return warnings;
    };

    let metrics: Vec<&ColumnDef> = defs.iter().filter(|d| !d.is_dimension()).collect();
    for dim in defs.iter().filter(|d| d.is_dimension()) {
        let split: Vec<&EffectRow> = rows
            .iter()
            .filter(|r| r.dimensions.len() == 1 && r.dimensions.get(&dim.key).is_some())
            .collect();
        if split.is_empty() {
            continue;
        }

        for metric in &metrics {
            let total_value = total.metric_or_zero(&metric.key);
            let disaggregated: i64 = split.iter().map(|r| r.metric_or_zero(&metric.key)).sum();
            if disaggregated > total_value {
                warnings.push(TotalGroupWarning::DisaggregationExceedsTotal {
                    dimension: dim.key.clone(),
                    metric: metric.key.clone(),
                    total: total_value,
                    disaggregated,
                });
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::records::{create_record, NewDisasterRecord};
    use crate::human_effects::rows::DimensionTuple;

    const TENANT: &str = "ca-test";

    async fn setup() -> (SqlitePool, Uuid) {
        let pool = init_memory_database().await.unwrap();
        let record = create_record(
            &pool,
            TENANT,
            &NewDisasterRecord {
                title: "Landslide".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (pool, record.id)
    }

    fn row(dims: &[(&str, &str)], deaths: Option<i64>) -> EffectRow {
        let mut dimensions = DimensionTuple::new();
        for (k, v) in dims {
            dimensions.set(k, Some(v.to_string()));
        }
        EffectRow {
            id: Uuid::new_v4(),
            record_id: Uuid::nil(),
            table: TableId::Deaths,
            dimensions,
            metrics: BTreeMap::from([("deaths".to_string(), deaths)]),
        }
    }

    fn flags(entries: &[(&str, bool)]) -> PresenceFlags {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[tokio::test]
    async fn test_defaults_to_false() {
        let (pool, record_id) = setup().await;
        let registry = DimensionRegistry::builtin();

        let got = presence_get(&pool, TENANT, record_id, TableId::Deaths, &registry).await.unwrap();
        assert_eq!(got.len(), 5);
        assert!(got.values().all(|v| !*v));
    }

    #[tokio::test]
    async fn test_set_is_idempotent() {
        let (pool, record_id) = setup().await;
        let registry = DimensionRegistry::builtin();
        let wanted = flags(&[("sex", true), ("age", false)]);

        presence_set(&pool, TENANT, record_id, TableId::Deaths, &registry, &wanted).await.unwrap();
        let first = presence_get(&pool, TENANT, record_id, TableId::Deaths, &registry).await.unwrap();
        presence_set(&pool, TENANT, record_id, TableId::Deaths, &registry, &wanted).await.unwrap();
        let second = presence_get(&pool, TENANT, record_id, TableId::Deaths, &registry).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.get("sex"), Some(&true));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let (pool, record_id) = setup().await;
        let registry = DimensionRegistry::builtin();

        presence_set(&pool, TENANT, record_id, TableId::Injured, &registry, &flags(&[("age", true)]))
            .await
            .unwrap();
        presence_set(&pool, TENANT, record_id, TableId::Injured, &registry, &flags(&[("age", false)]))
            .await
            .unwrap();

        let got = presence_get(&pool, TENANT, record_id, TableId::Injured, &registry).await.unwrap();
        assert_eq!(got.get("age"), Some(&false));
    }

    #[tokio::test]
    async fn test_unknown_dimension_rejected() {
        let (pool, record_id) = setup().await;
        let registry = DimensionRegistry::builtin();

        // `timing` only exists on Displaced
        let err = presence_set(&pool, TENANT, record_id, TableId::Deaths, &registry, &flags(&[("timing", true)]))
            .await
            .unwrap_err();
        assert!(matches!(err, HeError::UnknownDimension(_)));
    }

    #[tokio::test]
    async fn test_other_tenant_record_not_found() {
        let (pool, record_id) = setup().await;
        let registry = DimensionRegistry::builtin();

        let err = presence_get(&pool, "other", record_id, TableId::Deaths, &registry).await.unwrap_err();
        assert!(matches!(err, HeError::RecordNotFound));
    }

    #[test]
    fn test_missing_total_warning() {
        let defs = DimensionRegistry::builtin().definitions_for(TableId::Deaths);
        let warnings = validate_total_group(&defs, &flags(&[("sex", true)]), &[]);
        assert_eq!(
            warnings,
            vec![TotalGroupWarning::MissingTotal {
                dimensions: vec!["sex".to_string()]
            }]
        );
    }

    #[test]
    fn test_no_flags_no_warning() {
        let defs = DimensionRegistry::builtin().definitions_for(TableId::Deaths);
        assert!(validate_total_group(&defs, &PresenceFlags::new(), &[]).is_empty());
        assert!(validate_total_group(&defs, &flags(&[("sex", false)]), &[]).is_empty());
    }

    #[test]
    fn test_total_present_is_clean() {
        let defs = DimensionRegistry::builtin().definitions_for(TableId::Deaths);
        let rows = vec![row(&[], Some(10)), row(&[("sex", "m")], Some(6)), row(&[("sex", "f")], Some(4))];
        assert!(validate_total_group(&defs, &flags(&[("sex", true)]), &rows).is_empty());
    }

    #[test]
    fn test_disaggregation_exceeds_total() {
        let defs = DimensionRegistry::builtin().definitions_for(TableId::Deaths);
        let rows = vec![
            row(&[], Some(10)),
            row(&[("sex", "m")], Some(8)),
            row(&[("sex", "f")], Some(5)),
            // Two-dimension rows are not part of the single-dimension split
            row(&[("sex", "f"), ("age", "65+")], Some(100)),
        ];

        let warnings = validate_total_group(&defs, &PresenceFlags::new(), &rows);
        assert_eq!(
            warnings,
            vec![TotalGroupWarning::DisaggregationExceedsTotal {
                dimension: "sex".to_string(),
                metric: "deaths".to_string(),
                total: 10,
                disaggregated: 13,
            }]
        );
    }

    #[test]
    fn test_warning_wire_shape() {
        let warning = TotalGroupWarning::MissingTotal {
            dimensions: vec!["age".into()],
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["code"], "MissingTotal");
        assert_eq!(json["dimensions"][0], "age");
    }
}
