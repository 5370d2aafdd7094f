//! Analytics roll-ups
//!
//! Own values per hazard or division come from published disaster records of
//! one tenant; the hierarchy turns them into rolled-up totals. Human-effect
//! metrics only read grand-total rows (`dimension_key = '{}'`), so
//! disaggregated rows are never double counted.

use crate::db::divisions::load_divisions;
use crate::db::hip::load_hip;
use crate::db::records::RecordStatus;
use crate::hierarchy::divisions::{division_hierarchy, rollup_feature_collection};
use crate::hierarchy::hip::{hazard_node_id, hip_hierarchy};
use crate::hierarchy::AggregationNode;
use crate::human_effects::TableId;
use crate::{HeError, HeResult};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Value rolled up over a hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImpactMetric {
    EventCount,
    Damages,
    Losses,
    /// Grand-total count of one human-effects metric, e.g. `he:Deaths:deaths`
    HumanEffect { table: TableId, metric: String },
}

impl FromStr for ImpactMetric {
    type Err = HeError;

    fn from_str(s: &str) -> HeResult<Self> {
        match s {
            "event_count" => Ok(ImpactMetric::EventCount),
            "damages" => Ok(ImpactMetric::Damages),
            "losses" => Ok(ImpactMetric::Losses),
            other => {
                let mut parts = other.splitn(3, ':');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some("he"), Some(table), Some(metric)) => {
                        let table: TableId = table.parse()?;
                        if !table.has_metric(metric) {
                            return Err(HeError::UnknownDimension(metric.to_string()));
                        }
                        Ok(ImpactMetric::HumanEffect {
                            table,
                            metric: metric.to_string(),
                        })
                    }
                    _ => Err(HeError::invalid("metric", format!("unknown metric '{}'", other))),
                }
            }
        }
    }
}

impl fmt::Display for ImpactMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpactMetric::EventCount => f.write_str("event_count"),
            ImpactMetric::Damages => f.write_str("damages"),
            ImpactMetric::Losses => f.write_str("losses"),
            ImpactMetric::HumanEffect { table, metric } => write!(f, "he:{}:{}", table, metric),
        }
    }
}

/// Record column the own values are grouped by
#[derive(Debug, Clone, Copy)]
enum GroupBy {
    Hazard,
    Division,
}

impl GroupBy {
    fn column(self) -> &'static str {
        match self {
            GroupBy::Hazard => "hip_hazard_id",
            GroupBy::Division => "division_id",
        }
    }
}

async fn own_values(
    pool: &SqlitePool,
    country_accounts_id: &str,
    metric: &ImpactMetric,
    group: GroupBy,
) -> HeResult<HashMap<String, f64>> {
    let column = group.column();
    let published = RecordStatus::Published.as_str();

    let query = match metric {
        ImpactMetric::EventCount | ImpactMetric::Damages | ImpactMetric::Losses => {
            let value = match metric {
                ImpactMetric::EventCount => "CAST(COUNT(*) AS REAL)",
                ImpactMetric::Damages => "CAST(COALESCE(SUM(total_damages), 0) AS REAL)",
                _ => "CAST(COALESCE(SUM(total_losses), 0) AS REAL)",
            };
            sqlx::query(&format!(
                "SELECT {col} AS node, {value} AS value FROM disaster_records
                 WHERE country_accounts_id = ? AND status = ? AND {col} IS NOT NULL
                 GROUP BY {col}",
                col = column,
                value = value
            ))
            .bind(country_accounts_id)
            .bind(published)
            .fetch_all(pool)
            .await?
        }
        ImpactMetric::HumanEffect { table, metric } => {
            sqlx::query(&format!(
                "SELECT r.{col} AS node,
                        CAST(COALESCE(SUM(json_extract(h.metrics, '$.' || ?)), 0) AS REAL) AS value
                 FROM disaster_records r
                 JOIN human_effect_rows h ON h.record_id = r.id
                 WHERE r.country_accounts_id = ? AND r.status = ? AND r.{col} IS NOT NULL
                   AND h.table_id = ? AND h.dimension_key = '{{}}'
                 GROUP BY r.{col}",
                col = column
            ))
            .bind(metric)
            .bind(country_accounts_id)
            .bind(published)
            .bind(table.as_str())
            .fetch_all(pool)
            .await?
        }
    };

    let values: HashMap<String, f64> = query
        .iter()
        .map(|r| (r.get::<String, _>("node"), r.get::<f64, _>("value")))
        .collect();
    debug!(tenant = %country_accounts_id, metric = %metric, nodes = values.len(), "Computed own values");
    Ok(values)
}

/// Roll-up over the HIP taxonomy
pub async fn hazard_rollup(
    pool: &SqlitePool,
    country_accounts_id: &str,
    metric: &ImpactMetric,
) -> HeResult<Vec<AggregationNode<f64>>> {
    let hierarchy = hip_hierarchy(&load_hip(pool).await?)?;
    let own: HashMap<String, f64> = own_values(pool, country_accounts_id, metric, GroupBy::Hazard)
        .await?
        .into_iter()
        .map(|(hazard, value)| (hazard_node_id(&hazard), value))
        .collect();

    Ok(hierarchy.rollup(|n| own.get(&n.id).copied()))
}

/// Roll-up over the tenant's divisions
pub async fn division_rollup(
    pool: &SqlitePool,
    country_accounts_id: &str,
    metric: &ImpactMetric,
) -> HeResult<Vec<AggregationNode<f64>>> {
    let divisions = load_divisions(pool, country_accounts_id).await?;
    let hierarchy = division_hierarchy(&divisions)?;
    let own = own_values(pool, country_accounts_id, metric, GroupBy::Division).await?;

    Ok(hierarchy.rollup(|n| own.get(&n.id).copied()))
}

/// Division roll-up as a GeoJSON `FeatureCollection`
pub async fn division_geojson(
    pool: &SqlitePool,
    country_accounts_id: &str,
    metric: &ImpactMetric,
) -> HeResult<Value> {
    let divisions = load_divisions(pool, country_accounts_id).await?;
    let hierarchy = division_hierarchy(&divisions)?;
    let own = own_values(pool, country_accounts_id, metric, GroupBy::Division).await?;
    let rollup = hierarchy.rollup(|n| own.get(&n.id).copied());

    Ok(rollup_feature_collection(&divisions, &rollup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::divisions::{import_divisions, Division};
    use crate::db::hip::import_hip;
    use crate::db::init::init_memory_database;
    use crate::db::records::{create_record, NewDisasterRecord};
    use crate::human_effects::{import_csv, DimensionRegistry, ImportMode};

    const TENANT: &str = "ca-test";

    fn record(hazard: &str, division: &str, status: RecordStatus, damages: f64) -> NewDisasterRecord {
        NewDisasterRecord {
            title: format!("{} in {}", hazard, division),
            status,
            hip_hazard_id: Some(hazard.to_string()),
            division_id: Some(division.to_string()),
            total_damages: Some(damages),
            ..Default::default()
        }
    }

    async fn seeded() -> SqlitePool {
        let pool = init_memory_database().await.unwrap();
        import_hip(&pool, &crate::db::hip::tests::sample()).await.unwrap();
        import_divisions(
            &pool,
            TENANT,
            vec![
                Division {
                    id: "R".into(),
                    parent_id: None,
                    name: "Region".into(),
                    level: 0,
                    geometry: None,
                },
                Division {
                    id: "D1".into(),
                    parent_id: Some("R".into()),
                    name: "District 1".into(),
                    level: 0,
                    geometry: None,
                },
                Division {
                    id: "D2".into(),
                    parent_id: Some("R".into()),
                    name: "District 2".into(),
                    level: 0,
                    geometry: None,
                },
            ],
        )
        .await
        .unwrap();
        pool
    }

    fn value_of(nodes: &[AggregationNode<f64>], id: &str) -> (f64, f64) {
        let node = nodes.iter().find(|n| n.id == id).unwrap();
        (node.own_value, node.rolled_up_value)
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!("damages".parse::<ImpactMetric>().unwrap(), ImpactMetric::Damages);
        assert_eq!(
            "he:Affected:indirect".parse::<ImpactMetric>().unwrap(),
            ImpactMetric::HumanEffect {
                table: TableId::Affected,
                metric: "indirect".into()
            }
        );
        assert!(matches!("he:Deaths:injured".parse::<ImpactMetric>(), Err(HeError::UnknownDimension(_))));
        assert!(matches!("he:Dead:deaths".parse::<ImpactMetric>(), Err(HeError::UnknownTable(_))));
        assert!("volume".parse::<ImpactMetric>().is_err());
    }

    #[tokio::test]
    async fn test_hazard_rollup_counts_published_only() {
        let pool = seeded().await;
        create_record(&pool, TENANT, &record("MH0600", "D1", RecordStatus::Published, 100.0)).await.unwrap();
        create_record(&pool, TENANT, &record("MH0601", "D2", RecordStatus::Published, 50.0)).await.unwrap();
        create_record(&pool, TENANT, &record("MH0601", "D2", RecordStatus::Draft, 999.0)).await.unwrap();
        let mut foreign = record("MH0601", "D2", RecordStatus::Published, 999.0);
        foreign.division_id = None;
        create_record(&pool, "other", &foreign).await.unwrap();

        let nodes = hazard_rollup(&pool, TENANT, &ImpactMetric::EventCount).await.unwrap();
        assert_eq!(value_of(&nodes, "hazard:MH0601"), (1.0, 1.0));
        assert_eq!(value_of(&nodes, "type:MH"), (0.0, 2.0));

        let nodes = hazard_rollup(&pool, TENANT, &ImpactMetric::Damages).await.unwrap();
        assert_eq!(value_of(&nodes, "cluster:MH-FL").1, 150.0);
    }

    #[tokio::test]
    async fn test_human_effect_metric_reads_total_rows_only() {
        let pool = seeded().await;
        let registry = DimensionRegistry::builtin();
        let a = create_record(&pool, TENANT, &record("MH0600", "D1", RecordStatus::Published, 0.0)).await.unwrap();
        let b = create_record(&pool, TENANT, &record("MH0600", "D2", RecordStatus::Published, 0.0)).await.unwrap();

        import_csv(&pool, TENANT, a.id, TableId::Deaths, &registry, "sex,deaths\n,10\nf,4\nm,6\n", ImportMode::Append)
            .await
            .unwrap();
        // Total row with the count left empty counts as 0
        import_csv(&pool, TENANT, b.id, TableId::Deaths, &registry, "sex,deaths\n,\nf,3\n", ImportMode::Append)
            .await
            .unwrap();

        let metric: ImpactMetric = "he:Deaths:deaths".parse().unwrap();
        let nodes = division_rollup(&pool, TENANT, &metric).await.unwrap();
        assert_eq!(value_of(&nodes, "D1"), (10.0, 10.0));
        assert_eq!(value_of(&nodes, "D2"), (0.0, 0.0));
        assert_eq!(value_of(&nodes, "R"), (0.0, 10.0));
    }

    #[tokio::test]
    async fn test_division_geojson() {
        let pool = seeded().await;
        create_record(&pool, TENANT, &record("MH0600", "D1", RecordStatus::Published, 5.0)).await.unwrap();

        let fc = division_geojson(&pool, TENANT, &ImpactMetric::Damages).await.unwrap();
        let features = fc["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        let root = features.iter().find(|f| f["id"] == "R").unwrap();
        assert_eq!(root["properties"]["rolledUpValue"], 5.0);
    }
}
