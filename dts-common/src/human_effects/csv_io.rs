//! CSV export/import for human-effects tables
//!
//! Export writes `id` followed by every column key of the table, hidden
//! dimensions included, so rows that differ only in a hidden dimension stay
//! distinct and survive a replace import. Import maps header names onto the
//! same columns and feeds the rows through the batch engine as new rows, so
//! every validation and uniqueness rule applies unchanged.

use super::batch::{apply_batch, BatchOutcome, BatchPlan, BatchData, NewRows};
use super::dimensions::{ColumnDef, DimensionRegistry, TableId};
use super::rows::{load_rows, EffectRow};
use crate::db::records::record_belongs_to;
use crate::{HeError, HeResult};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// How imported rows combine with the existing ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Add rows; a tuple that already exists fails the import
    #[default]
    Append,
    /// Delete every existing row of the table first (same transaction)
    Replace,
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render rows as CSV
pub fn export_csv(defs: &[ColumnDef], rows: &[EffectRow]) -> HeResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["id".to_string()];
    header.extend(defs.iter().map(|d| d.key.clone()));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.id.to_string()];
        record.extend(row.positional(defs).iter().map(cell_text));
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| HeError::Config(format!("Failed to flush CSV output: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| HeError::Config(format!("CSV output is not UTF-8: {}", e)))
}

/// Export a record's table as CSV (hidden dimensions included)
pub async fn export_table_csv(
    pool: &SqlitePool,
    country_accounts_id: &str,
    record_id: Uuid,
    table: TableId,
    registry: &DimensionRegistry,
) -> HeResult<String> {
    let rows = {
        let mut conn = pool.acquire().await?;
        if !record_belongs_to(&mut conn, country_accounts_id, record_id).await? {
            return Err(HeError::RecordNotFound);
        }
        load_rows(&mut conn, record_id, table).await?
    };

    export_csv(&registry.all_definitions_for(table), &rows)
}

/// Parse CSV into positional rows aligned to `defs`
///
/// Columns missing from the file are null. An `id` column is ignored.
pub fn parse_csv(input: &str, defs: &[ColumnDef]) -> HeResult<Vec<Vec<Value>>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input.as_bytes());

    // file column → def index
    let mut mapping: Vec<Option<usize>> = Vec::new();
    for name in reader.headers()?.iter() {
        if name.eq_ignore_ascii_case("id") {
            mapping.push(None);
            continue;
        }
        let index = defs
            .iter()
            .position(|d| d.key == name)
            .ok_or_else(|| HeError::UnknownDimension(name.to_string()))?;
        mapping.push(Some(index));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut values = vec![Value::Null; defs.len()];
        for (field, target) in record.iter().zip(mapping.iter()) {
            if let Some(index) = target {
                if !field.is_empty() {
                    values[*index] = Value::String(field.to_string());
                }
            }
        }
        rows.push(values);
    }

    Ok(rows)
}

/// Import CSV rows into a record's table through the batch engine
pub async fn import_csv(
    pool: &SqlitePool,
    country_accounts_id: &str,
    record_id: Uuid,
    table: TableId,
    registry: &DimensionRegistry,
    input: &str,
    mode: ImportMode,
) -> HeResult<BatchOutcome> {
    let defs = registry.all_definitions_for(table);
    let rows = parse_csv(input, &defs)?;
    let row_count = rows.len();

    // Keys are 1-based data line numbers so errors point at the file
    let keyed: BTreeMap<String, Vec<Value>> = rows
        .into_iter()
        .enumerate()
        .map(|(i, values)| (format!("line {:04}", i + 2), values))
        .collect();

    let data = BatchData {
        new_rows: Some(NewRows::Keyed(keyed)),
        ..Default::default()
    };
    let mut plan = BatchPlan::from_wire(table, data, &defs)?;
    plan.replace_all = mode == ImportMode::Replace;

    let outcome = apply_batch(pool, country_accounts_id, record_id, &plan).await?;
    info!(
        record_id = %record_id,
        table = %table,
        rows = row_count,
        mode = ?mode,
        "Imported human effects CSV"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::records::{create_record, NewDisasterRecord};
    use crate::human_effects::rows::load_rows;
    use crate::human_effects::{CustomDimensionConfig, HiddenColumns};

    const TENANT: &str = "ca-test";

    async fn setup() -> (SqlitePool, Uuid) {
        let pool = init_memory_database().await.unwrap();
        let record = create_record(
            &pool,
            TENANT,
            &NewDisasterRecord {
                title: "Drought".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (pool, record.id)
    }

    async fn stored(pool: &SqlitePool, record_id: Uuid) -> Vec<EffectRow> {
        let mut conn = pool.acquire().await.unwrap();
        load_rows(&mut conn, record_id, TableId::Deaths).await.unwrap()
    }

    #[test]
    fn test_parse_maps_headers() {
        let defs = DimensionRegistry::builtin().definitions_for(TableId::Deaths);
        let rows = parse_csv("deaths,sex\n5,f\n7,\n", &defs).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Value::String("f".into()));
        assert_eq!(rows[0][5], Value::String("5".into()));
        assert_eq!(rows[1][0], Value::Null);
    }

    #[test]
    fn test_unknown_header_rejected() {
        let defs = DimensionRegistry::builtin().definitions_for(TableId::Deaths);
        let err = parse_csv("sex,religion,deaths\nf,x,1\n", &defs).unwrap_err();
        assert!(matches!(err, HeError::UnknownDimension(name) if name == "religion"));
    }

    #[tokio::test]
    async fn test_export_then_import_reproduces_rows() {
        let (pool, record_id) = setup().await;
        let registry = DimensionRegistry::builtin();

        import_csv(
            &pool,
            TENANT,
            record_id,
            TableId::Deaths,
            &registry,
            "sex,age,deaths\n,,12\nf,,5\nm,65+,2\n",
            ImportMode::Append,
        )
        .await
        .unwrap();

        let defs = registry.all_definitions_for(TableId::Deaths);
        let before = stored(&pool, record_id).await;
        let exported = export_csv(&defs, &before).unwrap();
        assert!(exported.starts_with("id,sex,age,disability,global_poverty_line,national_poverty_line,deaths\n"));

        import_csv(&pool, TENANT, record_id, TableId::Deaths, &registry, &exported, ImportMode::Replace)
            .await
            .unwrap();
        let after = stored(&pool, record_id).await;
        assert_eq!(shape(&before), shape(&after));
    }

    fn shape(rows: &[EffectRow]) -> Vec<(String, BTreeMap<String, Option<i64>>)> {
        let mut v: Vec<_> = rows.iter().map(|r| (r.dimensions.storage_key(), r.metrics.clone())).collect();
        v.sort();
        v
    }

    #[tokio::test]
    async fn test_round_trip_keeps_hidden_dimension_values() {
        let (pool, record_id) = setup().await;

        import_csv(
            &pool,
            TENANT,
            record_id,
            TableId::Deaths,
            &DimensionRegistry::builtin(),
            "sex,deaths\n,10\nf,4\nm,6\n",
            ImportMode::Append,
        )
        .await
        .unwrap();
        let before = stored(&pool, record_id).await;

        // Hiding sex must not collapse the three rows into one tuple
        let hidden = HiddenColumns {
            cols: vec!["sex".to_string()],
        };
        let registry = DimensionRegistry::new(&CustomDimensionConfig::default(), &hidden).unwrap();
        let exported = export_table_csv(&pool, TENANT, record_id, TableId::Deaths, &registry)
            .await
            .unwrap();
        assert!(exported.starts_with("id,sex,"));

        import_csv(&pool, TENANT, record_id, TableId::Deaths, &registry, &exported, ImportMode::Replace)
            .await
            .unwrap();
        assert_eq!(shape(&before), shape(&stored(&pool, record_id).await));
    }

    #[tokio::test]
    async fn test_round_trip_with_custom_dimension() {
        let (pool, record_id) = setup().await;
        let custom = CustomDimensionConfig::from_json(
            r#"{"version": 1, "dimensions": [
                {"uiName": "Ethnicity", "dbName": "ethnicity",
                 "enum": [{"key": "a", "label": "Group A"}, {"key": "b", "label": "Group B"}]}
            ]}"#,
        )
        .unwrap();
        let registry = DimensionRegistry::new(&custom, &HiddenColumns::default()).unwrap();

        import_csv(
            &pool,
            TENANT,
            record_id,
            TableId::Deaths,
            &registry,
            "ethnicity,sex,deaths\n,,9\na,,5\nb,,4\nb,f,1\n",
            ImportMode::Append,
        )
        .await
        .unwrap();
        let before = stored(&pool, record_id).await;
        assert_eq!(before.len(), 4);

        let exported = export_table_csv(&pool, TENANT, record_id, TableId::Deaths, &registry)
            .await
            .unwrap();
        assert!(exported.lines().next().unwrap().contains(",ethnicity,"));

        import_csv(&pool, TENANT, record_id, TableId::Deaths, &registry, &exported, ImportMode::Replace)
            .await
            .unwrap();
        assert_eq!(shape(&before), shape(&stored(&pool, record_id).await));
    }

    #[tokio::test]
    async fn test_append_duplicate_fails_atomically() {
        let (pool, record_id) = setup().await;
        let registry = DimensionRegistry::builtin();

        import_csv(&pool, TENANT, record_id, TableId::Deaths, &registry, "sex,deaths\nf,1\n", ImportMode::Append)
            .await
            .unwrap();

        let err = import_csv(
            &pool,
            TENANT,
            record_id,
            TableId::Deaths,
            &registry,
            "sex,deaths\nm,3\nf,2\n",
            ImportMode::Append,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HeError::DuplicateDimensionTuple { .. }));
        assert_eq!(stored(&pool, record_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_cell_reports_column() {
        let (pool, record_id) = setup().await;
        let err = import_csv(
            &pool,
            TENANT,
            record_id,
            TableId::Deaths,
            &DimensionRegistry::builtin(),
            "sex,deaths\nf,-4\n",
            ImportMode::Replace,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HeError::InvalidValue { column, .. } if column == "deaths"));
    }

    #[tokio::test]
    async fn test_export_table_is_tenant_scoped() {
        let (pool, record_id) = setup().await;
        let registry = DimensionRegistry::builtin();
        import_csv(&pool, TENANT, record_id, TableId::Deaths, &registry, "deaths\n9\n", ImportMode::Append)
            .await
            .unwrap();

        let csv = export_table_csv(&pool, TENANT, record_id, TableId::Deaths, &registry)
            .await
            .unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.trim_end().ends_with(",9"));

        let err = export_table_csv(&pool, "ca-other", record_id, TableId::Deaths, &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, HeError::RecordNotFound));
    }
}
