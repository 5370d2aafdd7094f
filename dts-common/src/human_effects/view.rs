//! Editable table view
//!
//! Everything the editor needs to render one table: visible column
//! definitions, row ids with positional values, presence flags and the
//! advisory total-group warnings.

use super::dimensions::{ColumnDef, DimensionRegistry, TableId};
use super::presence::{presence_get, validate_total_group, PresenceFlags, TotalGroupWarning};
use super::rows::load_rows;
use crate::db::records::record_belongs_to;
use crate::{HeError, HeResult};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub table: TableId,
    pub defs: Vec<ColumnDef>,
    pub ids: Vec<Uuid>,
    /// Row values aligned to `defs`, same order as `ids`
    pub data: Vec<Vec<Value>>,
    pub category_presence: PresenceFlags,
    pub warnings: Vec<TotalGroupWarning>,
}

pub async fn load_table(
    pool: &SqlitePool,
    country_accounts_id: &str,
    record_id: Uuid,
    table: TableId,
    registry: &DimensionRegistry,
) -> HeResult<TableView> {
    let rows = {
        let mut conn = pool.acquire().await?;
        if !record_belongs_to(&mut conn, country_accounts_id, record_id).await? {
            return Err(HeError::RecordNotFound);
        }
        load_rows(&mut conn, record_id, table).await?
    };

    let defs = registry.definitions_for(table);
    let category_presence = presence_get(pool, country_accounts_id, record_id, table, registry).await?;
    let warnings = validate_total_group(&defs, &category_presence, &rows);

    Ok(TableView {
        table,
        ids: rows.iter().map(|r| r.id).collect(),
        data: rows.iter().map(|r| r.positional(&defs)).collect(),
        defs,
        category_presence,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::records::{create_record, NewDisasterRecord};
    use crate::human_effects::csv_io::{import_csv, ImportMode};

    #[tokio::test]
    async fn test_view_aligns_rows_and_warns() {
        let pool = init_memory_database().await.unwrap();
        let record = create_record(
            &pool,
            "t",
            &NewDisasterRecord {
                title: "Flood".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let registry = DimensionRegistry::builtin();

        import_csv(&pool, "t", record.id, TableId::Injured, &registry, "sex,injured\nf,3\n", ImportMode::Append)
            .await
            .unwrap();
        crate::human_effects::presence::presence_set(
            &pool,
            "t",
            record.id,
            TableId::Injured,
            &registry,
            &PresenceFlags::from([("sex".to_string(), true)]),
        )
        .await
        .unwrap();

        let view = load_table(&pool, "t", record.id, TableId::Injured, &registry).await.unwrap();
        assert_eq!(view.ids.len(), 1);
        assert_eq!(view.data[0].len(), view.defs.len());
        assert_eq!(view.data[0][0], Value::String("f".into()));
        assert!(matches!(view.warnings.as_slice(), [TotalGroupWarning::MissingTotal { .. }]));

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("categoryPresence").is_some());
    }

    #[tokio::test]
    async fn test_view_other_tenant() {
        let pool = init_memory_database().await.unwrap();
        let record = create_record(
            &pool,
            "t",
            &NewDisasterRecord {
                title: "Flood".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = load_table(&pool, "x", record.id, TableId::Deaths, &DimensionRegistry::builtin())
            .await
            .unwrap_err();
        assert!(matches!(err, HeError::RecordNotFound));
    }
}
