//! Human-effects table endpoints
//!
//! All handlers load the tenant's dimension registry first so custom and
//! hidden columns apply to every read and write.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use dts_common::human_effects::{
    self, apply_batch, load_registry, load_table, plan_save, presence_get, presence_set, BatchOutcome,
    ImportMode, PresenceFlags, SaveRequest, TableId, TableView,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parse_record_id;
use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::tenant::Tenant;
use crate::AppState;

/// Successful save response: `{ "ok": true, "deleted": .., "newIds": {..} }`
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

#[derive(Debug, Deserialize)]
pub struct CsvImportParams {
    #[serde(default)]
    pub mode: ImportMode,
}

/// GET /api/records/:id/human-effects/:table
pub async fn load_human_effects(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((id, table)): Path<(String, String)>,
) -> ApiResult<Json<TableView>> {
    let record_id = parse_record_id(&id)?;
    let table: TableId = table.parse()?;
    let registry = load_registry(&state.db, tenant.id()).await?;

    let view = load_table(&state.db, tenant.id(), record_id, table, &registry).await?;
    Ok(Json(view))
}

/// POST /api/records/:id/human-effects
///
/// Body: `{ "table": "Deaths", "data": { "deletes", "updates", "newRows" } }`.
/// The whole batch commits or nothing does.
pub async fn save_human_effects(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<SaveRequest>,
) -> ApiResult<Json<SaveResponse>> {
    let record_id = parse_record_id(&id)?;
    let registry = load_registry(&state.db, tenant.id()).await?;

    let plan = plan_save(&registry, request)?;
    if plan.is_empty() {
        debug!(record_id = %record_id, "Empty human effects batch");
    }
    let outcome = apply_batch(&state.db, tenant.id(), record_id, &plan).await?;

    Ok(Json(SaveResponse { ok: true, outcome }))
}

/// GET /api/records/:id/human-effects/:table/presence
pub async fn get_presence(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((id, table)): Path<(String, String)>,
) -> ApiResult<Json<PresenceFlags>> {
    let record_id = parse_record_id(&id)?;
    let table: TableId = table.parse()?;
    let registry = load_registry(&state.db, tenant.id()).await?;

    let flags = presence_get(&state.db, tenant.id(), record_id, table, &registry).await?;
    Ok(Json(flags))
}

/// PUT /api/records/:id/human-effects/:table/presence
///
/// Body: `{ "sex": true, "age": false }`. Returns the merged flags.
pub async fn put_presence(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((id, table)): Path<(String, String)>,
    ApiJson(flags): ApiJson<PresenceFlags>,
) -> ApiResult<Json<PresenceFlags>> {
    let record_id = parse_record_id(&id)?;
    let table: TableId = table.parse()?;
    let registry = load_registry(&state.db, tenant.id()).await?;

    presence_set(&state.db, tenant.id(), record_id, table, &registry, &flags).await?;
    let merged = presence_get(&state.db, tenant.id(), record_id, table, &registry).await?;
    Ok(Json(merged))
}

/// GET /api/records/:id/human-effects/:table/csv
pub async fn export_csv(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((id, table)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let record_id = parse_record_id(&id)?;
    let table: TableId = table.parse()?;
    let registry = load_registry(&state.db, tenant.id()).await?;

    let body = human_effects::export_table_csv(&state.db, tenant.id(), record_id, table, &registry).await?;
    let disposition = format!("attachment; filename=\"{}-{}.csv\"", record_id, table);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// POST /api/records/:id/human-effects/:table/csv?mode=append|replace
pub async fn import_csv(
    State(state): State<AppState>,
    tenant: Tenant,
    Path((id, table)): Path<(String, String)>,
    Query(params): Query<CsvImportParams>,
    body: String,
) -> ApiResult<Json<SaveResponse>> {
    let record_id = parse_record_id(&id)?;
    let table: TableId = table.parse()?;
    let registry = load_registry(&state.db, tenant.id()).await?;

    let outcome = human_effects::import_csv(
        &state.db,
        tenant.id(),
        record_id,
        table,
        &registry,
        &body,
        params.mode,
    )
    .await?;

    Ok(Json(SaveResponse { ok: true, outcome }))
}
