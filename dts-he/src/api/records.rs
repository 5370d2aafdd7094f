//! Disaster record endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use dts_common::db::records::{self, DisasterRecord, NewDisasterRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parse_record_id;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::pagination::{calculate_pagination, Pagination, PAGE_SIZE};
use crate::tenant::Tenant;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct RecordList {
    pub records: Vec<DisasterRecord>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

/// GET /api/records?page=N
pub async fn list_records(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<RecordList>> {
    let total = records::count_records(&state.db, tenant.id()).await?;
    let pagination = calculate_pagination(total, params.page);
    let records = records::list_records(&state.db, tenant.id(), PAGE_SIZE, pagination.offset).await?;

    debug!(tenant = %tenant.id(), page = pagination.page, count = records.len(), "Listed records");
    Ok(Json(RecordList { records, pagination }))
}

/// POST /api/records
pub async fn create_record(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiJson(new): ApiJson<NewDisasterRecord>,
) -> ApiResult<(StatusCode, Json<DisasterRecord>)> {
    let record = records::create_record(&state.db, tenant.id(), &new).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/records/:id
pub async fn get_record(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> ApiResult<Json<DisasterRecord>> {
    let record_id = parse_record_id(&id)?;
    records::get_record(&state.db, tenant.id(), record_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Disaster record not found".to_string()))
}

/// DELETE /api/records/:id
pub async fn delete_record(
    State(state): State<AppState>,
    tenant: Tenant,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let record_id = parse_record_id(&id)?;
    if records::delete_record(&state.db, tenant.id(), record_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Disaster record not found".to_string()))
    }
}
