//! HIP taxonomy and administrative division endpoints
//!
//! Imports are all-or-nothing; a cyclic or dangling tree in the submitted
//! data is rejected with 400.

use axum::{extract::State, Json};
use dts_common::db::divisions::{self, Division};
use dts_common::db::hip::{self, HipImportOutcome, HipTaxonomy};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::tenant::Tenant;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DivisionImportResponse {
    pub ok: bool,
    pub imported: usize,
}

#[derive(Debug, Serialize)]
pub struct HipImportResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub outcome: HipImportOutcome,
}

/// GET /api/hip
///
/// The taxonomy is shared, but callers still need a tenant context.
pub async fn get_hip(State(state): State<AppState>, _tenant: Tenant) -> ApiResult<Json<HipTaxonomy>> {
    Ok(Json(hip::load_hip(&state.db).await?))
}

/// POST /api/hip/import
pub async fn import_hip(
    State(state): State<AppState>,
    _tenant: Tenant,
    ApiJson(import): ApiJson<HipTaxonomy>,
) -> ApiResult<Json<HipImportResponse>> {
    let outcome = hip::import_hip(&state.db, &import)
        .await
        .map_err(ApiError::rejected)?;
    Ok(Json(HipImportResponse { ok: true, outcome }))
}

/// GET /api/divisions
pub async fn get_divisions(State(state): State<AppState>, tenant: Tenant) -> ApiResult<Json<Vec<Division>>> {
    Ok(Json(divisions::load_divisions(&state.db, tenant.id()).await?))
}

/// POST /api/divisions/import
///
/// Body: JSON array of divisions (`id`, `parentId`, `name`, optional
/// GeoJSON `geometry`).
pub async fn import_divisions(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiJson(import): ApiJson<Vec<Division>>,
) -> ApiResult<Json<DivisionImportResponse>> {
    let imported = divisions::import_divisions(&state.db, tenant.id(), import)
        .await
        .map_err(ApiError::rejected)?;
    Ok(Json(DivisionImportResponse { ok: true, imported }))
}
