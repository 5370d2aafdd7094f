//! Tenant settings endpoints
//!
//! Custom disaggregation dimensions and hidden columns. Both are validated
//! before storage and written back in canonical JSON form.

use axum::{extract::State, Json};
use dts_common::db::settings::{
    get_tenant_setting, set_tenant_setting, CUSTOM_DISAGGREGATIONS_KEY, HIDDEN_COLUMNS_KEY,
};
use dts_common::human_effects::{load_registry, CustomDimensionConfig, DimensionRegistry, HiddenColumns};
use dts_common::HeError;
use serde_json::Value;
use tracing::info;

use crate::error::ApiResult;
use crate::extract::ApiJson;
use crate::tenant::Tenant;
use crate::AppState;

fn empty_custom_config() -> CustomDimensionConfig {
    CustomDimensionConfig {
        version: 1,
        dimensions: Vec::new(),
    }
}

/// GET /api/settings/custom-disaggregations
pub async fn get_custom_disaggregations(
    State(state): State<AppState>,
    tenant: Tenant,
) -> ApiResult<Json<CustomDimensionConfig>> {
    let stored = get_tenant_setting(&state.db, tenant.id(), CUSTOM_DISAGGREGATIONS_KEY).await?;
    let config = match stored {
        Some(json) => CustomDimensionConfig::from_json(&json)?,
        None => empty_custom_config(),
    };
    Ok(Json(config))
}

/// PUT /api/settings/custom-disaggregations
pub async fn put_custom_disaggregations(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Json<CustomDimensionConfig>> {
    let config = CustomDimensionConfig::from_json(&body.to_string())?;

    // Existing hidden columns must still resolve under the new dimensions
    let hidden = load_hidden(&state, &tenant).await?;
    DimensionRegistry::new(&config, &hidden)?.validate_hidden(&hidden)?;

    let canonical = serde_json::to_string(&config).map_err(HeError::from)?;
    set_tenant_setting(&state.db, tenant.id(), CUSTOM_DISAGGREGATIONS_KEY, &canonical).await?;

    info!(tenant = %tenant.id(), dimensions = config.dimensions.len(), "Updated custom disaggregations");
    Ok(Json(config))
}

async fn load_hidden(state: &AppState, tenant: &Tenant) -> ApiResult<HiddenColumns> {
    match get_tenant_setting(&state.db, tenant.id(), HIDDEN_COLUMNS_KEY).await? {
        Some(json) => Ok(HiddenColumns::from_json(&json)?),
        None => Ok(HiddenColumns::default()),
    }
}

/// GET /api/settings/hidden-columns
pub async fn get_hidden_columns(
    State(state): State<AppState>,
    tenant: Tenant,
) -> ApiResult<Json<HiddenColumns>> {
    Ok(Json(load_hidden(&state, &tenant).await?))
}

/// PUT /api/settings/hidden-columns
///
/// Body: `{ "cols": ["disability"] }`. Only dimension keys may be hidden.
pub async fn put_hidden_columns(
    State(state): State<AppState>,
    tenant: Tenant,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Json<HiddenColumns>> {
    let hidden = HiddenColumns::from_json(&body.to_string())?;
    let registry = load_registry(&state.db, tenant.id()).await?;
    registry.validate_hidden(&hidden)?;

    let mut cols = hidden.cols;
    cols.sort();
    cols.dedup();
    let hidden = HiddenColumns { cols };

    let canonical = serde_json::to_string(&hidden).map_err(HeError::from)?;
    set_tenant_setting(&state.db, tenant.id(), HIDDEN_COLUMNS_KEY, &canonical).await?;

    info!(tenant = %tenant.id(), hidden = hidden.cols.len(), "Updated hidden columns");
    Ok(Json(hidden))
}
