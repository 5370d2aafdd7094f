//! Hierarchy analytics endpoints
//!
//! `?metric=` is one of `event_count`, `damages`, `losses` or
//! `he:<Table>:<metric>` (e.g. `he:Deaths:deaths`).

use axum::{
    extract::{Query, State},
    Json,
};
use dts_common::analytics::{self, ImpactMetric};
use dts_common::AggregationNode;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::tenant::Tenant;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MetricParams {
    pub metric: Option<String>,
}

impl MetricParams {
    fn metric(&self) -> ApiResult<ImpactMetric> {
        match self.metric.as_deref() {
            None | Some("") => Ok(ImpactMetric::EventCount),
            Some(raw) => raw.parse().map_err(ApiError::rejected),
        }
    }
}

/// GET /api/analytics/hazards
pub async fn hazard_analytics(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(params): Query<MetricParams>,
) -> ApiResult<Json<Vec<AggregationNode<f64>>>> {
    let metric = params.metric()?;
    Ok(Json(analytics::hazard_rollup(&state.db, tenant.id(), &metric).await?))
}

/// GET /api/analytics/divisions
pub async fn division_analytics(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(params): Query<MetricParams>,
) -> ApiResult<Json<Vec<AggregationNode<f64>>>> {
    let metric = params.metric()?;
    Ok(Json(analytics::division_rollup(&state.db, tenant.id(), &metric).await?))
}

/// GET /api/analytics/divisions/geojson
pub async fn division_geojson(
    State(state): State<AppState>,
    tenant: Tenant,
    Query(params): Query<MetricParams>,
) -> ApiResult<Json<Value>> {
    let metric = params.metric()?;
    Ok(Json(analytics::division_geojson(&state.db, tenant.id(), &metric).await?))
}
