//! dts-he library - Human Effects module
//!
//! HTTP surface over the human-effects engine and the analytics roll-ups:
//! disaster records, editable human-effects tables, tenant settings, HIP and
//! division imports, hierarchy analytics.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod extract;
pub mod pagination;
pub mod tenant;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5810;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let records = Router::new()
        .route("/api/records", get(api::list_records).post(api::create_record))
        .route("/api/records/:id", get(api::get_record).delete(api::delete_record))
        .route("/api/records/:id/human-effects", post(api::save_human_effects))
        .route("/api/records/:id/human-effects/:table", get(api::load_human_effects))
        .route(
            "/api/records/:id/human-effects/:table/presence",
            get(api::get_presence).put(api::put_presence),
        )
        .route(
            "/api/records/:id/human-effects/:table/csv",
            get(api::export_csv).post(api::import_csv),
        );

    let settings = Router::new()
        .route(
            "/api/settings/custom-disaggregations",
            get(api::get_custom_disaggregations).put(api::put_custom_disaggregations),
        )
        .route(
            "/api/settings/hidden-columns",
            get(api::get_hidden_columns).put(api::put_hidden_columns),
        );

    let taxonomy = Router::new()
        .route("/api/hip", get(api::get_hip))
        .route("/api/hip/import", post(api::import_hip))
        .route("/api/divisions", get(api::get_divisions))
        .route("/api/divisions/import", post(api::import_divisions));

    let analytics = Router::new()
        .route("/api/analytics/hazards", get(api::hazard_analytics))
        .route("/api/analytics/divisions", get(api::division_analytics))
        .route("/api/analytics/divisions/geojson", get(api::division_geojson));

    Router::new()
        .merge(records)
        .merge(settings)
        .merge(taxonomy)
        .merge(analytics)
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
