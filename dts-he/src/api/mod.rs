//! HTTP API handlers for dts-he

pub mod analytics;
pub mod buildinfo;
pub mod health;
pub mod human_effects;
pub mod records;
pub mod settings;
pub mod taxonomy;

pub use analytics::{division_analytics, division_geojson, hazard_analytics};
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use human_effects::{
    export_csv, get_presence, import_csv, load_human_effects, put_presence, save_human_effects,
};
pub use records::{create_record, delete_record, get_record, list_records};
pub use settings::{
    get_custom_disaggregations, get_hidden_columns, put_custom_disaggregations, put_hidden_columns,
};
pub use taxonomy::{get_divisions, get_hip, import_divisions, import_hip};

use crate::error::ApiError;
use uuid::Uuid;

/// Parse a record id path segment
///
/// A malformed id cannot name a stored record, so it is reported as missing.
pub(crate) fn parse_record_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Disaster record not found".to_string()))
}
