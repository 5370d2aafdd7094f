//! Human-effects disaggregation
//!
//! Counts of people affected by a disaster (deaths, injured, missing,
//! affected, displaced) broken down by disaggregation dimensions such as sex
//! and age. One row per dimension tuple per table per record.

pub mod batch;
pub mod csv_io;
pub mod dimensions;
pub mod presence;
pub mod rows;
pub mod view;

pub use batch::{apply_batch, plan_save, BatchOutcome, BatchPlan, SaveRequest};
pub use csv_io::{export_csv, export_table_csv, import_csv, parse_csv, ImportMode};
pub use dimensions::{
    load_registry, ColumnDef, ColumnKind, CustomDimensionConfig, DimensionRegistry, HiddenColumns, TableId,
};
pub use presence::{presence_get, presence_set, validate_total_group, PresenceFlags, TotalGroupWarning};
pub use rows::{DimensionTuple, EffectRow};
pub use view::{load_table, TableView};
