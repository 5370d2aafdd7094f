//! # DTS Common Library
//!
//! Shared code for DTS (disaster tracking) services:
//! - Configuration loading
//! - SQLite schema, migrations and record/settings queries
//! - Human-effects disaggregation: dimension registry, category presence,
//!   batch update engine, CSV adapter
//! - Hierarchical roll-up over geographic divisions and the HIP hazard taxonomy
//! - Analytics queries feeding the roll-ups

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod human_effects;

pub use error::{Error, HeError, HeResult, Result};
pub use hierarchy::{aggregate, AggregationNode, Hierarchy, HierarchyNode};
pub use human_effects::{ColumnDef, ColumnKind, DimensionRegistry, TableId};
