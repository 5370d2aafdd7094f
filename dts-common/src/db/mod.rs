//! Database schema and queries

pub mod divisions;
pub mod hip;
pub mod init;
pub mod migrations;
pub mod records;
pub mod settings;

pub use init::*;
pub use migrations::*;
