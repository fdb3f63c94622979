mod repository;

pub use repository::*;

/// SQL migration for the reference-data key/value table
pub const MIGRATION_001_REFERENCE_DATA: &str = include_str!("migrations/001_reference_data.sql");
