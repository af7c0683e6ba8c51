mod versioned_schema;

pub use versioned_schema::{Column, ForeignKey, SqlType, Table, VersionedSchema, View};

/// Offset added to the schema version stored in `PRAGMA user_version`, so a
/// database created by another tool is never mistaken for one of ours.
pub const BASE_DB_VERSION: usize = 4200;
