pub mod sqlite;
pub mod store;
pub mod repository;

pub use sqlite::*;
pub use store::*;
pub use repository::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Record store lock poisoned")]
    LockPoisoned,
}
