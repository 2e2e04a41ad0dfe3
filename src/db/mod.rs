pub mod sqlite;
pub mod repository;

pub use sqlite::*;
pub use repository::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Stored JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database file error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatabaseError {
    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        DatabaseError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    /// True for UNIQUE and PRIMARY KEY violations.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
                    && (err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
            }
            _ => false,
        }
    }

    /// Column names named by a UNIQUE violation, e.g. `["email"]`.
    pub fn unique_target(&self) -> Vec<String> {
        let message = match self {
            DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(_, Some(msg))) => msg.as_str(),
            _ => return Vec::new(),
        };
        let Some((_, columns)) = message.split_once("constraint failed:") else {
            return Vec::new();
        };
        columns
            .split(',')
            .map(|col| {
                let col = col.trim();
                col.rsplit_once('.')
                    .map(|(_, name)| name)
                    .unwrap_or(col)
                    .to_string()
            })
            .filter(|col| !col.is_empty())
            .collect()
    }
}
