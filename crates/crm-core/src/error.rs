// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for crm-core.

use thiserror::Error;

/// Result type using [`CrmError`].
pub type Result<T> = std::result::Result<T, CrmError>;

/// CRM errors.
///
/// Input problems that users can fix are not errors at this level: the
/// service reports them in mutation payloads. `CrmError` covers what is left.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CrmError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying migrations failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A unique constraint rejected the write.
    #[error("Conflict on {entity}: {details}")]
    Conflict {
        /// Table the write targeted.
        entity: &'static str,
        /// Driver message.
        details: String,
    },

    /// A request argument is malformed (bad ordering key, bad id, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The database URL has a scheme no backend understands.
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabase(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrmError {
    /// Map a driver error, turning unique violations into [`CrmError::Conflict`].
    pub(crate) fn from_write(entity: &'static str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Self::Conflict {
                entity,
                details: db_err.message().to_string(),
            },
            _ => Self::Database(err),
        }
    }

    /// Whether this error is a unique-constraint conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_display() {
        let err = CrmError::Conflict {
            entity: "customers",
            details: "UNIQUE constraint failed".to_string(),
        };
        assert!(err.is_conflict());
        assert_eq!(
            err.to_string(),
            "Conflict on customers: UNIQUE constraint failed"
        );
    }

    #[test]
    fn test_non_unique_errors_stay_database_errors() {
        let err = CrmError::from_write("products", sqlx::Error::RowNotFound);
        assert!(matches!(err, CrmError::Database(sqlx::Error::RowNotFound)));
        assert!(!err.is_conflict());
    }
}
