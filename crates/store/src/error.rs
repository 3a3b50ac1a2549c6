use sqlx::error::ErrorKind;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row references a parent that does not exist, or a parent still has children.
    #[error("Foreign key violation on constraint {constraint}")]
    ForeignKeyViolation { constraint: String },

    /// A primary key or unique constraint was violated.
    #[error("Unique violation on constraint {constraint}")]
    UniqueViolation { constraint: String },

    /// A check constraint was violated.
    #[error("Check violation on constraint {constraint}")]
    CheckViolation { constraint: String },

    /// A stored row could not be mapped back into a record.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns the violated constraint name for constraint errors.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            StoreError::ForeignKeyViolation { constraint }
            | StoreError::UniqueViolation { constraint }
            | StoreError::CheckViolation { constraint } => Some(constraint),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            match db_err.kind() {
                ErrorKind::ForeignKeyViolation => {
                    return StoreError::ForeignKeyViolation { constraint };
                }
                ErrorKind::UniqueViolation => return StoreError::UniqueViolation { constraint },
                ErrorKind::CheckViolation => return StoreError::CheckViolation { constraint },
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_is_exposed_for_constraint_errors() {
        let err = StoreError::UniqueViolation {
            constraint: "order_payments_pkey".to_string(),
        };
        assert_eq!(err.constraint(), Some("order_payments_pkey"));
        assert_eq!(StoreError::CorruptRow("x".into()).constraint(), None);
    }

    #[test]
    fn non_database_sqlx_errors_stay_opaque() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
