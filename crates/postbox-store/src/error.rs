use rusqlite::ffi;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An insert collided with an existing primary key.
    #[error("Conflict: {0} already exists")]
    Conflict(String),

    /// A primary-key lookup found no row.
    #[error("Record not found")]
    NotFound,

    /// A required field was empty or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The SQLite engine failed (locked, I/O, corrupt, aborted transaction).
    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// Whether the caller may reasonably retry the operation.
    ///
    /// Conflicts, misses and validation failures are caller-side outcomes and
    /// will repeat identically.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_)
                | StoreError::Io(_)
                | StoreError::NoDataDir
                | StoreError::Migration(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Translate the error of a failed `INSERT`.
///
/// Primary-key and unique violations become [`StoreError::Conflict`] with the
/// description produced by `what`; everything else is an engine failure.
pub(crate) fn insert_error(err: rusqlite::Error, what: impl FnOnce() -> String) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE) =>
        {
            StoreError::Conflict(what())
        }
        _ => StoreError::Unavailable(err),
    }
}

/// Map a missing row to [`StoreError::NotFound`].
pub(crate) fn lookup_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Unavailable(other),
    }
}

/// Reject an empty required field.
pub(crate) fn require_non_empty(field: &str, value: &[u8]) -> Result<()> {
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_engine_failures_are_transient() {
        assert!(StoreError::Unavailable(rusqlite::Error::InvalidQuery).is_transient());
        assert!(!StoreError::Conflict("x".into()).is_transient());
        assert!(!StoreError::NotFound.is_transient());
        assert!(!StoreError::Validation("x".into()).is_transient());
    }

    #[test]
    fn non_constraint_insert_failure_is_unavailable() {
        let err = insert_error(rusqlite::Error::InvalidQuery, || "row".into());
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn empty_field_is_rejected() {
        assert!(require_non_empty("client_id", b"alice").is_ok());
        let err = require_non_empty("client_id", b"").unwrap_err();
        assert!(matches!(err, StoreError::Validation(msg) if msg.contains("client_id")));
    }
}
