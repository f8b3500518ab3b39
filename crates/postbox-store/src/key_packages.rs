//! Key packages published by clients for asynchronous key agreement.
//!
//! Packages are listed oldest first. The store never expires them; removal is
//! up to the caller's retention policy.

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::Database;
use crate::error::{insert_error, lookup_error, require_non_empty, Result};
use crate::models::{encode_timestamp, timestamp_column, uuid_column, KeyPackageRecord, PackageId};

const SELECT_COLUMNS: &str = "SELECT package_id, client_id, package, created_at FROM server_key_package";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Store a new key package stamped with the current time.
    ///
    /// Fails with `Conflict` if `package_id` is taken and with `Validation`
    /// if `client_id` or `package` is empty.
    pub fn publish_key_package(
        &self,
        package_id: PackageId,
        client_id: &str,
        package: &[u8],
    ) -> Result<()> {
        self.publish_key_package_at(package_id, client_id, package, Utc::now())
    }

    /// Store a new key package with an explicit `created_at`.
    pub fn publish_key_package_at(
        &self,
        package_id: PackageId,
        client_id: &str,
        package: &[u8],
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        require_non_empty("client_id", client_id.as_bytes())?;
        require_non_empty("package", package)?;
        let created_at = encode_timestamp(&created_at)?;

        // Single statement: the primary key makes check-and-insert atomic.
        self.conn()
            .execute(
                "INSERT INTO server_key_package (package_id, client_id, package, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    package_id.as_bytes().as_slice(),
                    client_id,
                    package,
                    created_at,
                ],
            )
            .map_err(|e| {
                let err = insert_error(e, || format!("key package {package_id}"));
                tracing::warn!(%package_id, error = %err, "key package rejected");
                err
            })?;

        tracing::debug!(%package_id, client_id, size = package.len(), "key package published");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single key package by id.
    pub fn get_key_package(&self, package_id: PackageId) -> Result<KeyPackageRecord> {
        self.conn()
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE package_id = ?1"),
                params![package_id.as_bytes().as_slice()],
                row_to_key_package,
            )
            .map_err(lookup_error)
    }

    /// All packages owned by `client_id`, oldest first.
    ///
    /// Packages with equal timestamps are ordered by `package_id`. The result
    /// is a snapshot taken by a single statement.
    pub fn list_key_packages_for_client(&self, client_id: &str) -> Result<Vec<KeyPackageRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "{SELECT_COLUMNS}
             WHERE client_id = ?1
             ORDER BY created_at ASC, package_id ASC"
        ))?;

        let rows = stmt.query_map(params![client_id], row_to_key_package)?;

        let mut packages = Vec::new();
        for row in rows {
            packages.push(row?);
        }
        Ok(packages)
    }

    /// The oldest package owned by `client_id`, if any.
    pub fn oldest_key_package(&self, client_id: &str) -> Result<Option<KeyPackageRecord>> {
        match self.conn().query_row(
            &format!(
                "{SELECT_COLUMNS}
                 WHERE client_id = ?1
                 ORDER BY created_at ASC, package_id ASC
                 LIMIT 1"
            ),
            params![client_id],
            row_to_key_package,
        ) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a key package. Returns `true` if a row was deleted; a missing
    /// package is not an error.
    pub fn remove_key_package(&self, package_id: PackageId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM server_key_package WHERE package_id = ?1",
            params![package_id.as_bytes().as_slice()],
        )?;
        tracing::debug!(%package_id, removed = affected > 0, "key package removal");
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_key_package(row: &rusqlite::Row<'_>) -> rusqlite::Result<KeyPackageRecord> {
    Ok(KeyPackageRecord {
        package_id: PackageId(uuid_column(row, 0)?),
        client_id: row.get(1)?,
        package: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
    })
}
