//! The local user's signing key and credential (client side).
//!
//! One row per username. Identities are never replaced in place: rotating a
//! key means deleting the old record and creating a new one.

use rusqlite::params;

use crate::database::Database;
use crate::error::{insert_error, lookup_error, require_non_empty, Result};
use crate::models::ClientUser;

impl Database {
    /// Store a new local identity. Fails with `Conflict` if `username` exists.
    pub fn create_client_user(
        &self,
        username: &str,
        signature_private_key: &[u8],
        credential_with_key: &[u8],
    ) -> Result<()> {
        require_non_empty("username", username.as_bytes())?;
        require_non_empty("signature_private_key", signature_private_key)?;
        require_non_empty("credential_with_key", credential_with_key)?;

        self.conn()
            .execute(
                "INSERT INTO client_user (username, signature_private_key, credential_with_key)
                 VALUES (?1, ?2, ?3)",
                params![username, signature_private_key, credential_with_key],
            )
            .map_err(|e| insert_error(e, || format!("user {username}")))?;

        tracing::info!(username, "client identity created");
        Ok(())
    }

    pub fn get_client_user(&self, username: &str) -> Result<ClientUser> {
        self.conn()
            .query_row(
                "SELECT username, signature_private_key, credential_with_key
                 FROM client_user WHERE username = ?1",
                params![username],
                |row| {
                    Ok(ClientUser {
                        username: row.get(0)?,
                        signature_private_key: row.get(1)?,
                        credential_with_key: row.get(2)?,
                    })
                },
            )
            .map_err(lookup_error)
    }

    /// Remove a local identity. Returns `true` if a row was deleted.
    pub fn delete_client_user(&self, username: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM client_user WHERE username = ?1", params![username])?;
        if affected > 0 {
            tracing::info!(username, "client identity deleted");
        }
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn create_then_get() {
        let db = Database::open_in_memory().unwrap();
        db.create_client_user("alice", b"key1", b"cred1").unwrap();

        let user = db.get_client_user("alice").unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.signature_private_key, b"key1");
        assert_eq!(user.credential_with_key, b"cred1");
    }

    #[test]
    fn second_create_conflicts_and_keeps_original() {
        let db = Database::open_in_memory().unwrap();
        db.create_client_user("alice", b"key1", b"cred1").unwrap();

        let err = db.create_client_user("alice", b"key2", b"cred2").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let user = db.get_client_user("alice").unwrap();
        assert_eq!(user.signature_private_key, b"key1");
        assert_eq!(user.credential_with_key, b"cred1");
    }

    #[test]
    fn unknown_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_client_user("ghost"), Err(StoreError::NotFound)));
    }

    #[test]
    fn empty_fields_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        let cases: [(&str, &[u8], &[u8]); 3] =
            [("", b"k", b"c"), ("a", b"", b"c"), ("a", b"k", b"")];
        for (name, key, cred) in cases {
            let err = db.create_client_user(name, key, cred).unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }
    }

    #[test]
    fn delete_is_idempotent_and_allows_rotation() {
        let db = Database::open_in_memory().unwrap();
        db.create_client_user("alice", b"key1", b"cred1").unwrap();

        assert!(db.delete_client_user("alice").unwrap());
        assert!(!db.delete_client_user("alice").unwrap());
        assert!(matches!(db.get_client_user("alice"), Err(StoreError::NotFound)));

        db.create_client_user("alice", b"key2", b"cred2").unwrap();
        assert_eq!(db.get_client_user("alice").unwrap().signature_private_key, b"key2");
    }
}
