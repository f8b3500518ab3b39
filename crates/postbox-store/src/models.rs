//! Record types persisted in the SQLite database.
//!
//! Server-side records derive `Serialize` and `Deserialize` so the delivery
//! service can hand them straight to its wire layer. The client user record
//! carries secret key material and deliberately does neither.

use std::fmt;

use chrono::{DateTime, Datelike, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::ZeroizeOnDrop;

use crate::error::{Result, StoreError};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Caller-assigned identifier of a published key package (16 bytes).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub Uuid);

impl PackageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for PackageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a sent message, shared by every recipient row of a fan-out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Key package
// ---------------------------------------------------------------------------

/// A key package published by a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyPackageRecord {
    /// Globally unique id, assigned by the publisher.
    pub package_id: PackageId,
    /// Owning client. A client may hold many packages.
    pub client_id: String,
    /// Serialized key package material (opaque).
    pub package: Vec<u8>,
    /// When the package was stored.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Mailbox message
// ---------------------------------------------------------------------------

/// One recipient's copy of an encrypted message awaiting delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRecord {
    pub message_id: MessageId,
    pub recipient: String,
    /// Ciphertext (opaque).
    pub content: Vec<u8>,
    /// Insertion time; drives oldest-first delivery.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Client user
// ---------------------------------------------------------------------------

/// The local user's long-term signing key and credential.
///
/// The private key is wiped from memory when the record is dropped.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct ClientUser {
    #[zeroize(skip)]
    pub username: String,
    pub signature_private_key: Vec<u8>,
    /// Serialized credential bundled with its public signature key.
    #[zeroize(skip)]
    pub credential_with_key: Vec<u8>,
}

impl fmt::Debug for ClientUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientUser")
            .field("username", &self.username)
            .field("signature_private_key", &"<redacted>")
            .field("credential_with_key", &self.credential_with_key.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

/// Encode a timestamp as fixed-width RFC 3339 so text order is time order.
///
/// Sub-microsecond precision is truncated. Years outside 0000-9999 have no
/// four-digit form and are rejected.
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> Result<String> {
    if !(0..=9999).contains(&ts.year()) {
        return Err(StoreError::Validation(format!(
            "created_at year {} is outside 0000-9999",
            ts.year()
        )));
    }
    Ok(ts.trunc_subsecs(6).to_rfc3339_opts(SecondsFormat::Micros, true))
}

pub(crate) fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn uuid_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: Vec<u8> = row.get(idx)?;
    Uuid::from_slice(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Blob, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let late = early + chrono::Duration::microseconds(1);
        let (a, b) = (
            encode_timestamp(&early).unwrap(),
            encode_timestamp(&late).unwrap(),
        );
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(a, "2024-01-01T09:00:00.000000Z");
    }

    #[test]
    fn four_digit_year_bounds() {
        let first = Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(encode_timestamp(&first).unwrap(), "0000-01-01T00:00:00.000000Z");
        assert_eq!(encode_timestamp(&last).unwrap(), "9999-12-31T23:59:59.000000Z");

        for year in [-1, 10000] {
            let ts = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
            assert!(matches!(encode_timestamp(&ts), Err(StoreError::Validation(_))));
        }
    }

    #[test]
    fn client_user_debug_hides_private_key() {
        let user = ClientUser {
            username: "alice".into(),
            signature_private_key: b"very-secret".to_vec(),
            credential_with_key: vec![1, 2, 3],
        };
        let rendered = format!("{user:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("very-secret"));
    }
}
