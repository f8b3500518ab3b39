//! Backlog counters for capacity planning.
//!
//! Nothing in the store expires on its own, so operators watch these numbers
//! instead.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database::Database;
use crate::error::Result;
use crate::models::timestamp_column;

/// Point-in-time size of the server-side tables.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BacklogStats {
    pub key_packages: u64,
    /// Undelivered (unacknowledged) message rows.
    pub messages: u64,
    /// Distinct recipients with at least one queued message.
    pub recipients: u64,
    pub oldest_message_at: Option<DateTime<Utc>>,
}

impl Database {
    pub fn backlog_stats(&self) -> Result<BacklogStats> {
        // One statement so the counts come from the same snapshot.
        let stats = self.conn().query_row(
            "SELECT
                (SELECT COUNT(*) FROM server_key_package),
                (SELECT COUNT(*) FROM server_message),
                (SELECT COUNT(DISTINCT recipient) FROM server_message),
                (SELECT MIN(created_at) FROM server_message)",
            [],
            |row| {
                let oldest: Option<String> = row.get(3)?;
                Ok(BacklogStats {
                    key_packages: row.get::<_, i64>(0)? as u64,
                    messages: row.get::<_, i64>(1)? as u64,
                    recipients: row.get::<_, i64>(2)? as u64,
                    oldest_message_at: match oldest {
                        Some(_) => Some(timestamp_column(row, 3)?),
                        None => None,
                    },
                })
            },
        )?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::{MessageId, PackageId};

    #[test]
    fn empty_database_has_empty_backlog() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.backlog_stats().unwrap(), BacklogStats::default());
    }

    #[test]
    fn counts_follow_inserts_and_acknowledgements() {
        let db = Database::open_in_memory().unwrap();
        let oldest = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let m = MessageId::new();

        db.publish_key_package(PackageId::new(), "alice", b"kp").unwrap();
        db.enqueue_message_at(m, "alice", b"a", oldest).unwrap();
        db.enqueue_message(m, "bob", b"b").unwrap();
        db.enqueue_message(MessageId::new(), "bob", b"c").unwrap();

        let stats = db.backlog_stats().unwrap();
        assert_eq!(stats.key_packages, 1);
        assert_eq!(stats.messages, 3);
        assert_eq!(stats.recipients, 2);
        assert_eq!(stats.oldest_message_at, Some(oldest));

        db.acknowledge_message(m, "alice").unwrap();
        let stats = db.backlog_stats().unwrap();
        assert_eq!(stats.messages, 2);
        assert_eq!(stats.recipients, 1);
        assert_ne!(stats.oldest_message_at, Some(oldest));
    }
}
