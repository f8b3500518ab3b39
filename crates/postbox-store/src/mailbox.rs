//! Per-recipient mailbox of encrypted messages awaiting delivery.
//!
//! Delivery is a two-phase handoff: [`Database::fetch_messages`] peeks without
//! consuming, and the recipient confirms each message with
//! [`Database::acknowledge_message`] once it has been processed. Rows stay
//! until acknowledged, giving at-least-once delivery.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::database::Database;
use crate::error::{insert_error, lookup_error, require_non_empty, Result};
use crate::models::{encode_timestamp, timestamp_column, uuid_column, MessageId, MessageRecord};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Queue `content` for one recipient, stamped with the current time.
    ///
    /// Not an upsert: an existing `(message_id, recipient)` row yields
    /// `Conflict` and the stored ciphertext is left untouched.
    pub fn enqueue_message(
        &self,
        message_id: MessageId,
        recipient: &str,
        content: &[u8],
    ) -> Result<()> {
        self.enqueue_message_at(message_id, recipient, content, Utc::now())
    }

    /// Queue `content` for one recipient with an explicit `created_at`.
    pub fn enqueue_message_at(
        &self,
        message_id: MessageId,
        recipient: &str,
        content: &[u8],
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        insert_message(self.conn(), message_id, recipient, content, &created_at)?;
        tracing::debug!(%message_id, recipient, size = content.len(), "message enqueued");
        Ok(())
    }

    /// Queue one copy of a message per recipient, all sharing `created_at`.
    ///
    /// The batch is atomic: a conflict or empty field for any recipient
    /// leaves the mailbox unchanged. Returns the number of rows inserted.
    pub fn enqueue_fanout<S: AsRef<str>>(
        &mut self,
        message_id: MessageId,
        recipients: &[S],
        content: &[u8],
    ) -> Result<usize> {
        let created_at = Utc::now();
        let tx = self.conn_mut().transaction()?;
        for recipient in recipients {
            insert_message(&tx, message_id, recipient.as_ref(), content, &created_at)?;
        }
        tx.commit()?;

        tracing::debug!(
            %message_id,
            recipients = recipients.len(),
            size = content.len(),
            "message fanned out"
        );
        Ok(recipients.len())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Messages waiting for `recipient`, oldest first, optionally capped at
    /// `limit`. Non-destructive.
    ///
    /// Rows with equal timestamps come back in insertion order.
    pub fn fetch_messages(&self, recipient: &str, limit: Option<u32>) -> Result<Vec<MessageRecord>> {
        // A negative LIMIT means "no limit" to SQLite.
        let limit = limit.map(i64::from).unwrap_or(-1);

        let mut stmt = self.conn().prepare(
            "SELECT message_id, recipient, content, created_at
             FROM server_message
             WHERE recipient = ?1
             ORDER BY created_at ASC, rowid ASC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![recipient, limit], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Look up one recipient's copy of a message.
    pub fn get_message(&self, message_id: MessageId, recipient: &str) -> Result<MessageRecord> {
        self.conn()
            .query_row(
                "SELECT message_id, recipient, content, created_at
                 FROM server_message
                 WHERE message_id = ?1 AND recipient = ?2",
                params![message_id.as_bytes().as_slice(), recipient],
                row_to_message,
            )
            .map_err(lookup_error)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Confirm delivery of one recipient's copy. Returns `true` if a row was
    /// deleted; acknowledging twice is not an error.
    pub fn acknowledge_message(&self, message_id: MessageId, recipient: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM server_message WHERE message_id = ?1 AND recipient = ?2",
            params![message_id.as_bytes().as_slice(), recipient],
        )?;
        tracing::debug!(%message_id, recipient, removed = affected > 0, "message acknowledged");
        Ok(affected > 0)
    }

    /// Drop every message queued for `recipient`. Returns the count deleted.
    pub fn purge_recipient(&self, recipient: &str) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM server_message WHERE recipient = ?1",
            params![recipient],
        )?;
        tracing::info!(recipient, purged = affected, "mailbox purged");
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn insert_message(
    conn: &Connection,
    message_id: MessageId,
    recipient: &str,
    content: &[u8],
    created_at: &DateTime<Utc>,
) -> Result<()> {
    require_non_empty("recipient", recipient.as_bytes())?;
    require_non_empty("content", content)?;
    let created_at = encode_timestamp(created_at)?;

    conn.execute(
        "INSERT INTO server_message (message_id, recipient, content, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            message_id.as_bytes().as_slice(),
            recipient,
            content,
            created_at,
        ],
    )
    .map_err(|e| {
        let err = insert_error(e, || format!("message {message_id} for {recipient}"));
        tracing::warn!(%message_id, recipient, error = %err, "message rejected");
        err
    })?;
    Ok(())
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        message_id: MessageId(uuid_column(row, 0)?),
        recipient: row.get(1)?,
        content: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
    })
}
