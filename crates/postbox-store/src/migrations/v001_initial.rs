//! v001 -- Initial schema creation.
//!
//! Creates the server-side `server_key_package` and `server_message` tables
//! and the client-side `client_user` table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Key packages (server)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS server_key_package (
    package_id BLOB PRIMARY KEY NOT NULL,   -- 16-byte UUID, caller-assigned
    client_id  TEXT NOT NULL,
    package    BLOB NOT NULL,               -- opaque key package bytes
    created_at TEXT NOT NULL                -- RFC-3339, fixed width, UTC
);

CREATE INDEX IF NOT EXISTS idx_server_key_package_client_id
    ON server_key_package(client_id);

-- ----------------------------------------------------------------
-- Mailbox (server)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS server_message (
    message_id BLOB NOT NULL,               -- 16-byte UUID
    recipient  TEXT NOT NULL,
    content    BLOB NOT NULL,               -- opaque ciphertext
    created_at TEXT NOT NULL,               -- RFC-3339, fixed width, UTC

    PRIMARY KEY (message_id, recipient)
);

CREATE INDEX IF NOT EXISTS idx_server_message_recipient_created_at
    ON server_message(recipient, created_at);

-- ----------------------------------------------------------------
-- Local identity (client)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS client_user (
    username              TEXT PRIMARY KEY NOT NULL,
    signature_private_key BLOB NOT NULL,
    credential_with_key   BLOB NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
