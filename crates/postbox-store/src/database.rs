//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.
//!
//! A handle is `Send` but not `Sync`. Share one across threads behind a
//! `Mutex`, or open one handle per worker against the same file: uniqueness is
//! enforced by SQLite constraints, so independent connections stay correct.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Value of `PRAGMA synchronous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Durability {
    /// Sufficient for a single local client in WAL mode.
    #[default]
    Normal,
    /// Fsync the WAL on every commit. Used by the server.
    Extra,
}

impl Durability {
    fn pragma_value(self) -> &'static str {
        match self {
            Durability::Normal => "NORMAL",
            Durability::Extra => "EXTRA",
        }
    }
}

/// Connection settings applied on open.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub durability: Durability,
    /// How long a writer waits on a lock held by another connection.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            durability: Durability::Normal,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default client database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/postbox/postbox.db`
    /// - macOS:   `~/Library/Application Support/com.postbox.postbox/postbox.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\postbox\postbox\data\postbox.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "postbox", "postbox").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("postbox.db");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path with default options.
    pub fn open_at(path: &Path) -> Result<Self> {
        Self::open_with(path, &StoreOptions::default())
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// Missing parent directories are created.
    pub fn open_with(path: &Path, options: &StoreOptions) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(
            path = %path.display(),
            durability = ?options.durability,
            "opening database"
        );

        let conn = Connection::open(path)?;
        Self::init(conn, options)
    }

    /// Open a private in-memory database. Its contents vanish on drop.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, &StoreOptions::default())
    }

    fn init(mut conn: Connection, options: &StoreOptions) -> Result<Self> {
        conn.busy_timeout(options.busy_timeout)?;

        // `journal_mode` reports the resulting mode as a row.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "journal mode set");

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", options.durability.pragma_value())?;

        migrations::run_migrations(&mut conn)?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    ///
    /// Callers should prefer the typed helpers, but direct access is
    /// occasionally needed for ad-hoc queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return a mutable reference to the underlying connection (transactions).
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn
            .path()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}
