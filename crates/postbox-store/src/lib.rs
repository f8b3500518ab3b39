//! # postbox-store
//!
//! Persistence layer for an MLS-style messaging backend, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for three independent
//! tables:
//!
//! - **key packages** published by clients for asynchronous key agreement
//!   ([`key_packages`]),
//! - the per-recipient **mailbox** of encrypted messages awaiting delivery
//!   ([`mailbox`]),
//! - the local **client identity** (signing key + credential) ([`identity`]).
//!
//! Server processes use the first two; a client process uses the third. All
//! payloads are opaque bytes: nothing in this crate parses key packages,
//! ciphertext or credentials.

pub mod database;
pub mod identity;
pub mod key_packages;
pub mod mailbox;
pub mod migrations;
pub mod models;
pub mod stats;

mod error;

pub use database::{Database, Durability, StoreOptions};
pub use error::{Result, StoreError};
pub use models::*;
pub use stats::BacklogStats;
