// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Storage Module
//!
//! Persistent storage for users and their addresses in an embedded redb
//! database.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   storefront.redb   # users, addresses, uniqueness indexes, id sequences
//! ```
//!
//! ## Soft Delete
//!
//! Records are never physically removed. Deleting a user stamps
//! `deleted_at`, deactivates the account, releases its email and username
//! for reuse, and stamps every address of that user as well. Every lookup
//! treats a stamped record as absent.

pub mod database;
pub mod record;
pub mod repository;

pub use database::Database;
pub use record::RecordMeta;
pub use repository::{AddressType, StoredAddress, StoredUser, UserRepository, UserStore};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Entity not found (or soft-deleted)
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique field is already taken
    #[error("already exists: {0}")]
    Conflict(String),

    /// An index points at a record that does not exist
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
