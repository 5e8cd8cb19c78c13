// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded account database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized StoredUser
//! - `user_emails`: normalized email → user id (live users only)
//! - `user_usernames`: normalized username → user id (live users only)
//! - `addresses`: address id → serialized StoredAddress
//! - `user_addresses`: (user id, address id) → ()
//! - `sequences`: sequence name → last issued id
//!
//! redb admits one write transaction at a time, so a uniqueness check and the
//! insert it guards run atomically when both happen inside the same write
//! transaction.

use std::path::Path;

use redb::{ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{de::DeserializeOwned, Serialize};

use super::StoreResult;

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

pub(crate) const USER_EMAILS: TableDefinition<&str, u64> = TableDefinition::new("user_emails");

pub(crate) const USER_USERNAMES: TableDefinition<&str, u64> =
    TableDefinition::new("user_usernames");

pub(crate) const ADDRESSES: TableDefinition<u64, &[u8]> = TableDefinition::new("addresses");

pub(crate) const USER_ADDRESSES: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("user_addresses");

const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

pub(crate) const USER_SEQUENCE: &str = "users";
pub(crate) const ADDRESS_SEQUENCE: &str = "addresses";

// =============================================================================
// Database
// =============================================================================

/// Handle to the on-disk account database.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(USER_USERNAMES)?;
            let _ = write_txn.open_table(ADDRESSES)?;
            let _ = write_txn.open_table(USER_ADDRESSES)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn begin_read(&self) -> StoreResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    pub(crate) fn begin_write(&self) -> StoreResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Verify the database answers a read transaction.
    pub fn health_check(&self) -> StoreResult<()> {
        let read_txn = self.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}

/// Allocate the next id of a named sequence inside `txn`.
pub(crate) fn next_id(txn: &WriteTransaction, sequence: &str) -> StoreResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let last = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = last + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

pub(crate) fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Key used in the uniqueness indexes.
pub(crate) fn index_key(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
pub(crate) fn temp_db() -> (std::sync::Arc<Database>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("test.redb")).unwrap();
    (std::sync::Arc::new(db), dir)
}
