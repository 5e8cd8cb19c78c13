// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository over the redb account database.
//!
//! ## Uniqueness
//!
//! Email and username are unique (case-insensitive) among live users. The
//! `user_emails` and `user_usernames` indexes hold only live users; the check
//! and the write that claims a key happen in one write transaction, so two
//! concurrent registrations for the same email cannot both commit.
//!
//! ## Security
//!
//! `StoredUser` carries the password hash and one-time tokens. It is never
//! serialized to API clients; handlers convert it to `PublicUser` first.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use super::super::database::{
    decode, encode, index_key, next_id, Database, USERS, USER_EMAILS, USER_SEQUENCE,
    USER_USERNAMES,
};
use super::super::{RecordMeta, StoreError, StoreResult};
use super::addresses::{self, StoredAddress};
use crate::auth::Role;

/// User record as persisted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    pub password_hash: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(default)]
    pub verification_token: Option<String>,
    #[serde(default)]
    pub email_verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reset_token: Option<String>,
    #[serde(default)]
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login_ip: Option<String>,
}

impl StoredUser {
    /// New active, unverified customer. The id is assigned on insert.
    pub fn new(email: String, username: Option<String>, password_hash: String) -> Self {
        Self {
            meta: RecordMeta::unsaved(),
            email,
            username,
            password_hash,
            first_name: None,
            last_name: None,
            phone: None,
            role: Role::Customer,
            is_active: true,
            is_verified: false,
            verification_token: None,
            email_verified_at: None,
            reset_token: None,
            reset_token_expires_at: None,
            last_login_at: None,
            last_login_ip: None,
        }
    }

    /// "First Last" when both names are set, else the username, else the email.
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.username) {
            (Some(first), Some(last), _) => format!("{first} {last}"),
            (_, _, Some(username)) => username.clone(),
            _ => self.email.clone(),
        }
    }
}

impl fmt::Debug for StoredUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredUser")
            .field("id", &self.meta.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("is_verified", &self.is_verified)
            .field("deleted_at", &self.meta.deleted_at)
            .finish_non_exhaustive()
    }
}

/// Persistence contract consumed by the auth and users services.
///
/// Every lookup treats soft-deleted users as absent.
pub trait UserStore: Send + Sync {
    /// First live user whose email or username matches.
    fn find_by_email_or_username(&self, email: &str, username: &str)
        -> StoreResult<Option<StoredUser>>;

    fn find_by_id(&self, id: u64) -> StoreResult<Option<StoredUser>>;

    fn find_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>>;

    /// Insert a new user and assign its id.
    ///
    /// Fails with `StoreError::Conflict` when the email or username is taken.
    fn insert(&self, user: StoredUser) -> StoreResult<StoredUser>;

    /// Persist changes to an existing live user.
    fn save(&self, user: StoredUser) -> StoreResult<StoredUser>;

    /// Soft-delete a user and its addresses.
    fn soft_delete(&self, id: u64) -> StoreResult<()>;

    /// Page of live users, newest first, with the total live count.
    fn list(&self, skip: usize, take: usize) -> StoreResult<(Vec<StoredUser>, usize)>;

    /// Live addresses of a user, default first, then newest first.
    fn addresses_for(&self, user_id: u64) -> StoreResult<Vec<StoredAddress>>;

    fn insert_address(&self, address: StoredAddress) -> StoreResult<StoredAddress>;
}

/// redb-backed `UserStore`.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn lookup(
        &self,
        index: redb::TableDefinition<'static, &'static str, u64>,
        value: &str,
    ) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(index)?;
        let Some(id) = index.get(index_key(value).as_str())?.map(|v| v.value()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        let user: StoredUser = match users.get(id)? {
            Some(value) => decode(value.value())?,
            None => return Err(StoreError::Corrupt(format!("users/{id}"))),
        };
        Ok((!user.meta.is_deleted()).then_some(user))
    }
}

/// Load a user inside a write transaction; deleted users count as absent.
fn load_live(write_txn: &WriteTransaction, id: u64) -> StoreResult<StoredUser> {
    let users = write_txn.open_table(USERS)?;
    let user: StoredUser = match users.get(id)? {
        Some(value) => decode(value.value())?,
        None => return Err(StoreError::NotFound(format!("User {id}"))),
    };
    if user.meta.is_deleted() {
        return Err(StoreError::NotFound(format!("User {id}")));
    }
    Ok(user)
}

/// Point `key` at `id` in a uniqueness index, failing if another user holds it.
fn claim_key(
    write_txn: &WriteTransaction,
    index: redb::TableDefinition<'static, &'static str, u64>,
    key: &str,
    id: u64,
    field: &str,
) -> StoreResult<()> {
    let mut table = write_txn.open_table(index)?;
    let holder = table.get(key)?.map(|v| v.value());
    match holder {
        Some(existing) if existing != id => Err(StoreError::Conflict(format!("{field} {key}"))),
        Some(_) => Ok(()),
        None => {
            table.insert(key, id)?;
            Ok(())
        }
    }
}

/// Remove `key` from a uniqueness index if it still points at `id`.
fn release_key(
    write_txn: &WriteTransaction,
    index: redb::TableDefinition<'static, &'static str, u64>,
    key: &str,
    id: u64,
) -> StoreResult<()> {
    let mut table = write_txn.open_table(index)?;
    let holder = table.get(key)?.map(|v| v.value());
    if holder == Some(id) {
        table.remove(key)?;
    }
    Ok(())
}

fn write_user(write_txn: &WriteTransaction, user: &StoredUser) -> StoreResult<()> {
    let mut users = write_txn.open_table(USERS)?;
    users.insert(user.meta.id, encode(user)?.as_slice())?;
    Ok(())
}

impl UserStore for UserRepository {
    fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> StoreResult<Option<StoredUser>> {
        if let Some(user) = self.lookup(USER_EMAILS, email)? {
            return Ok(Some(user));
        }
        self.lookup(USER_USERNAMES, username)
    }

    fn find_by_id(&self, id: u64) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        let user: Option<StoredUser> = match users.get(id)? {
            Some(value) => Some(decode(value.value())?),
            None => None,
        };
        Ok(user.filter(|u| !u.meta.is_deleted()))
    }

    fn find_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        self.lookup(USER_EMAILS, email)
    }

    fn insert(&self, mut user: StoredUser) -> StoreResult<StoredUser> {
        let write_txn = self.db.begin_write()?;
        let id = next_id(&write_txn, USER_SEQUENCE)?;

        claim_key(&write_txn, USER_EMAILS, &index_key(&user.email), id, "email")?;
        if let Some(username) = user.username.as_deref() {
            claim_key(&write_txn, USER_USERNAMES, &index_key(username), id, "username")?;
        }

        user.meta = RecordMeta::new(id, Utc::now());
        write_user(&write_txn, &user)?;
        write_txn.commit()?;

        tracing::debug!(user_id = id, "User inserted");
        Ok(user)
    }

    fn save(&self, mut user: StoredUser) -> StoreResult<StoredUser> {
        let id = user.meta.id;
        let write_txn = self.db.begin_write()?;
        let current = load_live(&write_txn, id)?;

        let old_email = index_key(&current.email);
        let new_email = index_key(&user.email);
        if old_email != new_email {
            claim_key(&write_txn, USER_EMAILS, &new_email, id, "email")?;
            release_key(&write_txn, USER_EMAILS, &old_email, id)?;
        }

        let old_username = current.username.as_deref().map(index_key);
        let new_username = user.username.as_deref().map(index_key);
        if old_username != new_username {
            if let Some(key) = new_username.as_deref() {
                claim_key(&write_txn, USER_USERNAMES, key, id, "username")?;
            }
            if let Some(key) = old_username.as_deref() {
                release_key(&write_txn, USER_USERNAMES, key, id)?;
            }
        }

        // Identity and lifecycle stamps are owned by the store.
        user.meta = current.meta;
        user.meta.touch(Utc::now());
        write_user(&write_txn, &user)?;
        write_txn.commit()?;
        Ok(user)
    }

    fn soft_delete(&self, id: u64) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        let mut user = load_live(&write_txn, id)?;

        release_key(&write_txn, USER_EMAILS, &index_key(&user.email), id)?;
        if let Some(username) = user.username.as_deref() {
            release_key(&write_txn, USER_USERNAMES, &index_key(username), id)?;
        }

        let now = Utc::now();
        user.meta.mark_deleted(now);
        user.is_active = false;
        write_user(&write_txn, &user)?;
        let addresses = addresses::mark_deleted_for_user(&write_txn, id, now)?;
        write_txn.commit()?;

        tracing::info!(user_id = id, addresses, "User soft-deleted");
        Ok(())
    }

    fn list(&self, skip: usize, take: usize) -> StoreResult<(Vec<StoredUser>, usize)> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;

        let mut page = Vec::new();
        let mut total = 0;
        // Ids are allocated in increasing order, so reverse key order is newest first.
        for entry in users.iter()?.rev() {
            let (_, value) = entry?;
            let user: StoredUser = decode(value.value())?;
            if user.meta.is_deleted() {
                continue;
            }
            if total >= skip && page.len() < take {
                page.push(user);
            }
            total += 1;
        }
        Ok((page, total))
    }

    fn addresses_for(&self, user_id: u64) -> StoreResult<Vec<StoredAddress>> {
        addresses::list_for_user(&self.db, user_id)
    }

    fn insert_address(&self, address: StoredAddress) -> StoreResult<StoredAddress> {
        addresses::insert(&self.db, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::temp_db;
    use crate::storage::repository::addresses::sample_address;

    fn new_user(email: &str, username: Option<&str>) -> StoredUser {
        StoredUser::new(
            email.to_string(),
            username.map(str::to_string),
            "$argon2id$hash".to_string(),
        )
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(db);

        let first = repo.insert(new_user("a@b.com", Some("ab1"))).unwrap();
        let second = repo.insert(new_user("c@d.com", None)).unwrap();
        assert_eq!(first.meta.id, 1);
        assert_eq!(second.meta.id, 2);
        assert_eq!(first.role, Role::Customer);
        assert!(first.is_active);
        assert!(!first.is_verified);

        let loaded = repo.find_by_id(1).unwrap().unwrap();
        assert_eq!(loaded, first);
    }

    #[test]
    fn duplicate_email_or_username_conflicts() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(db);
        repo.insert(new_user("a@b.com", Some("ab1"))).unwrap();

        assert!(matches!(
            repo.insert(new_user("A@B.com", Some("other"))),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            repo.insert(new_user("x@y.com", Some("AB1"))),
            Err(StoreError::Conflict(_))
        ));

        // The failed inserts left nothing behind.
        let (users, total) = repo.list(0, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(users.len(), 1);
        assert!(repo.find_by_email("x@y.com").unwrap().is_none());
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(db);
        let user = repo.insert(new_user("Mixed@Case.com", Some("Shopper"))).unwrap();

        let by_email = repo.find_by_email("mixed@case.com").unwrap().unwrap();
        assert_eq!(by_email.meta.id, user.meta.id);
        // The stored email keeps its original spelling.
        assert_eq!(by_email.email, "Mixed@Case.com");

        let by_username = repo
            .find_by_email_or_username("nobody@x.com", "shopper")
            .unwrap()
            .unwrap();
        assert_eq!(by_username.meta.id, user.meta.id);
        assert!(repo
            .find_by_email_or_username("nobody@x.com", "nobody")
            .unwrap()
            .is_none());
    }

    #[test]
    fn save_moves_index_entries() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(db);
        let mut user = repo.insert(new_user("old@b.com", Some("old"))).unwrap();
        repo.insert(new_user("taken@b.com", Some("taken"))).unwrap();

        user.email = "new@b.com".to_string();
        user.username = Some("new".to_string());
        user.first_name = Some("Ada".to_string());
        let saved = repo.save(user.clone()).unwrap();
        assert_eq!(saved.first_name.as_deref(), Some("Ada"));
        assert!(saved.meta.updated_at >= saved.meta.created_at);

        assert!(repo.find_by_email("old@b.com").unwrap().is_none());
        assert!(repo.find_by_email("new@b.com").unwrap().is_some());
        // The released address is free again.
        repo.insert(new_user("old@b.com", Some("old"))).unwrap();

        user.email = "taken@b.com".to_string();
        assert!(matches!(repo.save(user), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn save_of_missing_user_is_not_found() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(db);
        let mut ghost = new_user("ghost@b.com", None);
        ghost.meta = RecordMeta::new(42, Utc::now());
        assert!(matches!(repo.save(ghost), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn soft_delete_hides_user_and_releases_keys() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(db);
        let user = repo.insert(new_user("a@b.com", Some("ab1"))).unwrap();
        let id = user.meta.id;
        repo.insert_address(sample_address(id, "Hanoi", true)).unwrap();

        repo.soft_delete(id).unwrap();

        assert!(repo.find_by_id(id).unwrap().is_none());
        assert!(repo.find_by_email("a@b.com").unwrap().is_none());
        assert!(repo.addresses_for(id).unwrap().is_empty());
        assert_eq!(repo.list(0, 10).unwrap().1, 0);
        assert!(matches!(repo.soft_delete(id), Err(StoreError::NotFound(_))));

        // Email and username can be registered again.
        let again = repo.insert(new_user("a@b.com", Some("ab1"))).unwrap();
        assert_ne!(again.meta.id, id);
    }

    #[test]
    fn list_pages_newest_first() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(db);
        for i in 1..=5 {
            repo.insert(new_user(&format!("u{i}@b.com"), None)).unwrap();
        }
        repo.soft_delete(3).unwrap();

        let (page, total) = repo.list(0, 2).unwrap();
        assert_eq!(total, 4);
        let ids: Vec<u64> = page.iter().map(|u| u.meta.id).collect();
        assert_eq!(ids, vec![5, 4]);

        let (page, _) = repo.list(2, 2).unwrap();
        let ids: Vec<u64> = page.iter().map(|u| u.meta.id).collect();
        assert_eq!(ids, vec![2, 1]);

        let (page, total) = repo.list(10, 2).unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 4);
    }

    #[test]
    fn addresses_default_first_then_newest() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(db);
        let owner = repo.insert(new_user("a@b.com", None)).unwrap().meta.id;
        let other = repo.insert(new_user("c@d.com", None)).unwrap().meta.id;

        let first = repo.insert_address(sample_address(owner, "Hanoi", false)).unwrap();
        let default = repo.insert_address(sample_address(owner, "Hue", true)).unwrap();
        let latest = repo.insert_address(sample_address(owner, "Da Nang", false)).unwrap();
        repo.insert_address(sample_address(other, "Can Tho", true)).unwrap();

        let ids: Vec<u64> = repo
            .addresses_for(owner)
            .unwrap()
            .iter()
            .map(|a| a.meta.id)
            .collect();
        assert_eq!(ids, vec![default.meta.id, latest.meta.id, first.meta.id]);
    }

    #[test]
    fn address_for_unknown_user_is_rejected() {
        let (db, _dir) = temp_db();
        let repo = UserRepository::new(db);
        assert!(matches!(
            repo.insert_address(sample_address(99, "Hanoi", false)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn full_name_falls_back() {
        let mut user = new_user("a@b.com", Some("ab1"));
        assert_eq!(user.full_name(), "ab1");
        user.first_name = Some("Ada".to_string());
        assert_eq!(user.full_name(), "ab1");
        user.last_name = Some("Lovelace".to_string());
        assert_eq!(user.full_name(), "Ada Lovelace");
        user.username = None;
        user.first_name = None;
        assert_eq!(user.full_name(), "a@b.com");
    }

    #[test]
    fn debug_output_omits_secrets() {
        let mut user = new_user("a@b.com", None);
        user.reset_token = Some("reset-me".to_string());
        let rendered = format!("{user:?}");
        assert!(!rendered.contains("$argon2id$hash"));
        assert!(!rendered.contains("reset-me"));
    }
}
