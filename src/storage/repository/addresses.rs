// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address records.
//!
//! Addresses belong to exactly one user and are listed through the
//! `user_addresses` index. Several addresses of one user may carry the
//! default flag; nothing here enforces a single default per type.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{
    decode, encode, next_id, Database, ADDRESSES, ADDRESS_SEQUENCE, USERS, USER_ADDRESSES,
};
use super::super::{RecordMeta, StoreError, StoreResult};
use super::users::StoredUser;

/// Shipping or billing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    #[default]
    Shipping,
    Billing,
}

/// Address stored for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredAddress {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub user_id: u64,
    pub address_type: AddressType,
    /// Recipient name
    pub full_name: String,
    /// Recipient phone
    pub phone: String,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,
    pub district: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// ISO country code
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub is_default: bool,
}

impl StoredAddress {
    /// Single-line rendering: line 1, line 2, ward, district, city.
    pub fn full_address(&self) -> String {
        let mut parts = vec![self.address_line1.as_str()];
        if let Some(line2) = self.address_line2.as_deref() {
            parts.push(line2);
        }
        if let Some(ward) = self.ward.as_deref() {
            parts.push(ward);
        }
        parts.push(&self.district);
        parts.push(&self.city);
        parts.join(", ")
    }
}

/// Live addresses of `user_id`, default first, then newest first.
pub(super) fn list_for_user(db: &Database, user_id: u64) -> StoreResult<Vec<StoredAddress>> {
    let read_txn = db.begin_read()?;
    let index = read_txn.open_table(USER_ADDRESSES)?;
    let table = read_txn.open_table(ADDRESSES)?;

    let mut addresses = Vec::new();
    for entry in index.range((user_id, 0)..=(user_id, u64::MAX))? {
        let (key, _) = entry?;
        let (_, address_id) = key.value();
        let value = table
            .get(address_id)?
            .ok_or_else(|| StoreError::Corrupt(format!("addresses/{address_id}")))?;
        let address: StoredAddress = decode(value.value())?;
        if !address.meta.is_deleted() {
            addresses.push(address);
        }
    }

    addresses.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| b.meta.created_at.cmp(&a.meta.created_at))
            .then_with(|| b.meta.id.cmp(&a.meta.id))
    });
    Ok(addresses)
}

/// Insert a new address for a live user.
pub(super) fn insert(db: &Database, mut address: StoredAddress) -> StoreResult<StoredAddress> {
    let write_txn = db.begin_write()?;
    {
        let users = write_txn.open_table(USERS)?;
        let owner_live = match users.get(address.user_id)? {
            Some(value) => !decode::<StoredUser>(value.value())?.meta.is_deleted(),
            None => false,
        };
        if !owner_live {
            return Err(StoreError::NotFound(format!("User {}", address.user_id)));
        }
    }

    let id = next_id(&write_txn, ADDRESS_SEQUENCE)?;
    address.meta = RecordMeta::new(id, Utc::now());
    {
        let mut table = write_txn.open_table(ADDRESSES)?;
        table.insert(id, encode(&address)?.as_slice())?;
        let mut index = write_txn.open_table(USER_ADDRESSES)?;
        index.insert((address.user_id, id), ())?;
    }
    write_txn.commit()?;
    Ok(address)
}

/// Soft-delete every address of `user_id` inside an open write transaction.
pub(super) fn mark_deleted_for_user(
    write_txn: &WriteTransaction,
    user_id: u64,
    now: DateTime<Utc>,
) -> StoreResult<usize> {
    let address_ids: Vec<u64> = {
        let index = write_txn.open_table(USER_ADDRESSES)?;
        let mut ids = Vec::new();
        for entry in index.range((user_id, 0)..=(user_id, u64::MAX))? {
            let (key, _) = entry?;
            ids.push(key.value().1);
        }
        ids
    };

    let mut table = write_txn.open_table(ADDRESSES)?;
    let mut count = 0;
    for address_id in address_ids {
        let bytes = match table.get(address_id)? {
            Some(value) => value.value().to_vec(),
            None => continue,
        };
        let mut address: StoredAddress = decode(&bytes)?;
        if address.meta.is_deleted() {
            continue;
        }
        address.meta.mark_deleted(now);
        table.insert(address_id, encode(&address)?.as_slice())?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
pub(crate) fn sample_address(user_id: u64, city: &str, is_default: bool) -> StoredAddress {
    StoredAddress {
        meta: RecordMeta::unsaved(),
        user_id,
        address_type: AddressType::Shipping,
        full_name: "Nguyen Van A".to_string(),
        phone: "+84901234567".to_string(),
        address_line1: "12 Le Loi".to_string(),
        address_line2: None,
        ward: Some("Ben Nghe".to_string()),
        district: "District 1".to_string(),
        city: city.to_string(),
        postal_code: None,
        country: "VN".to_string(),
        notes: None,
        is_default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_address_skips_missing_parts() {
        let mut address = sample_address(1, "Ho Chi Minh City", false);
        assert_eq!(
            address.full_address(),
            "12 Le Loi, Ben Nghe, District 1, Ho Chi Minh City"
        );

        address.ward = None;
        address.address_line2 = Some("Floor 3".to_string());
        assert_eq!(
            address.full_address(),
            "12 Le Loi, Floor 3, District 1, Ho Chi Minh City"
        );
    }

    #[test]
    fn address_type_defaults_to_shipping() {
        assert_eq!(AddressType::default(), AddressType::Shipping);
        assert_eq!(
            serde_json::to_string(&AddressType::Billing).unwrap(),
            r#""billing""#
        );
    }
}
