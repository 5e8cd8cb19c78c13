// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User administration and self-service reads over a [`UserStore`].

use std::sync::Arc;

use crate::models::{
    AddressView, CreateAddressRequest, PublicUser, UpdateUserRequest, UserDetail, UserPage,
};
use crate::storage::{StoreError, StoreResult, StoredUser, UserStore};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

pub struct UsersService {
    store: Arc<dyn UserStore>,
}

impl UsersService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Newest users first. `take` is clamped to `1..=100`.
    pub fn find_all(&self, skip: Option<usize>, take: Option<usize>) -> StoreResult<UserPage> {
        let skip = skip.unwrap_or(0);
        let take = take.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let (users, total) = self.store.list(skip, take)?;
        Ok(UserPage {
            data: users.iter().map(PublicUser::from).collect(),
            total,
            page: skip / take + 1,
            total_pages: total.div_ceil(take),
        })
    }

    pub fn find_one(&self, id: u64) -> StoreResult<UserDetail> {
        let user = self.require(id)?;
        let addresses = self.get_user_addresses(id)?;
        Ok(UserDetail {
            user: PublicUser::from(&user),
            addresses,
        })
    }

    /// Default addresses first, then newest first.
    pub fn get_user_addresses(&self, user_id: u64) -> StoreResult<Vec<AddressView>> {
        Ok(self
            .store
            .addresses_for(user_id)?
            .into_iter()
            .map(AddressView::from)
            .collect())
    }

    pub fn update(&self, id: u64, changes: UpdateUserRequest) -> StoreResult<PublicUser> {
        let mut user = self.require(id)?;
        changes.apply(&mut user);
        let user = self.store.save(user)?;
        tracing::info!(user_id = id, "User updated");
        Ok(PublicUser::from(&user))
    }

    /// Soft delete; the user's addresses go with it.
    pub fn remove(&self, id: u64) -> StoreResult<()> {
        self.require(id)?;
        self.store.soft_delete(id)
    }

    pub fn add_address(
        &self,
        user_id: u64,
        request: CreateAddressRequest,
    ) -> StoreResult<AddressView> {
        self.require(user_id)?;
        let address = self.store.insert_address(request.into_address(user_id))?;
        tracing::debug!(user_id, address_id = address.meta.id, "Address added");
        Ok(AddressView::from(address))
    }

    fn require(&self, id: u64) -> StoreResult<StoredUser> {
        self.store
            .find_by_id(id)?
            .ok_or_else(|| StoreError::NotFound(format!("User with ID {id} not found")))
    }
}
