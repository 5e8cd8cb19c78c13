// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the account database.

pub mod addresses;
pub mod users;

pub use addresses::{AddressType, StoredAddress};
pub use users::{StoredUser, UserRepository, UserStore};
