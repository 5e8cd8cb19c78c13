// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storefront API - E-commerce backend core
//!
//! Account registration, login and token rotation, role-guarded user
//! administration, and placeholder catalog and cart endpoints.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Password hashing, JWT issuance and route guards
//! - `storage` - Embedded account database (redb)
//! - `users` - User administration service

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod users;
