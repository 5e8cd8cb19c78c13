// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Credential checks, token issuance and route guards for the storefront
//! API.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in with email and password
//! 2. Server returns an access token (short-lived) and a refresh token
//! 3. Client sends `Authorization: Bearer <access token>` on every call
//! 4. Server:
//!    - Verifies the HS256 signature with the access secret
//!    - Rejects expired tokens (no clock skew allowance)
//!    - Extracts `sub` → user id, plus email and role
//!    - Checks the role against the route's [`RouteAccess`]
//! 5. When the access token expires the client posts the refresh token to
//!    `/auth/refresh` and receives a fresh pair
//!
//! ## Security
//!
//! - Every route requires authentication unless declared public
//! - Access and refresh tokens use distinct secrets
//! - Token failures all map to one generic error
//! - Passwords are stored as Argon2id hashes only

pub mod claims;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod password;
pub mod roles;
pub mod service;
pub mod tokens;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use error::AuthError;
pub use extractor::{Auth, ClientIp};
pub use guard::{enforce_access, AccessGuard, AuthRequirement, RouteAccess};
pub use password::{PasswordError, PasswordHasher};
pub use roles::Role;
pub use service::AuthService;
pub use tokens::{TokenIssuer, TokenKind, TokenPair};
