// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user id, as a decimal string
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

impl TokenClaims {
    /// Numeric user id from `sub`.
    pub fn user_id(&self) -> Option<u64> {
        self.sub.parse().ok()
    }
}

/// Authenticated caller extracted from a verified access token.
///
/// Attached to request extensions by the access guard and read by the
/// `Auth` extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,

    /// Token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from verified claims. `None` when `sub` is not a user id.
    pub fn from_claims(claims: TokenClaims) -> Option<Self> {
        Some(Self {
            user_id: claims.user_id()?,
            email: claims.email,
            role: claims.role,
            expires_at: claims.exp,
        })
    }

    /// Whether the caller's role is in `allowed`. An empty set admits everyone.
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        allowed.is_empty() || allowed.contains(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> TokenClaims {
        TokenClaims {
            sub: "42".to_string(),
            email: "a@b.com".to_string(),
            role: Role::Staff,
            iat: 1_700_000_000,
            exp: 1_700_001_800,
        }
    }

    #[test]
    fn from_claims_extracts_identity() {
        let user = AuthenticatedUser::from_claims(sample_claims()).unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.role, Role::Staff);
        assert_eq!(user.expires_at, 1_700_001_800);
    }

    #[test]
    fn from_claims_rejects_non_numeric_subject() {
        let mut claims = sample_claims();
        claims.sub = "user_abc".to_string();
        assert!(AuthenticatedUser::from_claims(claims).is_none());
    }

    #[test]
    fn has_any_role_is_set_membership() {
        let user = AuthenticatedUser::from_claims(sample_claims()).unwrap();
        assert!(user.has_any_role(&[]));
        assert!(user.has_any_role(&[Role::Staff, Role::Admin]));
        // Membership, not hierarchy: staff is not admitted by an admin-only set.
        assert!(!user.has_any_role(&Role::ADMINS));
    }
}
