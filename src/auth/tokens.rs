// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access/refresh token issuance and verification.
//!
//! Both tokens are HS256 JWTs with the same claim set
//! (`sub`, `email`, `role`, `iat`, `exp`) but are signed with distinct
//! secrets, so an access token never verifies as a refresh token and vice
//! versa.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::claims::TokenClaims;
use super::AuthError;
use crate::config::{AuthSettings, TokenLifetime};
use crate::storage::StoredUser;

/// Which secret a token is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Configured access token lifetime label, e.g. `"30m"`
    pub expires_in: String,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: TokenLifetime,
}

impl SigningKeys {
    fn new(secret: &str, lifetime: &TokenLifetime) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: lifetime.clone(),
        }
    }
}

/// Signs and verifies token pairs.
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Tokens expire exactly at `exp`.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            access: SigningKeys::new(&settings.access_secret, &settings.access_lifetime),
            refresh: SigningKeys::new(&settings.refresh_secret, &settings.refresh_lifetime),
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Label reported as `expiresIn`.
    pub fn access_expires_in(&self) -> &str {
        self.access.lifetime.label()
    }

    /// Issue a new pair for `user`, valid from now.
    pub fn issue_pair(&self, user: &StoredUser) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(user, Utc::now())
    }

    /// Issue a new pair for `user` as if signed at `issued_at`.
    pub fn issue_pair_at(
        &self,
        user: &StoredUser,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.sign(TokenKind::Access, user, issued_at)?,
            refresh_token: self.sign(TokenKind::Refresh, user, issued_at)?,
            expires_in: self.access_expires_in().to_string(),
        })
    }

    fn sign(
        &self,
        kind: TokenKind,
        user: &StoredUser,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let keys = self.keys(kind);
        let claims = TokenClaims {
            sub: user.meta.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + keys.lifetime.duration()).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)?)
    }

    /// Verify a token's signature and expiry against the secret for `kind`.
    ///
    /// Every failure collapses to one generic error per kind.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<TokenClaims, AuthError> {
        decode::<TokenClaims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(?kind, reason = ?e.kind(), "Token rejected");
                match kind {
                    TokenKind::Access => AuthError::InvalidToken,
                    TokenKind::Refresh => AuthError::InvalidRefreshToken,
                }
            })
    }

    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(TokenKind::Access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(TokenKind::Refresh, token)
    }
}
