// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login and token rotation.
//!
//! ## Login Ordering
//!
//! Credentials are checked before the active flag: an inactive account is
//! only reported as disabled to a caller who knows its password. Unknown
//! emails still pay for one hash verification so response time does not
//! reveal whether an email is registered.

use std::sync::{Arc, OnceLock};

use chrono::Utc;

use super::password::PasswordHasher;
use super::tokens::{TokenIssuer, TokenPair};
use super::AuthError;
use crate::models::{AuthResponse, PublicUser, RegisterRequest};
use crate::storage::{StoredUser, UserStore};

/// Authentication use cases over a [`UserStore`].
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
    dummy_hash: OnceLock<String>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            store,
            hasher,
            tokens,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Create a customer account and sign it in.
    pub fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let email = req.email.trim().to_string();
        let username = req.username.trim().to_string();

        // Fast path only; the insert below is the authoritative check.
        if self
            .store
            .find_by_email_or_username(&email, &username)?
            .is_some()
        {
            tracing::debug!("Registration rejected: email or username taken");
            return Err(AuthError::Conflict);
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let mut user = StoredUser::new(email, Some(username), password_hash);
        user.first_name = req.first_name;
        user.last_name = req.last_name;
        user.phone = req.phone;

        let user = self.store.insert(user)?;
        tracing::info!(user_id = user.meta.id, "User registered");

        let tokens = self.generate_tokens(&user)?;
        Ok(AuthResponse::new(self.sanitize_user(&user), tokens))
    }

    /// Check credentials and sign in, recording the login time and address.
    pub fn login(
        &self,
        email: &str,
        password: &str,
        ip: Option<String>,
    ) -> Result<AuthResponse, AuthError> {
        let Some(mut user) = self.validate_user(email, password)? else {
            tracing::info!("Login rejected: invalid credentials");
            return Err(AuthError::InvalidCredentials);
        };

        user.last_login_at = Some(Utc::now());
        if ip.is_some() {
            user.last_login_ip = ip;
        }
        let user = self.store.save(user)?;
        tracing::info!(user_id = user.meta.id, "User logged in");

        let tokens = self.generate_tokens(&user)?;
        Ok(AuthResponse::new(self.sanitize_user(&user), tokens))
    }

    /// The user owning `email` when `password` matches.
    ///
    /// `Ok(None)` for an unknown email or a wrong password;
    /// `AccountDisabled` when the password matches an inactive account.
    pub fn validate_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<StoredUser>, AuthError> {
        let Some(user) = self.store.find_by_email(email.trim())? else {
            self.hasher.verify(password, self.dummy_hash());
            return Ok(None);
        };

        if !self.hasher.verify(password, &user.password_hash) {
            return Ok(None);
        }

        if !user.is_active {
            tracing::info!(user_id = user.meta.id, "Login rejected: account disabled");
            return Err(AuthError::AccountDisabled);
        }

        Ok(Some(user))
    }

    pub fn generate_tokens(&self, user: &StoredUser) -> Result<TokenPair, AuthError> {
        self.tokens.issue_pair(user)
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// Bad tokens and tokens of deleted or inactive users fail identically.
    pub fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        let user_id = claims.user_id().ok_or(AuthError::InvalidRefreshToken)?;

        let user = match self.store.find_by_id(user_id)? {
            Some(user) if user.is_active => user,
            Some(_) => {
                tracing::info!(user_id, "Refresh rejected: account disabled");
                return Err(AuthError::InvalidRefreshToken);
            }
            None => {
                tracing::info!(user_id, "Refresh rejected: user not found");
                return Err(AuthError::InvalidRefreshToken);
            }
        };

        self.generate_tokens(&user)
    }

    /// Client-facing view of `user` with every secret field removed.
    pub fn sanitize_user(&self, user: &StoredUser) -> PublicUser {
        PublicUser::from(user)
    }

    pub fn get_user_by_id(&self, id: u64) -> Result<Option<StoredUser>, AuthError> {
        Ok(self.store.find_by_id(id)?)
    }

    fn dummy_hash(&self) -> &str {
        self.dummy_hash.get_or_init(|| {
            self.hasher
                .hash("timing-equalizer")
                .unwrap_or_default()
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::config::test_config;
    use crate::storage::database::temp_db;
    use crate::storage::UserRepository;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use tempfile::TempDir;

    pub(crate) struct Harness {
        pub service: AuthService,
        pub store: Arc<UserRepository>,
        pub tokens: Arc<TokenIssuer>,
        _dir: TempDir,
    }

    pub(crate) fn harness() -> Harness {
        let (db, dir) = temp_db();
        let store = Arc::new(UserRepository::new(db));
        let tokens = Arc::new(TokenIssuer::new(&test_config().auth));
        let service = AuthService::new(
            store.clone(),
            PasswordHasher::new(1).unwrap(),
            tokens.clone(),
        );
        Harness {
            service,
            store,
            tokens,
            _dir: dir,
        }
    }

    pub(crate) fn register_request(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: "Secret123!".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
        }
    }

    #[test]
    fn register_returns_sanitized_user_and_tokens() {
        let h = harness();
        let response = h.service.register(register_request("a@b.com", "ab1")).unwrap();

        assert_eq!(response.user.email, "a@b.com");
        assert_eq!(response.user.username.as_deref(), Some("ab1"));
        assert_eq!(response.user.role, Role::Customer);
        assert!(response.user.is_active);
        assert!(!response.user.is_verified);
        assert_eq!(response.expires_in, "30m");

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["user"].get("passwordHash").is_none());
        assert!(json.get("accessToken").is_some());

        let access = h.tokens.verify_access(&response.access_token).unwrap();
        assert_eq!(access.user_id(), Some(response.user.meta.id));
        assert!(h.tokens.verify_refresh(&response.refresh_token).is_ok());

        // Stored hash is not the plaintext.
        let stored = h.store.find_by_email("a@b.com").unwrap().unwrap();
        assert_ne!(stored.password_hash, "Secret123!");
    }

    #[test]
    fn duplicate_email_or_username_conflicts() {
        let h = harness();
        h.service.register(register_request("a@b.com", "ab1")).unwrap();

        assert!(matches!(
            h.service.register(register_request("a@b.com", "other")),
            Err(AuthError::Conflict)
        ));
        assert!(matches!(
            h.service.register(register_request("new@b.com", "ab1")),
            Err(AuthError::Conflict)
        ));
    }

    #[test]
    fn store_level_conflict_is_reported_as_conflict() {
        let h = harness();
        h.service.register(register_request("a@b.com", "ab1")).unwrap();

        // Skip the pre-check by going straight at the store, as a racing
        // registration would.
        let racing = StoredUser::new("A@b.com".to_string(), Some("zz9".to_string()), "h".into());
        let err = AuthError::from(h.store.insert(racing).unwrap_err());
        assert!(matches!(err, AuthError::Conflict));
    }

    #[test]
    fn concurrent_registrations_admit_one() {
        let h = harness();
        let outcomes: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let service = &h.service;
                    scope.spawn(move || service.register(register_request("race@b.com", &format!("racer{i}"))))
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AuthError::Conflict)));
    }

    #[test]
    fn login_email_is_case_insensitive() {
        let h = harness();
        h.service.register(register_request("a@b.com", "ab1")).unwrap();

        let response = h.service.login("A@B.COM", "Secret123!", None).unwrap();
        assert_eq!(response.user.email, "a@b.com");
    }

    #[test]
    fn login_updates_last_login() {
        let h = harness();
        let registered = h.service.register(register_request("a@b.com", "ab1")).unwrap();
        assert!(registered.user.last_login_at.is_none());

        let response = h
            .service
            .login("a@b.com", "Secret123!", Some("203.0.113.7".to_string()))
            .unwrap();
        assert!(response.user.last_login_at.is_some());
        assert!(h.tokens.verify_access(&response.access_token).is_ok());

        let stored = h.store.find_by_email("a@b.com").unwrap().unwrap();
        assert_eq!(stored.last_login_ip.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn wrong_password_updates_nothing() {
        let h = harness();
        h.service.register(register_request("a@b.com", "ab1")).unwrap();
        let before = h.store.find_by_email("a@b.com").unwrap().unwrap();

        assert!(matches!(
            h.service.login("a@b.com", "Wrong123!", None),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            h.service.login("nobody@b.com", "Secret123!", None),
            Err(AuthError::InvalidCredentials)
        ));

        let after = h.store.find_by_email("a@b.com").unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn inactive_account_is_rejected_after_password_check() {
        let h = harness();
        h.service.register(register_request("a@b.com", "ab1")).unwrap();
        let mut user = h.store.find_by_email("a@b.com").unwrap().unwrap();
        user.is_active = false;
        let before = h.store.save(user).unwrap();

        assert!(matches!(
            h.service.login("a@b.com", "Secret123!", None),
            Err(AuthError::AccountDisabled)
        ));
        // Wrong password on a disabled account looks like any bad login.
        assert!(matches!(
            h.service.login("a@b.com", "Wrong123!", None),
            Err(AuthError::InvalidCredentials)
        ));

        let after = h.store.find_by_email("a@b.com").unwrap().unwrap();
        assert!(after.last_login_at.is_none());
        assert_eq!(before, after);
    }

    #[test]
    fn validate_user_outcomes() {
        let h = harness();
        h.service.register(register_request("a@b.com", "ab1")).unwrap();

        assert!(h.service.validate_user("a@b.com", "Secret123!").unwrap().is_some());
        assert!(h.service.validate_user("a@b.com", "nope").unwrap().is_none());
        assert!(h.service.validate_user("x@b.com", "Secret123!").unwrap().is_none());
    }

    #[test]
    fn refresh_rotates_pair() {
        let h = harness();
        let registered = h.service.register(register_request("a@b.com", "ab1")).unwrap();

        let pair = h.service.refresh_token(&registered.refresh_token).unwrap();
        let claims = h.tokens.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.user_id(), Some(registered.user.meta.id));
        assert_eq!(claims.email, "a@b.com");
        assert!(h.tokens.verify_refresh(&pair.refresh_token).is_ok());
    }

    #[test]
    fn refresh_rejects_access_token_and_tampering() {
        let h = harness();
        let registered = h.service.register(register_request("a@b.com", "ab1")).unwrap();

        assert!(matches!(
            h.service.refresh_token(&registered.access_token),
            Err(AuthError::InvalidRefreshToken)
        ));

        let parts: Vec<&str> = registered.refresh_token.split('.').collect();
        let mut signature = URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
        signature[0] ^= 0xff;
        let tampered = format!(
            "{}.{}.{}",
            parts[0],
            parts[1],
            URL_SAFE_NO_PAD.encode(signature)
        );
        assert!(matches!(
            h.service.refresh_token(&tampered),
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[test]
    fn refresh_rejects_expired_token() {
        let h = harness();
        h.service.register(register_request("a@b.com", "ab1")).unwrap();
        let user = h.store.find_by_email("a@b.com").unwrap().unwrap();

        let stale = h
            .tokens
            .issue_pair_at(&user, Utc::now() - chrono::Duration::days(8))
            .unwrap();
        assert!(matches!(
            h.service.refresh_token(&stale.refresh_token),
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[test]
    fn refresh_rejects_deleted_or_disabled_user() {
        let h = harness();
        let first = h.service.register(register_request("a@b.com", "ab1")).unwrap();
        let second = h.service.register(register_request("c@d.com", "cd1")).unwrap();

        h.store.soft_delete(first.user.meta.id).unwrap();
        assert!(matches!(
            h.service.refresh_token(&first.refresh_token),
            Err(AuthError::InvalidRefreshToken)
        ));

        let mut user = h.store.find_by_id(second.user.meta.id).unwrap().unwrap();
        user.is_active = false;
        h.store.save(user).unwrap();
        assert!(matches!(
            h.service.refresh_token(&second.refresh_token),
            Err(AuthError::InvalidRefreshToken)
        ));
    }

    #[test]
    fn get_user_by_id_hides_deleted() {
        let h = harness();
        let registered = h.service.register(register_request("a@b.com", "ab1")).unwrap();
        let id = registered.user.meta.id;

        assert!(h.service.get_user_by_id(id).unwrap().is_some());
        h.store.soft_delete(id).unwrap();
        assert!(h.service.get_user_by_id(id).unwrap().is_none());
    }
}
