// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;

use crate::auth::{AuthService, PasswordError, PasswordHasher, TokenIssuer};
use crate::config::AppConfig;
use crate::storage::{Database, UserRepository, UserStore};
use crate::users::UsersService;

/// Shared handler state, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub tokens: Arc<TokenIssuer>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UsersService>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, db: Arc<Database>) -> Result<Self, PasswordError> {
        let store: Arc<dyn UserStore> = Arc::new(UserRepository::new(db.clone()));
        let hasher = PasswordHasher::new(config.auth.password_hash_cost)?;
        let tokens = Arc::new(TokenIssuer::new(&config.auth));
        let auth = Arc::new(AuthService::new(store.clone(), hasher, tokens.clone()));
        let users = Arc::new(UsersService::new(store));

        Ok(Self {
            config: Arc::new(config),
            db,
            tokens,
            auth,
            users,
            started_at: Instant::now(),
        })
    }
}

impl FromRef<AppState> for Arc<TokenIssuer> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    let (db, dir) = crate::storage::database::temp_db();
    let state = AppState::new(crate::config::test_config(), db).unwrap();
    (state, dir)
}
