// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-route access declarations enforced before the handler runs.
//!
//! Every route group declares a [`RouteAccess`] and is wrapped with
//! [`enforce_access`] as a route layer:
//!
//! ```rust,ignore
//! let admin = Router::new()
//!     .route("/users", get(list_users))
//!     .route_layer(middleware::from_fn_with_state(
//!         AccessGuard::new(RouteAccess::roles(&Role::ADMINS), tokens.clone()),
//!         enforce_access,
//!     ));
//! ```
//!
//! A request moves from unauthenticated to authenticated (valid bearer
//! token) to authorized (role in the allowed set); any failed step returns
//! 401 or 403 and the handler never runs. On success the caller is attached
//! to the request extensions as [`AuthenticatedUser`].

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthenticatedUser, Role, TokenIssuer};

/// Whether a route needs a caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    Required,
    /// Explicit opt-out; the guard lets every request through.
    Public,
}

/// Access declaration for a route or route group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAccess {
    pub auth: AuthRequirement,
    /// Permitted roles; empty admits any authenticated caller.
    pub allowed_roles: Vec<Role>,
}

impl Default for RouteAccess {
    fn default() -> Self {
        Self::authenticated()
    }
}

impl RouteAccess {
    /// Any authenticated caller.
    pub fn authenticated() -> Self {
        Self {
            auth: AuthRequirement::Required,
            allowed_roles: Vec::new(),
        }
    }

    /// No authentication.
    pub fn public() -> Self {
        Self {
            auth: AuthRequirement::Public,
            allowed_roles: Vec::new(),
        }
    }

    /// Authenticated callers whose role is one of `roles`.
    pub fn roles(roles: &[Role]) -> Self {
        Self {
            auth: AuthRequirement::Required,
            allowed_roles: roles.to_vec(),
        }
    }

    /// Run the authentication and role checks against request headers.
    ///
    /// `Ok(None)` for public routes.
    pub fn check(
        &self,
        tokens: &TokenIssuer,
        headers: &HeaderMap,
    ) -> Result<Option<AuthenticatedUser>, AuthError> {
        if self.auth == AuthRequirement::Public {
            return Ok(None);
        }

        let user = authenticate(tokens, headers)?;
        if !user.has_any_role(&self.allowed_roles) {
            tracing::debug!(
                user_id = user.user_id,
                role = %user.role,
                "Route access denied"
            );
            return Err(AuthError::InsufficientPermissions);
        }
        Ok(Some(user))
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidAuthHeader)?;
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Verify the bearer access token and decode the caller.
pub fn authenticate(tokens: &TokenIssuer, headers: &HeaderMap) -> Result<AuthenticatedUser, AuthError> {
    let claims = tokens.verify_access(bearer_token(headers)?)?;
    AuthenticatedUser::from_claims(claims).ok_or(AuthError::InvalidToken)
}

/// State of the [`enforce_access`] middleware.
#[derive(Clone)]
pub struct AccessGuard {
    access: RouteAccess,
    tokens: Arc<TokenIssuer>,
}

impl AccessGuard {
    pub fn new(access: RouteAccess, tokens: Arc<TokenIssuer>) -> Self {
        Self { access, tokens }
    }
}

/// Middleware enforcing an [`AccessGuard`].
pub async fn enforce_access(
    State(guard): State<AccessGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    match guard.access.check(&guard.tokens, request.headers()) {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
