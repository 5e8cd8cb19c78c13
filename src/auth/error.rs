// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::password::PasswordError;
use crate::storage::StoreError;

/// Authentication and authorization error type.
///
/// Token failures are deliberately collapsed into [`AuthError::InvalidToken`]
/// and [`AuthError::InvalidRefreshToken`] so callers cannot tell an expired
/// token from a forged one.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("Authorization header is required")]
    MissingAuthHeader,

    /// Authorization header is not `Bearer <token>`
    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,

    /// Access token failed verification for any reason
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Refresh token failed verification, or its user is gone or disabled
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Unknown email or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Password matched but the account is inactive
    #[error("User account is disabled")]
    AccountDisabled,

    /// Authenticated but role not permitted on this route
    #[error("Insufficient permissions for this operation")]
    InsufficientPermissions,

    /// Email or username already registered
    #[error("User with this email or username already exists")]
    Conflict,

    /// Request body failed validation
    #[error("{0}")]
    Validation(String),

    #[error("password hashing failed: {0}")]
    Password(#[from] PasswordError),

    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("store failure: {0}")]
    Store(StoreError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) => AuthError::Conflict,
            other => AuthError::Store(other),
        }
    }
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken => "invalid_token",
            AuthError::InvalidRefreshToken => "invalid_refresh_token",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccountDisabled => "account_disabled",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::Conflict => "conflict",
            AuthError::Validation(_) => "validation_failed",
            AuthError::Password(_)
            | AuthError::Signing(_)
            | AuthError::Store(_)
            | AuthError::Task(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken
            | AuthError::InvalidRefreshToken
            | AuthError::InvalidCredentials
            | AuthError::AccountDisabled => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Password(_)
            | AuthError::Signing(_)
            | AuthError::Store(_)
            | AuthError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Authentication request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = Json(AuthErrorBody {
            error: message,
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
