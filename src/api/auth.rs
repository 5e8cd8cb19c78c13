// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login and token refresh endpoints.
//!
//! Password hashing is CPU bound, so register and login run on the blocking
//! pool.

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::auth::{AuthError, ClientIp, TokenPair};
use crate::models::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest};
use crate::state::AppState;

/// Register a new customer account.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Email or username already registered"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    req.validate()?;
    let auth = state.auth.clone();
    let response = tokio::task::spawn_blocking(move || auth.register(req)).await??;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid login data"),
        (status = 401, description = "Invalid credentials or disabled account"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    req.validate()?;
    let auth = state.auth.clone();
    let response =
        tokio::task::spawn_blocking(move || auth.login(&req.email, &req.password, ip)).await??;
    Ok(Json(response))
}

/// Exchange a refresh token for a new token pair.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid refresh token"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    req.validate()?;
    Ok(Json(state.auth.refresh_token(&req.refresh_token)?))
}
