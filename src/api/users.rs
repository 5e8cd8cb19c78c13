// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.
//!
//! `/users/me*` serve the caller; the remaining routes are mounted behind
//! an admin-only guard.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{
    AddressView, CreateAddressRequest, PageQuery, PublicUser, UpdateUserRequest, UserDetail,
    UserPage,
};
use crate::state::AppState;

/// Get the current authenticated user's profile.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = PublicUser),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .auth
        .get_user_by_id(caller.user_id)?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;
    Ok(Json(state.auth.sanitize_user(&user)))
}

/// List the current user's addresses.
#[utoipa::path(
    get,
    path = "/users/me/addresses",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Addresses, default first", body = [AddressView]),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn list_my_addresses(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<AddressView>>, ApiError> {
    Ok(Json(state.users.get_user_addresses(caller.user_id)?))
}

/// Add an address for the current user.
#[utoipa::path(
    post,
    path = "/users/me/addresses",
    tag = "Users",
    security(("bearer" = [])),
    request_body = CreateAddressRequest,
    responses(
        (status = 201, description = "Address created", body = AddressView),
        (status = 400, description = "Invalid address"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn add_my_address(
    Auth(caller): Auth,
    State(state): State<AppState>,
    Json(req): Json<CreateAddressRequest>,
) -> Result<(StatusCode, Json<AddressView>), ApiError> {
    req.validate()?;
    let address = state.users.add_address(caller.user_id, req)?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// List users, newest first (admin only).
#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    security(("bearer" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "One page of users", body = UserPage),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin role required"),
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>, ApiError> {
    Ok(Json(state.users.find_all(query.skip, query.take)?))
}

/// Get a user with their addresses (admin only).
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("user_id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserDetail),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<UserDetail>, ApiError> {
    Ok(Json(state.users.find_one(user_id)?))
}

/// Update a user's profile, role or status (admin only).
#[utoipa::path(
    patch,
    path = "/users/{user_id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("user_id" = u64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = PublicUser),
        (status = 400, description = "Invalid update"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username already taken"),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    req.validate()?;
    Ok(Json(state.users.update(user_id, req)?))
}

/// Soft-delete a user and their addresses (admin only).
#[utoipa::path(
    delete,
    path = "/users/{user_id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("user_id" = u64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Forbidden - admin role required"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.users.remove(user_id)?;
    Ok(StatusCode::NO_CONTENT)
}
