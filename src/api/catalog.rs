// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Placeholder endpoints for the catalog and cart modules.

use axum::Json;

use crate::auth::Auth;
use crate::models::PlaceholderResponse;

fn placeholder(message: &str) -> Json<PlaceholderResponse> {
    Json(PlaceholderResponse {
        message: message.to_string(),
    })
}

/// List products.
#[utoipa::path(
    get,
    path = "/products",
    tag = "Products",
    responses((status = 200, description = "Placeholder", body = PlaceholderResponse))
)]
pub async fn list_products() -> Json<PlaceholderResponse> {
    placeholder("Products module - not implemented yet")
}

/// List categories.
#[utoipa::path(
    get,
    path = "/categories",
    tag = "Categories",
    responses((status = 200, description = "Placeholder", body = PlaceholderResponse))
)]
pub async fn list_categories() -> Json<PlaceholderResponse> {
    placeholder("Categories module - not implemented yet")
}

/// Get the caller's cart.
#[utoipa::path(
    get,
    path = "/cart",
    tag = "Cart",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Placeholder", body = PlaceholderResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_cart(Auth(caller): Auth) -> Json<PlaceholderResponse> {
    tracing::debug!(user_id = caller.user_id, "Cart requested");
    placeholder("Cart module - not implemented yet")
}
