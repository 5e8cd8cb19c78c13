// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::{
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
        server::Server,
    },
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{enforce_access, AccessGuard, Role, RouteAccess, TokenIssuer, TokenPair},
    config::AppConfig,
    models::{
        AddressView, AppInfo, AuthResponse, CreateAddressRequest, LoginRequest,
        PlaceholderResponse, PublicUser, RefreshRequest, RegisterRequest, UpdateUserRequest,
        UserDetail, UserPage,
    },
    state::AppState,
    storage::{AddressType, RecordMeta, StoredAddress},
};

pub mod auth;
pub mod catalog;
pub mod health;
pub mod users;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();
    let tokens = state.tokens.clone();

    let public = guarded(
        Router::new()
            .route("/", get(health::app_info))
            .route("/health", get(health::health))
            .route("/health/live", get(health::liveness))
            .route("/auth/register", post(auth::register))
            .route("/auth/login", post(auth::login))
            .route("/auth/refresh", post(auth::refresh))
            .route("/products", get(catalog::list_products))
            .route("/categories", get(catalog::list_categories)),
        RouteAccess::public(),
        &tokens,
    );

    let authenticated = guarded(
        Router::new()
            .route("/users/me", get(users::get_current_user))
            .route(
                "/users/me/addresses",
                get(users::list_my_addresses).post(users::add_my_address),
            )
            .route("/cart", get(catalog::get_cart)),
        RouteAccess::authenticated(),
        &tokens,
    );

    let admin = guarded(
        Router::new()
            .route("/users", get(users::list_users))
            .route(
                "/users/{user_id}",
                get(users::get_user)
                    .patch(users::update_user)
                    .delete(users::delete_user),
            ),
        RouteAccess::roles(&Role::ADMINS),
        &tokens,
    );

    let api_routes = Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(admin)
        .with_state(state);

    let mut app = if config.route_prefix == "/" {
        Router::new().merge(api_routes)
    } else {
        Router::new().nest(&config.route_prefix, api_routes)
    };

    if config.is_development() {
        let mut doc = ApiDoc::openapi();
        doc.servers = Some(vec![Server::new(config.route_prefix.clone())]);
        app = app.merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", doc));
    }

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    app.layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors_layer(&config))
}

/// Wrap every route of `routes` with the access check for `access`.
fn guarded(
    routes: Router<AppState>,
    access: RouteAccess,
    tokens: &Arc<TokenIssuer>,
) -> Router<AppState> {
    routes.route_layer(middleware::from_fn_with_state(
        AccessGuard::new(access, tokens.clone()),
        enforce_access,
    ))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let Some(origins) = &config.cors_origins else {
        return CorsLayer::permissive();
    };

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::app_info,
        health::health,
        health::liveness,
        auth::register,
        auth::login,
        auth::refresh,
        users::get_current_user,
        users::list_my_addresses,
        users::add_my_address,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        catalog::list_products,
        catalog::list_categories,
        catalog::get_cart
    ),
    components(
        schemas(
            AppInfo,
            PlaceholderResponse,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AuthResponse,
            TokenPair,
            PublicUser,
            RecordMeta,
            Role,
            UserPage,
            UserDetail,
            UpdateUserRequest,
            CreateAddressRequest,
            AddressView,
            StoredAddress,
            AddressType,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service information and health"),
        (name = "Auth", description = "Registration, login and token refresh"),
        (name = "Users", description = "User profiles, addresses and administration"),
        (name = "Products", description = "Product catalog"),
        (name = "Categories", description = "Product categories"),
        (name = "Cart", description = "Shopping cart")
    )
)]
struct ApiDoc;
