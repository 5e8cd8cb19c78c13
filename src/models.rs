// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All wire types use
//! camelCase field names and derive `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Auth**: registration, login and token refresh bodies
//! - **Users**: the sanitized [`PublicUser`] view, paging, profile updates
//! - **Addresses**: address creation and the address view
//! - **App**: info and placeholder responses

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::auth::{Role, TokenPair};
use crate::storage::{AddressType, RecordMeta, StoredAddress, StoredUser};

// =============================================================================
// Auth Models
// =============================================================================

/// Registration body.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 50, message = "username must be 3 to 50 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 100, message = "password must be 8 to 100 characters"))]
    #[validate(custom(
        function = "password_strength",
        message = "password must contain an uppercase letter, a lowercase letter, and a number or special character"
    ))]
    pub password: String,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

/// Login body.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// Token refresh body.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refreshToken must not be empty"))]
    pub refresh_token: String,
}

/// Upper case, lower case, and a digit or non-word character.
fn password_strength(password: &str) -> Result<(), ValidationError> {
    let has_upper = password.chars().any(char::is_uppercase);
    let has_lower = password.chars().any(char::is_lowercase);
    let has_digit_or_symbol = password
        .chars()
        .any(|c| c.is_ascii_digit() || !(c.is_alphanumeric() || c == '_'));
    if has_upper && has_lower && has_digit_or_symbol {
        Ok(())
    } else {
        Err(ValidationError::new("password_strength"))
    }
}

/// Sanitized user plus a fresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime label, e.g. `"30m"`
    pub expires_in: String,
}

impl AuthResponse {
    pub fn new(user: PublicUser, tokens: TokenPair) -> Self {
        Self {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
        }
    }
}

// =============================================================================
// User Models
// =============================================================================

/// User as returned to API clients.
///
/// Has no field for the password hash, verification token or reset token,
/// so a secret can never be serialized through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub email: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub email_verified_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&StoredUser> for PublicUser {
    fn from(user: &StoredUser) -> Self {
        Self {
            meta: user.meta.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            phone: user.phone.clone(),
            role: user.role,
            is_active: user.is_active,
            is_verified: user.is_verified,
            email_verified_at: user.email_verified_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Paging parameters for `GET /users`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Records to skip (default 0)
    pub skip: Option<usize>,
    /// Page size, 1 to 100 (default 20)
    pub take: Option<usize>,
}

/// One page of users.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub data: Vec<PublicUser>,
    pub total: usize,
    /// 1-based page number
    pub page: usize,
    pub total_pages: usize,
}

/// A user with their addresses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: PublicUser,
    pub addresses: Vec<AddressView>,
}

/// Profile and administration changes.
///
/// Absent fields are left unchanged. Secrets cannot be changed here.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 50, message = "username must be 3 to 50 characters"))]
    pub username: Option<String>,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

impl UpdateUserRequest {
    /// Apply the present fields to `user`.
    pub fn apply(self, user: &mut StoredUser) {
        if let Some(username) = self.username {
            user.username = Some(username);
        }
        if let Some(first_name) = self.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = self.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(phone) = self.phone {
            user.phone = Some(phone);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        if let Some(is_verified) = self.is_verified {
            if is_verified && !user.is_verified {
                user.email_verified_at = Some(chrono::Utc::now());
            }
            user.is_verified = is_verified;
        }
    }
}

// =============================================================================
// Address Models
// =============================================================================

/// New address body.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressRequest {
    #[serde(default)]
    pub address_type: AddressType,
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 255))]
    pub address_line1: String,
    #[validate(length(max = 255))]
    pub address_line2: Option<String>,
    #[validate(length(max = 100))]
    pub ward: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub district: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    /// ISO country code (default `VN`)
    #[validate(length(equal = 2))]
    pub country: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl CreateAddressRequest {
    pub fn into_address(self, user_id: u64) -> StoredAddress {
        StoredAddress {
            meta: RecordMeta::unsaved(),
            user_id,
            address_type: self.address_type,
            full_name: self.full_name,
            phone: self.phone,
            address_line1: self.address_line1,
            address_line2: self.address_line2,
            ward: self.ward,
            district: self.district,
            city: self.city,
            postal_code: self.postal_code,
            country: self
                .country
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "VN".to_string()),
            notes: self.notes,
            is_default: self.is_default,
        }
    }
}

/// Address with its single-line rendering.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressView {
    #[serde(flatten)]
    pub address: StoredAddress,
    pub full_address: String,
}

impl From<StoredAddress> for AddressView {
    fn from(address: StoredAddress) -> Self {
        let full_address = address.full_address();
        Self {
            address,
            full_address,
        }
    }
}

// =============================================================================
// App Models
// =============================================================================

/// Response of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub environment: String,
    /// Swagger UI path, present in development only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

/// Fixed message returned by modules that are not built out yet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlaceholderResponse {
    pub message: String,
}
