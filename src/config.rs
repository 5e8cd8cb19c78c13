// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! All settings are read once at startup into an immutable [`AppConfig`]
//! that is passed explicitly to every component that needs it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `DATA_DIR` | Directory holding the redb database | `./data` |
//! | `APP_NAME` | Name reported by `GET /` | `E-Commerce Platform` |
//! | `APP_VERSION` | Version reported by `GET /` | crate version |
//! | `APP_ENV` | `development` enables `/docs` | `development` |
//! | `APP_PREFIX` | Route prefix | `api/v1` |
//! | `CORS_ORIGIN` | Comma separated allowed origins | any |
//! | `PASSWORD_HASH_COST` | Argon2 iteration count | `10` |
//! | `JWT_SECRET` | Access token signing secret | Required |
//! | `JWT_EXPIRATION` | Access token lifetime | `30m` |
//! | `JWT_REFRESH_SECRET` | Refresh token signing secret | Required |
//! | `JWT_REFRESH_EXPIRATION` | Refresh token lifetime | `7d` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::path::PathBuf;

use chrono::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const APP_NAME_ENV: &str = "APP_NAME";
pub const APP_VERSION_ENV: &str = "APP_VERSION";
pub const APP_ENV_ENV: &str = "APP_ENV";
pub const APP_PREFIX_ENV: &str = "APP_PREFIX";
pub const CORS_ORIGIN_ENV: &str = "CORS_ORIGIN";
pub const PASSWORD_HASH_COST_ENV: &str = "PASSWORD_HASH_COST";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRATION_ENV: &str = "JWT_EXPIRATION";
pub const JWT_REFRESH_SECRET_ENV: &str = "JWT_REFRESH_SECRET";
pub const JWT_REFRESH_EXPIRATION_ENV: &str = "JWT_REFRESH_EXPIRATION";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HASH_COST: u32 = 10;
const DEFAULT_ACCESS_EXPIRATION: &str = "30m";
const DEFAULT_REFRESH_EXPIRATION: &str = "7d";

/// Errors raised while assembling [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("JWT_SECRET and JWT_REFRESH_SECRET must differ")]
    SharedSecret,
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// A token lifetime as configured (`"30m"`, `"7d"`, `"3600"`).
///
/// The label is echoed back to clients as `expiresIn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLifetime {
    label: String,
    duration: Duration,
}

impl TokenLifetime {
    /// Parse `<n>s`, `<n>m`, `<n>h`, `<n>d`, or a bare number of seconds.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        let (digits, unit) = match label.char_indices().last()? {
            (idx, c) if c.is_ascii_alphabetic() => (&label[..idx], Some(c)),
            _ => (label, None),
        };
        let amount: i64 = digits.parse().ok().filter(|n| *n > 0)?;
        let duration = match unit {
            None | Some('s') => Duration::try_seconds(amount)?,
            Some('m') => Duration::try_minutes(amount)?,
            Some('h') => Duration::try_hours(amount)?,
            Some('d') => Duration::try_days(amount)?,
            Some(_) => return None,
        };
        Some(Self {
            label: label.to_string(),
            duration,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Secrets and lifetimes used by the password hasher and token issuer.
#[derive(Clone)]
pub struct AuthSettings {
    pub password_hash_cost: u32,
    pub access_secret: String,
    pub access_lifetime: TokenLifetime,
    pub refresh_secret: String,
    pub refresh_lifetime: TokenLifetime,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("password_hash_cost", &self.password_hash_cost)
            .field("access_secret", &"<redacted>")
            .field("access_lifetime", &self.access_lifetime)
            .field("refresh_secret", &"<redacted>")
            .field("refresh_lifetime", &self.refresh_lifetime)
            .finish()
    }
}

/// Immutable application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub app_name: String,
    pub app_version: String,
    pub environment: String,
    pub route_prefix: String,
    pub cors_origins: Option<Vec<String>>,
    pub log_format: LogFormat,
    pub auth: AuthSettings,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get(PORT_ENV) {
            Some(v) => v.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                value: v,
            })?,
            None => DEFAULT_PORT,
        };

        let password_hash_cost = match get(PASSWORD_HASH_COST_ENV) {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|cost| *cost > 0)
                .ok_or(ConfigError::Invalid {
                    name: PASSWORD_HASH_COST_ENV,
                    value: v,
                })?,
            None => DEFAULT_HASH_COST,
        };

        let access_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        let refresh_secret =
            get(JWT_REFRESH_SECRET_ENV).ok_or(ConfigError::Missing(JWT_REFRESH_SECRET_ENV))?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let access_lifetime = lifetime(
            JWT_EXPIRATION_ENV,
            get(JWT_EXPIRATION_ENV),
            DEFAULT_ACCESS_EXPIRATION,
        )?;
        let refresh_lifetime = lifetime(
            JWT_REFRESH_EXPIRATION_ENV,
            get(JWT_REFRESH_EXPIRATION_ENV),
            DEFAULT_REFRESH_EXPIRATION,
        )?;

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    value: other.to_string(),
                })
            }
        };

        let cors_origins = get(CORS_ORIGIN_ENV).map(|v| {
            v.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        });

        let prefix = get(APP_PREFIX_ENV).unwrap_or_else(|| "api/v1".to_string());

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| "./data".to_string())),
            app_name: get(APP_NAME_ENV).unwrap_or_else(|| "E-Commerce Platform".to_string()),
            app_version: get(APP_VERSION_ENV)
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            environment: get(APP_ENV_ENV).unwrap_or_else(|| "development".to_string()),
            route_prefix: format!("/{}", prefix.trim_matches('/')),
            cors_origins,
            log_format,
            auth: AuthSettings {
                password_hash_cost,
                access_secret,
                access_lifetime,
                refresh_secret,
                refresh_lifetime,
            },
        })
    }

    /// Whether interactive API docs are served.
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Path of the redb database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("storefront.redb")
    }
}

fn lifetime(
    name: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<TokenLifetime, ConfigError> {
    let raw = value.unwrap_or_else(|| default.to_string());
    TokenLifetime::parse(&raw).ok_or(ConfigError::Invalid { name, value: raw })
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        JWT_SECRET_ENV => Some("test-access-secret".to_string()),
        JWT_REFRESH_SECRET_ENV => Some("test-refresh-secret".to_string()),
        PASSWORD_HASH_COST_ENV => Some("1".to_string()),
        _ => None,
    })
    .expect("test config is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SECRETS: [(&str, &str); 2] = [
        (JWT_SECRET_ENV, "access"),
        (JWT_REFRESH_SECRET_ENV, "refresh"),
    ];

    #[test]
    fn lifetime_parses_units() {
        assert_eq!(TokenLifetime::parse("30m").unwrap().duration(), Duration::minutes(30));
        assert_eq!(TokenLifetime::parse("7d").unwrap().duration(), Duration::days(7));
        assert_eq!(TokenLifetime::parse("12h").unwrap().duration(), Duration::hours(12));
        assert_eq!(TokenLifetime::parse("45s").unwrap().duration(), Duration::seconds(45));
        assert_eq!(TokenLifetime::parse("900").unwrap().duration(), Duration::seconds(900));
        assert_eq!(TokenLifetime::parse("30m").unwrap().label(), "30m");
    }

    #[test]
    fn lifetime_rejects_garbage() {
        assert!(TokenLifetime::parse("").is_none());
        assert!(TokenLifetime::parse("m").is_none());
        assert!(TokenLifetime::parse("0m").is_none());
        assert!(TokenLifetime::parse("-5m").is_none());
        assert!(TokenLifetime::parse("10w").is_none());
        assert!(TokenLifetime::parse("ten").is_none());
    }

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&SECRETS)).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.route_prefix, "/api/v1");
        assert_eq!(config.auth.password_hash_cost, 10);
        assert_eq!(config.auth.access_lifetime.label(), "30m");
        assert_eq!(config.auth.refresh_lifetime.duration(), Duration::days(7));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.cors_origins.is_none());
        assert!(config.is_development());
    }

    #[test]
    fn secrets_are_required_and_distinct() {
        let missing = AppConfig::from_lookup(lookup(&[(JWT_SECRET_ENV, "access")]));
        assert!(matches!(missing, Err(ConfigError::Missing(JWT_REFRESH_SECRET_ENV))));

        let shared = AppConfig::from_lookup(lookup(&[
            (JWT_SECRET_ENV, "same"),
            (JWT_REFRESH_SECRET_ENV, "same"),
        ]));
        assert!(matches!(shared, Err(ConfigError::SharedSecret)));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = SECRETS.to_vec();
        pairs.extend([
            (PORT_ENV, "8081"),
            (APP_PREFIX_ENV, "/shop/"),
            (CORS_ORIGIN_ENV, "https://a.example, https://b.example"),
            (JWT_EXPIRATION_ENV, "15m"),
            (LOG_FORMAT_ENV, "json"),
        ]);
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.route_prefix, "/shop");
        assert_eq!(
            config.cors_origins,
            Some(vec!["https://a.example".to_string(), "https://b.example".to_string()])
        );
        assert_eq!(config.auth.access_lifetime.duration(), Duration::minutes(15));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut pairs = SECRETS.to_vec();
        pairs.push((PASSWORD_HASH_COST_ENV, "zero"));
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: PASSWORD_HASH_COST_ENV, .. }));

        let mut pairs = SECRETS.to_vec();
        pairs.push((JWT_REFRESH_EXPIRATION_ENV, "soon"));
        let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: JWT_REFRESH_EXPIRATION_ENV, .. }));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup(&SECRETS)).unwrap();
        let rendered = format!("{:?}", config.auth);
        assert!(!rendered.contains("\"access\""));
        assert!(rendered.contains("<redacted>"));
    }
}
