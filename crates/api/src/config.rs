//! Process configuration, read once at startup.

use std::time::Duration;

use thiserror::Error;

use warden_auth::token::{DEFAULT_EXPIRATION_HOURS, DEFAULT_ISSUER, MAX_EXPIRATION_HOURS};
use warden_auth::user::DEFAULT_ROLE;
use warden_auth::TokenConfig;
use warden_infra::db::DbConfig;
use warden_observability::LogFormat;

const DEV_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a non-empty value in production")]
    MissingSecret,

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Immutable service configuration. Built once and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub token: TokenConfig,
    pub default_role: String,
    pub api_prefix: String,
    pub health_path: String,
    /// `None` selects the in-memory stores.
    pub database: Option<DbConfig>,
    pub seed_defaults: bool,
}

impl AppConfig {
    /// Load from the process environment (after an optional `.env` file).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = lookup("ENV").unwrap_or_else(|| "development".to_string());
        let production = is_production(&env);

        let secret = match lookup("JWT_SECRET") {
            Some(s) if !s.is_empty() => s,
            _ if production => return Err(ConfigError::MissingSecret),
            Some(_) => {
                tracing::warn!("JWT_SECRET is empty; token issuance and validation are disabled");
                String::new()
            }
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_SECRET.to_string()
            }
        };

        let expiration_hours = parse(&lookup, "JWT_EXPIRATION_HOURS", DEFAULT_EXPIRATION_HOURS)?;
        if !(1..=MAX_EXPIRATION_HOURS).contains(&expiration_hours) {
            return Err(ConfigError::Invalid {
                name: "JWT_EXPIRATION_HOURS",
                value: expiration_hours.to_string(),
            });
        }
        let token = TokenConfig::new(secret)
            .with_expiration_hours(expiration_hours)
            .with_issuer(lookup("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string()));

        let database = match lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            Some(url) => {
                let mut db = DbConfig::new(url);
                db.max_connections = parse(&lookup, "DB_MAX_OPEN_CONNS", db.max_connections)?;
                db.min_connections = parse(&lookup, "DB_MIN_CONNS", db.min_connections)?;
                db.max_lifetime = Duration::from_secs(parse(
                    &lookup,
                    "DB_CONN_MAX_LIFETIME_SECS",
                    db.max_lifetime.as_secs(),
                )?);
                Some(db)
            }
            None => None,
        };

        // Routes are nested under the prefix, so it must be a non-root path.
        let raw_prefix = lookup("API_PREFIX").unwrap_or_else(|| "/api/v1".to_string());
        let api_prefix = raw_prefix.trim().trim_end_matches('/').to_string();
        if !api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: "API_PREFIX",
                value: raw_prefix,
            });
        }
        // The health route is mounted at exactly this path and never audited.
        let health_path = match lookup("HEALTH_PATH") {
            None => format!("{api_prefix}/health"),
            Some(raw) => {
                let path = raw.trim().trim_end_matches('/').to_string();
                if !path.starts_with('/') {
                    return Err(ConfigError::Invalid {
                        name: "HEALTH_PATH",
                        value: raw,
                    });
                }
                path
            }
        };

        Ok(Self {
            env,
            port: parse(&lookup, "PORT", 8080)?,
            token,
            default_role: lookup("DEFAULT_ROLE").unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            api_prefix,
            health_path,
            database,
            seed_defaults: parse(&lookup, "SEED_DEFAULTS", true)?,
        })
    }

    pub fn is_production(&self) -> bool {
        is_production(&self.env)
    }
}

/// `LOG_FORMAT` from the environment; JSON unless it names another format.
pub fn log_format_from_env() -> LogFormat {
    std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

fn is_production(env: &str) -> bool {
    matches!(env.to_ascii_lowercase().as_str(), "production" | "prod")
}

fn parse<T: core::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
