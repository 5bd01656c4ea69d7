use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

use crate::services::profile::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/tickets";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CATEGORY_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub storage: StorageBackend,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub profile_page_size: i64,
    pub category_cache_ttl: Duration,
    /// Admin routes are disabled when unset.
    pub admin_token: Option<String>,
    pub cors_allowed_origins: String,
    /// `RUST_ENV=production`; turns on HSTS.
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unparsable values fall
    /// back to their defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let page_size: i64 = parse_or(&lookup, "PROFILE_PAGE_SIZE", DEFAULT_PAGE_SIZE);

        Self {
            database_url: parsed("DATABASE_URL", DEFAULT_DATABASE_URL),
            storage: parse_or(&lookup, "TICKETS_STORAGE", StorageBackend::Postgres),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)
                .max(1),
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3001))),
            profile_page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            category_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "CATEGORY_CACHE_TTL_SECS",
                DEFAULT_CATEGORY_CACHE_TTL_SECS,
            )),
            admin_token: lookup("ADMIN_TOKEN")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            cors_allowed_origins: parsed("CORS_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS),
            production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(e) => {
                warn!("Config: invalid {}='{}' ({}), using default", key, raw, e);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.bind_addr.port(), 3001);
        assert_eq!(config.profile_page_size, 2);
        assert_eq!(config.category_cache_ttl, Duration::from_secs(60));
        assert!(config.admin_token.is_none());
        assert!(!config.production);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TICKETS_STORAGE", "Memory"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("PROFILE_PAGE_SIZE", "10"),
            ("CATEGORY_CACHE_TTL_SECS", "0"),
            ("ADMIN_TOKEN", " s3cret "),
            ("RUST_ENV", "Production"),
        ]);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.profile_page_size, 10);
        assert_eq!(config.category_cache_ttl, Duration::ZERO);
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
        assert!(config.production);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("TICKETS_STORAGE", "redis"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
            ("PROFILE_PAGE_SIZE", "100000"),
            ("ADMIN_TOKEN", "   "),
        ]);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.profile_page_size, MAX_PAGE_SIZE);
        assert!(config.admin_token.is_none());
    }
}
