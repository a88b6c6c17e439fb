use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use common_auth::JwtConfig;

const DEFAULT_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: IpAddr,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub jwt: JwtConfig,
    pub docs_path: PathBuf,
    pub request_timeout: Duration,
    pub cors_allowed_origins: Vec<String>,
    pub admin: Option<AdminBootstrap>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).and_then(|value| normalize_optional(&value));

        let host = var("HOST")
            .unwrap_or_else(|| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("HOST must be an IP address")?;
        let port = parse_or("PORT", var("PORT"), 8080u16)?;

        let store_backend = match var("STORE_BACKEND").map(|v| v.to_ascii_lowercase()).as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("Unsupported STORE_BACKEND '{other}'. Use postgres or memory."),
        };
        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }
        let database_max_connections =
            parse_or("DATABASE_MAX_CONNECTIONS", var("DATABASE_MAX_CONNECTIONS"), 5u32)?;

        let jwt_secret = var("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;
        let issuer = var("JWT_ISSUER").unwrap_or_else(|| "restaurant-service".to_string());
        let audience = var("JWT_AUDIENCE").unwrap_or_else(|| "restaurant-clients".to_string());
        let ttl = parse_or("JWT_TTL_SECONDS", var("JWT_TTL_SECONDS"), 86_400i64)?;
        if ttl <= 0 {
            bail!("JWT_TTL_SECONDS must be positive");
        }
        let leeway = parse_or("JWT_LEEWAY_SECONDS", var("JWT_LEEWAY_SECONDS"), 30u32)?;
        let jwt = JwtConfig::new(issuer, audience).with_leeway(leeway).with_ttl(ttl);

        let docs_path = PathBuf::from(var("DOCS_PATH").unwrap_or_else(|| "docs/index.html".to_string()));
        let timeout_secs = parse_or("REQUEST_TIMEOUT_SECONDS", var("REQUEST_TIMEOUT_SECONDS"), 10u64)?;

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|value| parse_list(&value))
            .unwrap_or_else(|| DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect());

        let admin = match (var("ADMIN_USERNAME"), lookup("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) if !password.is_empty() => {
                Some(AdminBootstrap { username, password })
            }
            (Some(_), _) => bail!("ADMIN_PASSWORD must be set together with ADMIN_USERNAME"),
            _ => None,
        };

        Ok(ServiceConfig {
            host,
            port,
            store_backend,
            database_url,
            database_max_connections,
            jwt_secret,
            jwt,
            docs_path,
            request_timeout: Duration::from_secs(timeout_secs),
            cors_allowed_origins,
            admin,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|err| anyhow!("Failed to parse {key} '{raw}': {err}")),
        None => Ok(default),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
