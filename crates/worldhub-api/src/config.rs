//! Server configuration read from the environment.

use std::net::SocketAddr;

use uuid::Uuid;
use worldhub_membership::domain::policy::InviteUsePolicy;

use crate::error::AppError;

/// Runtime configuration of the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Connection pool size.
    pub db_max_connections: u32,
    /// Per-connection outbound frame buffer.
    pub ws_send_buffer: usize,
    /// Whether repeat consumption by a joined member counts against the cap.
    pub invite_policy: InviteUsePolicy,
    /// Users holding the installation-wide admin role.
    pub system_admin_ids: Vec<Uuid>,
}

impl Config {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".into())
        })?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 3000)?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?;
        let ws_send_buffer = parse_or(&lookup, "WS_SEND_BUFFER", 64)?;
        let invite_policy = if parse_or(&lookup, "INVITE_COUNT_REPEAT_USE", false)? {
            InviteUsePolicy::EveryConsumption
        } else {
            InviteUsePolicy::FirstJoinOnly
        };
        let system_admin_ids = lookup("SYSTEM_ADMIN_IDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                id.parse::<Uuid>()
                    .map_err(|e| AppError::Config(format!("SYSTEM_ADMIN_IDS entry {id:?}: {e}")))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            database_url,
            host,
            port,
            db_max_connections,
            ws_send_buffer,
            invite_policy,
            system_admin_ids,
        })
    }

    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an unparsable `HOST:PORT` pair.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}
