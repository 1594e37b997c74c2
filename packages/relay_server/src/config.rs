//! Environment configuration for the relay server.

use std::{num::ParseIntError, str::FromStr};

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_MAX_THREADS: usize = 64;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "https://chess-play-seven.vercel.app";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {name} value '{value}': {source}")]
    InvalidInt {
        name: String,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Web origins permitted to call the HTTP API or open a WebSocket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parses a comma separated origin list. `*` anywhere in the list allows
    /// any origin.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let origins = value
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();

        if origins.iter().any(|origin| origin == "*") {
            Self::Any
        } else {
            Self::List(origins)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub actix_workers: Option<usize>,
    pub max_threads: usize,
    pub allowed_origins: AllowedOrigins,
}

impl ServerConfig {
    /// Reads the configuration from the process arguments and environment.
    ///
    /// A port given as the first argument takes precedence over `PORT`.
    ///
    /// # Errors
    ///
    /// * If a numeric setting fails to parse
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::args().nth(1), |name| std::env::var(name).ok())
    }

    /// # Errors
    ///
    /// * If a numeric setting fails to parse
    pub fn from_vars(
        port_arg: Option<String>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let port = match port_arg {
            Some(port) => parse("port argument", &port)?,
            None => option_env_parse(&var, "PORT")?.unwrap_or(DEFAULT_PORT),
        };

        Ok(Self {
            bind_addr: default_env(&var, "BIND_ADDR", DEFAULT_BIND_ADDR),
            port,
            actix_workers: option_env_parse(&var, "ACTIX_WORKERS")?,
            max_threads: option_env_parse(&var, "MAX_THREADS")?.unwrap_or(DEFAULT_MAX_THREADS),
            allowed_origins: AllowedOrigins::parse(&default_env(
                &var,
                "ALLOWED_ORIGINS",
                DEFAULT_ALLOWED_ORIGIN,
            )),
        })
    }
}

fn default_env(var: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    var(name).unwrap_or_else(|| default.to_string())
}

fn option_env_parse<T: FromStr<Err = ParseIntError>>(
    var: impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    var(name).map(|value| parse(name, &value)).transpose()
}

fn parse<T: FromStr<Err = ParseIntError>>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|source| ConfigError::InvalidInt {
        name: name.to_string(),
        value: value.to_string(),
        source,
    })
}
