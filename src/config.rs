//! Startup configuration.
//!
//! Every value is read once when the process starts and handed to the worker
//! constructors. Nothing re-reads it afterwards.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Prefix for environment overrides, e.g. `RELAY_HTTP_PORT=8080`.
pub const ENV_PREFIX: &str = "RELAY";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RelayConfig {
    /// Document store connection string (a SQLite database path)
    #[serde(default = "default_store_uri")]
    pub store_uri: String,

    /// Directory holding the static documents
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    #[serde(default = "default_http_host")]
    pub http_host: IpAddr,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Host the consumer listens on and the router sends datagrams to
    #[serde(default = "default_socket_host")]
    pub socket_host: IpAddr,

    #[serde(default = "default_socket_port")]
    pub socket_port: u16,

    /// Receive buffer capacity; longer datagrams are truncated
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_store_uri() -> String {
    "messages.db".to_string()
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_http_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_http_port() -> u16 {
    3000
}

fn default_socket_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_socket_port() -> u16 {
    5000
}

fn default_buffer_size() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RelayConfig {
    /// Loads the configuration from `RELAY_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    /// Loads the configuration from an explicit variable map instead of the
    /// process environment. Keys use the same `RELAY_*` names.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, Error> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn from_environment(env: Environment) -> Result<Self, Error> {
        let config: Self = Config::builder()
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig("buffer_size must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http_host, self.http_port)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.socket_host, self.socket_port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            store_uri: default_store_uri(),
            base_dir: default_base_dir(),
            http_host: default_http_host(),
            http_port: default_http_port(),
            socket_host: default_socket_host(),
            socket_port: default_socket_port(),
            buffer_size: default_buffer_size(),
            log_level: default_log_level(),
        }
    }
}
