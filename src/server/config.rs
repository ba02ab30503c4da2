//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::ConfigError;
use crate::hub::HubConfig;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable overriding the listening port
pub const ENV_PORT: &str = "PORT";
/// Environment variable overriding the bind host
pub const ENV_BIND: &str = "HUB_BIND";
/// Environment variable overriding the connection limit
pub const ENV_MAX_CONNECTIONS: &str = "HUB_MAX_CONNECTIONS";
/// Environment variable overriding the per-member send timeout, in milliseconds
pub const ENV_SEND_TIMEOUT_MS: &str = "HUB_SEND_TIMEOUT_MS";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent WebSocket connections (0 = unlimited)
    pub max_connections: usize,

    /// Hub settings
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            max_connections: 0, // Unlimited
            hub: HubConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Build a config from the process environment
    ///
    /// Unset variables keep their defaults; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_BIND) {
            let ip = parse(ENV_BIND, &host)?;
            config.bind_addr.set_ip(ip);
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.bind_addr.set_port(parse(ENV_PORT, &port)?);
        }
        if let Some(max) = lookup(ENV_MAX_CONNECTIONS) {
            config.max_connections = parse(ENV_MAX_CONNECTIONS, &max)?;
        }
        if let Some(ms) = lookup(ENV_SEND_TIMEOUT_MS) {
            let ms: u64 = parse(ENV_SEND_TIMEOUT_MS, &ms)?;
            config.hub = config.hub.send_timeout(Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set hub settings
    pub fn hub(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError {
        key,
        value: value.to_string(),
    })
}
