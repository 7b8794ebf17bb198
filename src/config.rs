use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Server settings, read from the environment (and `.env`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Address both listeners bind to.
    pub host: Ipv4Addr,
    /// Port for WebSocket game connections.
    pub port: u16,
    /// Port for the HTTP health and status endpoints.
    pub api_port: u16,
    /// How often idle WebSocket connections are pinged.
    pub ping_interval: Duration,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is invalid: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED,
            port: 8080,
            api_port: 8081,
            ping_interval: Duration::from_secs(25),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any source of variables, falling back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let defaults = Self::default();
        let ping_secs = parse(&lookup, "PING_INTERVAL_SECS", defaults.ping_interval.as_secs())?;
        if ping_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "PING_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }
        Ok(Self {
            host: parse(&lookup, "HOST", defaults.host)?,
            port: parse(&lookup, "PORT", defaults.port)?,
            api_port: parse(&lookup, "API_PORT", defaults.api_port)?,
            ping_interval: Duration::from_secs(ping_secs),
        })
    }

    pub fn ws_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.host, self.port)
    }

    pub fn api_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.host, self.api_port)
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
