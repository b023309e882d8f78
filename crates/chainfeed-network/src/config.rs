use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    path::Path,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Where and how long to talk to the external listener.
///
/// Every field has a default, so a partial JSON document is enough:
/// `{"host": "10.0.0.5", "port": 9000}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Bound on the connect handshake.
    pub connect_timeout_ms: u64,
    /// Bound on the cumulative time of one receive call.
    pub recv_timeout_ms: u64,
    /// Longest single readiness wait inside a receive call.
    pub recv_wait_cap_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8080,
            connect_timeout_ms: 30_000,
            recv_timeout_ms: 30_000,
            recv_wait_cap_ms: 1_000,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&raw)?;
        debug!(path = ?path.as_ref(), ?config, "loaded client config");
        Ok(config)
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[inline]
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    #[inline]
    pub fn recv_wait_cap(&self) -> Duration {
        Duration::from_millis(self.recv_wait_cap_ms)
    }

    /// Resolves `host:port` into an [`Endpoint`].
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        Endpoint::resolve(&self.host, self.port)
    }
}

/// Remote listener: the configured host and port plus the socket address
/// they resolved to. `addr` is `None` when the host has no representation as
/// an IP socket address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    addr: Option<SocketAddr>,
}

impl Endpoint {
    pub fn new(addr: SocketAddr) -> Self {
        Self { host: addr.ip().to_string(), port: addr.port(), addr: Some(addr) }
    }

    pub fn unresolved<S: Into<String>>(host: S, port: u16) -> Self {
        Self { host: host.into(), port, addr: None }
    }

    /// Runs name resolution and keeps the first address returned.
    pub fn resolve(host: &str, port: u16) -> Result<Self, ConfigError> {
        let resolve_err =
            |source| ConfigError::Resolve { host: host.to_owned(), port, source };
        let addr = (host, port).to_socket_addrs().map_err(resolve_err)?.next().ok_or_else(|| {
            resolve_err(std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"))
        })?;
        Ok(Self { host: host.to_owned(), port, addr: Some(addr) })
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.addr
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
