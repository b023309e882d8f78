use std::{io, net::SocketAddr, time::Duration};

use thiserror::Error;

/// Failures of a single connect attempt. The socket, if one was created, is
/// already closed when any of these is returned.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("cannot connect to {0}: unsupported network")]
    UnsupportedAddress(String),
    #[error("couldn't create socket for {addr}: {source}")]
    SocketCreateFailed { addr: SocketAddr, source: io::Error },
    #[error("setting socket for {addr} to non-blocking failed: {source}")]
    NonBlockingSetupFailed { addr: SocketAddr, source: io::Error },
    #[error("connection to {addr} timeout after {timeout:?}")]
    ConnectTimeout { addr: SocketAddr, timeout: Duration },
    #[error("connect() to {addr} failed after wait: {source}")]
    ConnectRefused { addr: SocketAddr, source: io::Error },
    #[error("connect() to {addr} failed: {source}")]
    ConnectFailed { addr: SocketAddr, source: io::Error },
    #[error("readiness wait for {addr} failed: {source}")]
    ReadinessWaitFailed { addr: SocketAddr, source: io::Error },
}

impl ConnectError {
    /// Underlying OS error code, if the failure came from the OS.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::UnsupportedAddress(_) | Self::ConnectTimeout { .. } => None,
            Self::SocketCreateFailed { source, .. } |
            Self::NonBlockingSetupFailed { source, .. } |
            Self::ConnectRefused { source, .. } |
            Self::ConnectFailed { source, .. } |
            Self::ReadinessWaitFailed { source, .. } => source.raw_os_error(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. })
    }
}

/// Failures of a single receive call. `received` is how many bytes of the
/// requested length had already been written into the caller's buffer.
#[derive(Error, Debug)]
pub enum ReceiveError {
    #[error("peer closed after {received} of {expected} bytes")]
    PeerClosed { received: usize, expected: usize },
    #[error("timeout after {received} of {expected} bytes")]
    Timeout { received: usize, expected: usize },
    #[error("socket can't be waited on: {0}")]
    NotSelectable(String),
    #[error("read failed: {0}")]
    ReadError(#[source] io::Error),
    #[error("readiness wait failed: {0}")]
    ReadinessWaitFailed(#[source] io::Error),
}

impl ReceiveError {
    pub fn received(&self) -> usize {
        match self {
            Self::PeerClosed { received, .. } | Self::Timeout { received, .. } => *received,
            _ => 0,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("couldn't read config: {0}")]
    Io(#[from] io::Error),
    #[error("couldn't parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("couldn't resolve {host}:{port}: {source}")]
    Resolve { host: String, port: u16, source: io::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_code_follows_source() {
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let refused = ConnectError::ConnectRefused {
            addr,
            source: io::Error::from_raw_os_error(libc::ECONNREFUSED),
        };
        assert_eq!(refused.os_code(), Some(libc::ECONNREFUSED));
        assert!(!refused.is_timeout());

        let timeout = ConnectError::ConnectTimeout { addr, timeout: Duration::from_millis(5) };
        assert_eq!(timeout.os_code(), None);
        assert!(timeout.is_timeout());
    }

    #[test]
    fn received_counts() {
        assert_eq!(ReceiveError::PeerClosed { received: 3, expected: 8 }.received(), 3);
        assert_eq!(ReceiveError::NotSelectable("gone".into()).received(), 0);
    }
}
