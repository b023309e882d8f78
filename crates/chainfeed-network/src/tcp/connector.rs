use std::{io, net::SocketAddr, time::Duration};

use mio::Interest;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, warn};

use crate::{
    config::{ClientConfig, Endpoint},
    error::ConnectError,
    tcp::{
        TcpSession,
        readiness::{Deadline, ReadinessWait},
    },
};

/// Opens outbound TCP connections without ever blocking the caller past a
/// configured timeout.
///
/// Each [`connect`](Self::connect) is a single attempt:
/// 1) create a stream socket for the endpoint's address family
/// 2) disable Nagle (and `SIGPIPE` where the platform has a socket option for
///    it), best effort
/// 3) switch to non-blocking mode
/// 4) issue `connect()` and, if it's in progress, wait for writability up to
///    the connect timeout, then check the socket's pending error
///
/// The socket is closed on every failure path. Reconnecting is left to the
/// caller.
#[derive(Clone, Copy, Debug)]
pub struct TcpConnector {
    connect_timeout: Duration,
    recv_timeout: Duration,
    recv_wait_cap: Duration,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl TcpConnector {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            recv_timeout: config.recv_timeout(),
            recv_wait_cap: config.recv_wait_cap(),
        }
    }

    /// Bound on the connect handshake.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound on the cumulative time of one [`TcpSession::receive_into`] call
    /// for sessions created by this connector.
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Longest single readiness wait inside a receive call. The receive loop
    /// re-checks its deadline at least this often.
    pub fn with_recv_wait_cap(mut self, cap: Duration) -> Self {
        self.recv_wait_cap = cap;
        self
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Connects and wraps the stream in a [`TcpSession`].
    pub fn connect(&self, endpoint: &Endpoint) -> Result<TcpSession, ConnectError> {
        let (addr, mut waiter) = prepare(endpoint)?;
        let stream = self.connect_with(addr, &mut waiter)?;
        debug!(%endpoint, "connected");
        Ok(TcpSession::new(stream, addr, waiter, self.recv_timeout, self.recv_wait_cap))
    }

    /// Connects and hands back the bare non-blocking stream.
    pub fn connect_stream(
        &self,
        endpoint: &Endpoint,
    ) -> Result<mio::net::TcpStream, ConnectError> {
        let (addr, mut waiter) = prepare(endpoint)?;
        self.connect_with(addr, &mut waiter)
    }

    fn connect_with(
        &self,
        addr: SocketAddr,
        waiter: &mut ReadinessWait,
    ) -> Result<mio::net::TcpStream, ConnectError> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(|source| ConnectError::SocketCreateFailed { addr, source })?;

        apply_socket_options(&socket, addr);

        socket
            .set_nonblocking(true)
            .map_err(|source| ConnectError::NonBlockingSetupFailed { addr, source })?;

        let pending = match socket.connect(&SockAddr::from(addr)) {
            Ok(()) => false,
            Err(e) if is_in_progress(&e) => true,
            Err(e) if is_already_connected(&e) => false,
            Err(source) => {
                warn!(?addr, err = %source, "connect() failed");
                return Err(ConnectError::ConnectFailed { addr, source });
            }
        };

        // on any error below `stream` is dropped, which closes the descriptor
        let mut stream = mio::net::TcpStream::from_std(socket.into());
        if pending {
            self.await_established(&mut stream, addr, waiter)?;
        }
        Ok(stream)
    }

    fn await_established(
        &self,
        stream: &mut mio::net::TcpStream,
        addr: SocketAddr,
        waiter: &mut ReadinessWait,
    ) -> Result<(), ConnectError> {
        let wait_err = |source| ConnectError::ReadinessWaitFailed { addr, source };

        waiter.arm(stream, Interest::WRITABLE).map_err(wait_err)?;
        let deadline = Deadline::after(self.connect_timeout);
        loop {
            match waiter.wait(deadline.remaining()) {
                Ok(true) => break,
                Ok(false) if deadline.expired() => {
                    debug!(?addr, timeout = ?self.connect_timeout, "connection timeout");
                    return Err(ConnectError::ConnectTimeout { addr, timeout: self.connect_timeout });
                }
                Ok(false) => {}
                Err(source) => {
                    warn!(?addr, err = %source, "readiness wait failed");
                    return Err(wait_err(source));
                }
            }
        }
        waiter.disarm(stream);

        match stream.take_error() {
            Ok(None) => Ok(()),
            Ok(Some(source)) => {
                warn!(?addr, err = %source, "connect() failed after wait");
                Err(ConnectError::ConnectRefused { addr, source })
            }
            Err(source) => {
                warn!(?addr, err = %source, "couldn't take error on stream");
                Err(ConnectError::ConnectFailed { addr, source })
            }
        }
    }
}

fn prepare(endpoint: &Endpoint) -> Result<(SocketAddr, ReadinessWait), ConnectError> {
    let addr = endpoint
        .socket_addr()
        .ok_or_else(|| ConnectError::UnsupportedAddress(endpoint.to_string()))?;
    let waiter = ReadinessWait::new()
        .map_err(|source| ConnectError::ReadinessWaitFailed { addr, source })?;
    Ok((addr, waiter))
}

fn apply_socket_options(socket: &Socket, addr: SocketAddr) {
    if let Err(err) = socket.set_tcp_nodelay(true) {
        warn!(?addr, %err, "couldn't disable nagle");
    }
    #[cfg(target_vendor = "apple")]
    {
        if let Err(err) = socket.set_nosigpipe(true) {
            warn!(?addr, %err, "couldn't disable SIGPIPE");
        }
    }
}

#[cfg(unix)]
fn is_in_progress(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EINPROGRESS) || err.kind() == io::ErrorKind::WouldBlock
}

#[cfg(not(unix))]
fn is_in_progress(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
}

#[cfg(unix)]
fn is_already_connected(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EISCONN)
}

#[cfg(not(unix))]
fn is_already_connected(_err: &io::Error) -> bool {
    false
}
