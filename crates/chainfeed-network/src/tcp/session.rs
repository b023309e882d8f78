use std::{
    io::{self, Read, Write},
    net::SocketAddr,
    time::Duration,
};

use mio::Interest;
use tracing::{debug, warn};

use crate::{
    error::ReceiveError,
    tcp::readiness::{Deadline, ReadinessWait},
};

/// One connected, non-blocking TCP stream.
///
/// Bytes go out through [`send`](Self::send) as a single fire-and-forget
/// write and come back through [`receive_into`](Self::receive_into), which
/// keeps reading until the whole buffer is filled, the peer closes, or the
/// receive timeout elapses.
///
/// The stream is closed exactly once, on the first [`disconnect`] or on drop.
/// Not meant to be shared between threads without external locking.
///
/// [`disconnect`]: Self::disconnect
#[derive(Debug)]
pub struct TcpSession {
    /// `None` once disconnected.
    stream: Option<mio::net::TcpStream>,
    peer_addr: SocketAddr,
    /// Dropped together with the stream so no poller outlives it.
    waiter: Option<ReadinessWait>,
    recv_timeout: Duration,
    recv_wait_cap: Duration,
}

impl TcpSession {
    pub(crate) fn new(
        stream: mio::net::TcpStream,
        peer_addr: SocketAddr,
        waiter: ReadinessWait,
        recv_timeout: Duration,
        recv_wait_cap: Duration,
    ) -> Self {
        Self { stream: Some(stream), peer_addr, waiter: Some(waiter), recv_timeout, recv_wait_cap }
    }

    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    #[inline]
    pub fn recv_timeout(&self) -> Duration {
        self.recv_timeout
    }

    pub fn set_recv_timeout(&mut self, timeout: Duration) {
        self.recv_timeout = timeout;
    }

    /// Single non-blocking write of `data`. `true` if the kernel took at
    /// least one byte; partial writes are not retried.
    pub fn send(&mut self, data: &[u8]) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        match stream.write(data) {
            Ok(n) => n > 0,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                debug!(peer = ?self.peer_addr, len = data.len(), "tcp: send would block");
                false
            }
            Err(err) => {
                warn!(peer = ?self.peer_addr, ?err, "tcp: send failed");
                false
            }
        }
    }

    /// Fills all of `buf` or fails. The receive timeout bounds the whole
    /// call, not each read.
    pub fn receive_into(&mut self, buf: &mut [u8]) -> Result<(), ReceiveError> {
        let expected = buf.len();
        if expected > 0 && self.stream.is_none() {
            return Err(ReceiveError::NotSelectable("session is disconnected".into()));
        }
        let mut filled = 0;
        let deadline = Deadline::after(self.recv_timeout);

        while filled < expected && !deadline.expired() {
            let (Some(stream), Some(waiter)) = (self.stream.as_mut(), self.waiter.as_mut()) else {
                return Err(ReceiveError::NotSelectable("session is disconnected".into()));
            };
            match stream.read(&mut buf[filled..]) {
                Ok(0) => {
                    debug!(peer = ?self.peer_addr, filled, expected, "tcp: peer closed");
                    return Err(ReceiveError::PeerClosed { received: filled, expected });
                }
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if let Err(err) = waiter.arm(stream, Interest::READABLE) {
                        return Err(ReceiveError::NotSelectable(err.to_string()));
                    }
                    let wait = deadline.remaining().min(self.recv_wait_cap);
                    // no event just means loop around and re-check the deadline
                    waiter.wait(wait).map_err(ReceiveError::ReadinessWaitFailed)?;
                }
                Err(err) => {
                    debug!(peer = ?self.peer_addr, ?err, "tcp: read failed");
                    return Err(ReceiveError::ReadError(err));
                }
            }
        }

        if filled == expected {
            Ok(())
        } else {
            Err(ReceiveError::Timeout { received: filled, expected })
        }
    }

    /// Reads exactly `len` bytes into a new buffer.
    pub fn receive(&mut self, len: usize) -> Result<Vec<u8>, ReceiveError> {
        let mut buf = vec![0; len];
        self.receive_into(&mut buf)?;
        Ok(buf)
    }

    /// [`receive_into`](Self::receive_into) with every failure folded into
    /// `false`.
    pub fn recv(&mut self, buf: &mut [u8]) -> bool {
        self.receive_into(buf).is_ok()
    }

    /// Point-in-time probe: `true` if the socket shows no pending error.
    /// Reading the pending error clears it. A failed query counts as
    /// unhealthy, as does a disconnected session.
    pub fn state(&self) -> bool {
        let Some(stream) = self.stream.as_ref() else {
            return false;
        };
        matches!(stream.take_error(), Ok(None))
    }

    /// Closes the stream, and the poller used to wait on it, if still open.
    /// Always succeeds, also when already disconnected.
    pub fn disconnect(&mut self) -> bool {
        if let Some(mut stream) = self.stream.take() {
            debug!(peer = ?self.peer_addr, "terminating connection");
            if let Some(mut waiter) = self.waiter.take() {
                waiter.disarm(&mut stream);
            }
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        true
    }
}

impl Drop for TcpSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
