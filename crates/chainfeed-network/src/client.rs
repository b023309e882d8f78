use tracing::{debug, warn};

use crate::{
    config::ClientConfig,
    tcp::{TcpConnector, TcpSession},
};

/// Pushes rendered chain data to the configured listener over at most one
/// session at a time.
///
/// Thin convenience layer over [`TcpConnector`] and [`TcpSession`]: every
/// call reports success as a `bool` and a missing session is just a failure.
/// One connect attempt per [`connect`](Self::connect), reconnect policy is up
/// to the caller.
pub struct PushClient {
    config: ClientConfig,
    connector: TcpConnector,
    session: Option<TcpSession>,
}

impl PushClient {
    pub fn new(config: ClientConfig) -> Self {
        let connector = TcpConnector::from_config(&config);
        Self { config, connector, session: None }
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolves the configured endpoint and connects, closing any previous
    /// session first.
    pub fn connect(&mut self) -> bool {
        self.disconnect();

        let endpoint = match self.config.endpoint() {
            Ok(endpoint) => endpoint,
            Err(err) => {
                warn!(%err, "push client: couldn't resolve endpoint");
                return false;
            }
        };
        match self.connector.connect(&endpoint) {
            Ok(session) => {
                self.session = Some(session);
                true
            }
            Err(err) => {
                warn!(%endpoint, %err, "push client: connect failed");
                false
            }
        }
    }

    pub fn send(&mut self, data: &[u8]) -> bool {
        self.session.as_mut().is_some_and(|s| s.send(data))
    }

    pub fn recv(&mut self, buf: &mut [u8]) -> bool {
        self.session.as_mut().is_some_and(|s| s.recv(buf))
    }

    pub fn state(&self) -> bool {
        self.session.as_ref().is_some_and(TcpSession::state)
    }

    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(TcpSession::is_connected)
    }

    pub fn session_mut(&mut self) -> Option<&mut TcpSession> {
        self.session.as_mut()
    }

    pub fn disconnect(&mut self) -> bool {
        if let Some(mut session) = self.session.take() {
            debug!(peer = ?session.peer_addr(), "push client: disconnecting");
            session.disconnect();
        }
        true
    }
}

impl Default for PushClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}
