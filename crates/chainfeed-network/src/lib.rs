//! Outbound TCP client used to push rendered transactions and blocks to an
//! external listener.
//!
//! The client only moves opaque bytes: producers hand it already serialised
//! buffers and consumers get raw bytes back. See [`tcp::TcpConnector`] for the
//! connect path and [`tcp::TcpSession`] for send/receive.

mod client;
mod config;
mod error;
pub mod tcp;

pub use client::PushClient;
pub use config::{ClientConfig, Endpoint};
pub use error::{ConfigError, ConnectError, ReceiveError};
