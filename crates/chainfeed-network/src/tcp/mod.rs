mod connector;
mod readiness;
mod session;

pub use connector::TcpConnector;
pub use readiness::Deadline;
pub use session::TcpSession;

const STREAM: mio::Token = mio::Token(0);
