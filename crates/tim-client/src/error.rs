//! Dispatcher error types.

use thiserror::Error;

/// Result type for dispatcher operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Availability and protocol faults seen by the client. Failures the server
/// reports in a [`ComputeResponse`](tim_protocol::ComputeResponse) are not
/// errors here; they are returned as the server's answer.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The health check failed; the request was not sent.
    #[error("compute server is not running at {url}: {reason}")]
    ServerNotRunning { url: String, reason: String },

    /// The server stopped answering while the request was in flight.
    #[error("compute server unreachable: {0}")]
    ServerUnreachable(String),

    /// The server is processing another request.
    #[error("compute server is busy: {0}")]
    ServerBusy(String),

    /// The server speaks an incompatible protocol version.
    #[error("compute server version {server} is incompatible with client version {client}")]
    VersionMismatch { server: String, client: String },

    /// The server answered with something that is not a protocol message.
    #[error("protocol error: {0}")]
    Protocol(String),
}
