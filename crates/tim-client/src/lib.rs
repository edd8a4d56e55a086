//! Client side of the compute server protocol.
//!
//! [`Dispatcher::send`] checks the server health first and fails fast with
//! [`DispatchError::ServerNotRunning`] if that check fails, so a
//! launcher can start the server and try again. No request is ever retried.

pub mod dispatcher;
pub mod error;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{DispatchError, DispatchResult};
