//! Compute server library.
//!
//! The binary in `main.rs` wires configuration and logging around
//! [`ComputeServer`]; tests drive the same server on an ephemeral port.

pub mod cache;
pub mod compute;
pub mod config;
pub mod error;
pub mod server;

pub use cache::SolveCache;
pub use compute::{output_path, script_path, Counters, Outcome, Worker};
pub use config::{ConfigError, ServeArgs, ServerConfig};
pub use error::{ComputeError, ComputeResult};
pub use server::{build_router, ComputeServer, ServerState};
