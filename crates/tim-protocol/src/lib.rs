//! Compute server wire protocol.
//!
//! JSON bodies over HTTP/1.1 on a localhost socket:
//! - `POST /compute` with a [`ComputeRequest`], answered by a [`ComputeResponse`]
//! - `GET /health`, answered by a [`HealthResponse`]
//! - `POST /shutdown`, answered by a [`ShutdownResponse`]
//!
//! Unknown fields are ignored on both sides so either end can grow fields
//! without breaking the other.

pub mod compute;
pub mod health;
pub mod version;

pub use compute::{
    ComputeRequest, ComputeResponse, ErrorKind, Mode, ObservationHead, ResponseStatus,
};
pub use health::{HealthResponse, ReadyLine, ServerStats, ShutdownResponse, WorkerState};
pub use version::{is_compatible, Version, VersionError, PROTOCOL_VERSION};

/// Route of the compute operation.
pub const COMPUTE_PATH: &str = "/compute";

/// Route of the liveness and version check.
pub const HEALTH_PATH: &str = "/health";

/// Route of the graceful shutdown request.
pub const SHUTDOWN_PATH: &str = "/shutdown";

/// Service name reported by the server.
pub const SERVICE_NAME: &str = "tim-server";
