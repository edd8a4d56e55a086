//! Health check, shutdown and startup announcement bodies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of the request currently held by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    #[default]
    Idle,
    Validating,
    Building,
    Solving,
    Writing,
    Failed,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Building => "building",
            Self::Solving => "solving",
            Self::Writing => "writing",
            Self::Failed => "failed",
        }
    }

    /// Whether a request is in flight.
    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle | Self::Failed)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work counters since startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerStats {
    /// Requests handled, including failures and rejections.
    pub requests: u64,
    /// Models built from a specification.
    pub builds: u64,
    /// Models solved.
    pub solves: u64,
    /// Requests that reused the cached solved model.
    pub cache_hits: u64,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub pid: u32,
    pub state: WorkerState,
    #[serde(default)]
    pub stats: ServerStats,
}

/// Body of `POST /shutdown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutdownResponse {
    pub status: String,
    pub message: String,
}

/// Single JSON line written to stdout once the server accepts connections,
/// so a launcher can learn the bound port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyLine {
    pub service: String,
    pub version: String,
    pub host: String,
    pub port: u16,
    pub pid: u32,
}
