//! HTTP front of the compute server.
//!
//! Provides endpoints for:
//! - `POST /compute` - Serve a compute request
//! - `GET /health` - Liveness, version and worker state
//! - `POST /shutdown` - Stop after the request in flight

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use grid_writer::ResultWriter;
use solver::Solver;
use tim_protocol::{
    ComputeRequest, ComputeResponse, HealthResponse, ReadyLine, ShutdownResponse, WorkerState,
    COMPUTE_PATH, HEALTH_PATH, PROTOCOL_VERSION, SERVICE_NAME, SHUTDOWN_PATH,
};
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex, Notify};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::compute::{Counters, Worker};
use crate::config::ServerConfig;
use crate::error::ComputeError;

/// Shared state for the HTTP server.
pub struct ServerState {
    /// The single worker; `try_lock` failure means busy.
    pub worker: Arc<Mutex<Worker>>,
    /// Current worker stage.
    pub state: watch::Receiver<WorkerState>,
    pub counters: Arc<Counters>,
    pub shutdown: Arc<Notify>,
}

impl ServerState {
    pub fn new(config: &ServerConfig, solver: Arc<dyn Solver>) -> Self {
        let (state_tx, state_rx) = watch::channel(WorkerState::Idle);
        let counters = Arc::new(Counters::default());
        let worker = Worker::new(
            solver,
            ResultWriter::new(config.output.clone()),
            state_tx,
            counters.clone(),
        )
        .with_max_cells(config.max_cells);

        Self {
            worker: Arc::new(Mutex::new(worker)),
            state: state_rx,
            counters,
            shutdown: Arc::new(Notify::new()),
        }
    }

    fn worker_state(&self) -> WorkerState {
        *self.state.borrow()
    }
}

fn failure(err: ComputeError) -> (StatusCode, Json<ComputeResponse>) {
    (err.status_code(), Json(err.to_response()))
}

/// POST /compute - Serve a compute request
async fn compute_handler(
    Extension(state): Extension<Arc<ServerState>>,
    Json(request): Json<ComputeRequest>,
) -> impl IntoResponse {
    let id = Uuid::new_v4().to_string();
    state.counters.record_request();

    info!(
        id = %id,
        path = %request.path,
        cellsize = request.cellsize,
        mode = ?request.mode,
        "Received compute request"
    );

    let mut worker = match state.worker.clone().try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            let current = state.worker_state();
            warn!(id = %id, state = %current, "Rejecting request, worker busy");
            return failure(ComputeError::Busy(current));
        }
    };

    // Run detached so a dropped connection does not abort the request.
    let task = tokio::spawn(async move { worker.handle(&request).await });

    match task.await {
        Ok(Ok(outcome)) => {
            let path = outcome.path.display().to_string();
            info!(
                id = %id,
                output = %path,
                observations = outcome.observations.len(),
                "Request completed"
            );
            let response = ComputeResponse::success(format!("Wrote {}", path), path)
                .with_observations(outcome.observations);
            (StatusCode::OK, Json(response))
        }
        Ok(Err(e)) => {
            error!(id = %id, kind = %e.kind(), error = %e, "Request failed");
            failure(e)
        }
        Err(e) => {
            error!(id = %id, error = %e, "Request task panicked");
            failure(ComputeError::Internal(e.to_string()))
        }
    }
}

/// GET /health - Liveness and version check
async fn health_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: PROTOCOL_VERSION.to_string(),
        pid: std::process::id(),
        state: state.worker_state(),
        stats: state.counters.snapshot(),
    })
}

/// POST /shutdown - Graceful stop
async fn shutdown_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    info!("Shutdown requested");
    state.shutdown.notify_one();
    Json(ShutdownResponse {
        status: "ok".to_string(),
        message: "shutting down".to_string(),
    })
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(COMPUTE_PATH, post(compute_handler))
        .route(HEALTH_PATH, get(health_handler))
        .route(SHUTDOWN_PATH, post(shutdown_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

/// A bound, not yet running, compute server.
pub struct ComputeServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl ComputeServer {
    /// Bind the configured address.
    pub async fn bind(config: &ServerConfig, solver: Arc<dyn Solver>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr()).await?;
        let state = Arc::new(ServerState::new(config, solver));
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Startup announcement for the launcher.
    pub fn ready_line(&self) -> std::io::Result<ReadyLine> {
        let addr = self.local_addr()?;
        Ok(ReadyLine {
            service: SERVICE_NAME.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            host: addr.ip().to_string(),
            port: addr.port(),
            pid: std::process::id(),
        })
    }

    /// Serve until `/shutdown` is called or the process is interrupted.
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.local_addr()?;
        let shutdown = self.state.shutdown.clone();
        let app = build_router(self.state);

        info!(address = %addr, "Starting compute server");
        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown.notified() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
                info!("Compute server stopping");
            })
            .await
    }
}
