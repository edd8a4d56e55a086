//! The compute worker: one request at a time through
//! `Validating → Building → Solving → Writing`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use grid_writer::{OverwritePolicy, ResultWriter, WriteError};
use solver::{SolvedModel, Solver};
use tim_common::{GridSpec, DEFAULT_MAX_CELLS};
use tim_model::{build, extract, observations, to_script, translate, ModelSpecification};
use tim_protocol::{ComputeRequest, Mode, ObservationHead, ServerStats, WorkerState};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::cache::SolveCache;
use crate::error::{ComputeError, ComputeResult};

/// Work counters, readable without the worker lock.
#[derive(Debug, Default)]
pub struct Counters {
    requests: AtomicU64,
    builds: AtomicU64,
    solves: AtomicU64,
    cache_hits: AtomicU64,
}

impl Counters {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            requests: self.requests.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            solves: self.solves.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

/// Output store of a compute request: `<dir>/<stem>-<cellsize>.zarr` with
/// the decimal point of the cellsize replaced by `_`.
pub fn output_path(dataset: &Path, cellsize: f64) -> PathBuf {
    let stem = dataset
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    let cellsize = format!("{:?}", cellsize).replace('.', "_");
    dataset.with_file_name(format!("{}-{}.zarr", stem, cellsize))
}

/// Output script of a script-export request: `<dir>/<stem>.py`.
pub fn script_path(dataset: &Path) -> PathBuf {
    dataset.with_extension("py")
}

/// What a successful request produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub path: PathBuf,
    /// Empty for script exports.
    pub observations: Vec<ObservationHead>,
}

/// Heads of every observation point of `spec`.
fn sample_observations(
    spec: &ModelSpecification,
    model: &dyn SolvedModel,
) -> ComputeResult<Vec<ObservationHead>> {
    let points = observations(spec)?;
    Ok(points
        .into_iter()
        .map(|point| ObservationHead {
            heads: model
                .head(point.x, point.y)
                .into_iter()
                .map(|h| h.is_finite().then_some(h))
                .collect(),
            label: point.label,
            x: point.x,
            y: point.y,
        })
        .collect())
}

/// Owns everything a request mutates. Callers hold it behind a
/// `tokio::sync::Mutex`; whoever holds the lock is the only request in
/// flight.
pub struct Worker {
    solver: Arc<dyn Solver>,
    writer: ResultWriter,
    cache: SolveCache,
    state: watch::Sender<WorkerState>,
    counters: Arc<Counters>,
    max_cells: usize,
    overwrite: OverwritePolicy,
}

impl Worker {
    pub fn new(
        solver: Arc<dyn Solver>,
        writer: ResultWriter,
        state: watch::Sender<WorkerState>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            solver,
            writer,
            cache: SolveCache::new(),
            state,
            counters,
            max_cells: DEFAULT_MAX_CELLS,
            overwrite: OverwritePolicy::Replace,
        }
    }

    /// Limit on output values (cells times aquifers) per request.
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells;
        self
    }

    /// What happens to an existing result store or script. Defaults to
    /// replacing it.
    pub fn with_overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    fn enter(&self, state: WorkerState) {
        debug!(state = %state, "Worker state");
        self.state.send_replace(state);
    }

    /// Serve one request. The worker is back in `Idle` when this returns,
    /// whatever the outcome.
    #[instrument(skip_all, fields(path = %request.path, cellsize = request.cellsize, mode = ?request.mode))]
    pub async fn handle(&mut self, request: &ComputeRequest) -> ComputeResult<Outcome> {
        let result = self.run(request).await;
        if let Err(e) = &result {
            warn!(kind = %e.kind(), error = %e, "Request failed");
            self.enter(WorkerState::Failed);
        }
        self.enter(WorkerState::Idle);
        result
    }

    async fn run(&mut self, request: &ComputeRequest) -> ComputeResult<Outcome> {
        self.enter(WorkerState::Validating);
        let dataset = PathBuf::from(&request.path);
        let spec = self.validate(&dataset, request.cellsize).await?;

        match request.mode {
            Mode::ScriptExport => {
                let path = self.export_script(&dataset, &spec).await?;
                Ok(Outcome {
                    path,
                    observations: Vec::new(),
                })
            }
            Mode::Compute => {
                // Sized before solving so an oversized grid is rejected cheaply.
                let per_layer = self.max_cells / spec.aquifer().naq().max(1);
                let grid =
                    GridSpec::from_extent_with_limit(&spec.domain(), spec.cellsize(), per_layer)?;
                let model = self.solved_model(&spec).await?;
                let observations = sample_observations(&spec, model.as_ref())?;
                let path = self.write(&dataset, &spec, grid, model).await?;
                Ok(Outcome { path, observations })
            }
        }
    }

    async fn validate(&self, dataset: &Path, cellsize: f64) -> ComputeResult<ModelSpecification> {
        if !cellsize.is_finite() || cellsize <= 0.0 {
            return Err(ComputeError::InvalidRequest(format!(
                "cellsize must be finite and positive, got {}",
                cellsize
            )));
        }
        let tables = extract(dataset).await?;
        let spec = build(tables, cellsize)?;
        info!(
            fingerprint = %spec.fingerprint(),
            model_fingerprint = %spec.model_fingerprint(),
            naq = spec.aquifer().naq(),
            "Model specification built"
        );
        Ok(spec)
    }

    /// Cached model for `spec`, or a freshly built and solved one.
    async fn solved_model(&mut self, spec: &ModelSpecification) -> ComputeResult<Arc<dyn SolvedModel>> {
        let key = spec.model_fingerprint();
        if let Some(model) = self.cache.get(key) {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            info!(key = %key, generation = self.cache.generation(), "Reusing solved model");
            return Ok(model);
        }

        self.enter(WorkerState::Building);
        let elements = translate(spec)?;
        self.counters.builds.fetch_add(1, Ordering::Relaxed);
        debug!(elements = elements.len(), "Translated elements");

        self.enter(WorkerState::Solving);
        let solver = self.solver.clone();
        let aquifer = spec.aquifer().clone();
        let model = tokio::task::spawn_blocking(move || solver.build(&aquifer, &elements))
            .await
            .map_err(|e| ComputeError::Internal(format!("solver task failed: {}", e)))??;
        self.counters.solves.fetch_add(1, Ordering::Relaxed);

        let model: Arc<dyn SolvedModel> = Arc::from(model);
        let generation = self.cache.insert(key, model.clone());
        info!(solver = self.solver.name(), generation, "Model solved");
        Ok(model)
    }

    async fn write(
        &mut self,
        dataset: &Path,
        spec: &ModelSpecification,
        grid: GridSpec,
        model: Arc<dyn SolvedModel>,
    ) -> ComputeResult<PathBuf> {
        self.enter(WorkerState::Writing);
        let crs = spec.crs().clone();
        let destination = output_path(dataset, spec.cellsize());
        let writer = self.writer.clone();
        let policy = self.overwrite;

        let path = tokio::task::spawn_blocking(move || {
            let result = model.head_grid(&grid, &crs);
            writer.write(&result, &destination, policy)
        })
        .await
        .map_err(|e| ComputeError::Internal(format!("writer task failed: {}", e)))??;

        info!(output = %path.display(), "Result written");
        Ok(path)
    }

    async fn export_script(&mut self, dataset: &Path, spec: &ModelSpecification) -> ComputeResult<PathBuf> {
        let elements = translate(spec)?;
        let script = to_script(spec, &elements);

        self.enter(WorkerState::Writing);
        let path = script_path(dataset);
        if tokio::fs::try_exists(&path).await.map_err(WriteError::Io)? {
            match self.overwrite {
                OverwritePolicy::Fail => return Err(WriteError::AlreadyExists(path).into()),
                OverwritePolicy::Replace => {
                    debug!(path = %path.display(), "Replacing existing script");
                }
            }
        }
        tokio::fs::write(&path, script).await.map_err(WriteError::Io)?;

        info!(output = %path.display(), elements = elements.len(), "Script exported");
        Ok(path)
    }
}
