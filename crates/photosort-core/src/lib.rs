pub mod cancel;
pub mod date;
pub mod error;
pub mod hash;
pub mod hook;
pub mod media;
pub mod metadata;
pub mod mover;
pub mod notice;
pub mod plan_json;
pub mod planner;
pub mod pool;
pub mod target;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

fn default_max_files() -> usize {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortOptions {
    /// Directory whose top-level media files are sorted. Also hosts `unsorted/`.
    pub input: PathBuf,
    /// Root of the `YYYY/MM/` tree.
    pub output: PathBuf,
    /// Soft cap on files per run, see [`QuotaScope`].
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Executable run after a live (non dry) run, from the output directory.
    #[serde(default)]
    pub postscript: Option<PathBuf>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub quota_scope: QuotaScope,
    /// What a file that cannot be hashed does to the planning phase.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Where to export the computed plan as JSON.
    #[serde(default)]
    pub plan_json: Option<PathBuf>,
    /// Worker threads per phase; defaults to available parallelism minus one.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl SortOptions {
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Self {
            input,
            output,
            max_files: default_max_files(),
            postscript: None,
            verbose: false,
            dry_run: false,
            quota_scope: QuotaScope::default(),
            failure_policy: FailurePolicy::default(),
            plan_json: None,
            workers: None,
        }
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SortResult {
    /// Media files found in the input directory.
    pub candidates: u64,
    /// Files that got a planned move (bounded by the quota).
    pub planned: u64,
    pub dated: u64,
    pub unsorted: u64,
    pub moved: u64,
    /// Sources removed because their destination already existed.
    pub deleted_sources: u64,
    pub unchanged: u64,
    pub failed: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Control options for a run (cancellation, metadata source).
#[derive(Clone, Default)]
pub struct SortControl {
    /// Cancellation token for Ctrl-C support.
    pub cancel_token: Option<CancellationToken>,
    /// Replaces [`metadata::read_metadata`], mostly for tests.
    pub metadata_reader: Option<Arc<MetadataReader>>,
}

impl SortControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn with_metadata_reader(mut self, reader: Arc<MetadataReader>) -> Self {
        self.metadata_reader = Some(reader);
        self
    }
}

pub use cancel::{CancellationToken, CancelledError};
pub use media::PlannedMove;
pub use metadata::MetadataReader;
pub use mover::{MoveOutcome, MoveStats};
pub use notice::{Notice, NoticeSink};
pub use planner::{Plan, QuotaScope};
pub use pool::FailurePolicy;

/// Sort the input directory: plan every move, then apply the plan.
pub fn sort(options: &SortOptions, notices: &NoticeSink<'_>) -> anyhow::Result<SortResult> {
    sort_with_control(options, &SortControl::default(), notices)
}

/// Sort the input directory with cancellation and an optional metadata source.
pub fn sort_with_control(
    options: &SortOptions,
    control: &SortControl,
    notices: &NoticeSink<'_>,
) -> anyhow::Result<SortResult> {
    let started = Instant::now();
    if options.max_files == 0 {
        bail!("max_files must be at least 1");
    }

    let cancel = control.cancel_token.clone().unwrap_or_default();
    cancel.check()?;

    let pool = match options.workers {
        Some(n) => pool::WorkerPool::with_threads(n),
        None => pool::WorkerPool::new(),
    }
    .context("Could not start worker pool")?;

    let reader: &MetadataReader = match &control.metadata_reader {
        Some(reader) => reader.as_ref(),
        None => &metadata::read_metadata,
    };

    // Stage 1: plan
    let plan = planner::plan_moves(options, &pool, &cancel, reader, notices)?;
    let (dated, unsorted) = (plan.dated(), plan.unsorted());
    notices(&Notice::PlanReady {
        total: plan.moves.len(),
        dated,
        unsorted,
    });

    if let Some(ref path) = options.plan_json {
        plan_json::write_plan_json(&plan.moves, options, path)?;
    }

    // Nothing is touched if cancelled between the phases.
    cancel.check()?;

    // Stage 2: execute
    let planned = plan.moves.len();
    let stats = mover::execute_moves(plan.moves, options.dry_run, &pool, &cancel, notices)?;

    let mut warnings = Vec::new();
    if let Some(ref script) = options.postscript {
        if options.dry_run {
            tracing::info!(script = %script.display(), "dry run, skipping postscript");
        } else if let Err(e) = hook::run_postscript(script, &options.output) {
            tracing::warn!("{:#}", e);
            warnings.push(format!("{:#}", e));
        }
    }

    tracing::debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        workers = pool.workers(),
        "sort finished"
    );

    Ok(SortResult {
        candidates: plan.candidates as u64,
        planned: planned as u64,
        dated: dated as u64,
        unsorted: unsorted as u64,
        moved: stats.moved as u64,
        deleted_sources: stats.deleted_sources as u64,
        unchanged: stats.unchanged as u64,
        failed: stats.failed as u64,
        warnings,
    })
}
