use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::cancel::CancellationToken;
use crate::media::PlannedMove;
use crate::notice::{Notice, NoticeSink};
use crate::pool::{FailurePolicy, Outcome, WorkerPool};

/// What happened to one planned move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Source and destination are the same path.
    Unchanged,
    Moved,
    /// The destination already existed; the source was removed.
    SourceDeleted,
    /// Left in place after a create, delete or rename failure.
    Failed,
}

/// Tally of an execution phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MoveStats {
    pub moved: usize,
    pub deleted_sources: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl MoveStats {
    fn record(&mut self, outcome: MoveOutcome) {
        match outcome {
            MoveOutcome::Unchanged => self.unchanged += 1,
            MoveOutcome::Moved => self.moved += 1,
            MoveOutcome::SourceDeleted => self.deleted_sources += 1,
            MoveOutcome::Failed => self.failed += 1,
        }
    }
}

#[cfg(windows)]
const CROSS_DEVICE: i32 = 17; // ERROR_NOT_SAME_DEVICE
#[cfg(not(windows))]
const CROSS_DEVICE: i32 = 18; // EXDEV

fn is_cross_device(e: &io::Error) -> bool {
    e.raw_os_error() == Some(CROSS_DEVICE)
}

/// Rename `source` to `destination`, copying and then removing the source when
/// they live on different filesystems.
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    move_file_with(source, destination, |from, to| fs::rename(from, to))
}

fn move_file_with<R>(source: &Path, destination: &Path, rename: R) -> io::Result<()>
where
    R: FnOnce(&Path, &Path) -> io::Result<()>,
{
    match rename(source, destination) {
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(src = %source.display(), "rename crosses devices, copying");
            if let Err(copy_err) = fs::copy(source, destination) {
                let _ = fs::remove_file(destination);
                return Err(copy_err);
            }
            fs::remove_file(source)
        }
        result => result,
    }
}

fn file_error(notices: &NoticeSink<'_>, path: &Path, message: String) -> MoveOutcome {
    tracing::warn!(path = %path.display(), "{}", message);
    notices(&Notice::FileError {
        path: path.to_path_buf(),
        message,
    });
    MoveOutcome::Failed
}

/// Apply one planned move. Never fails: problems are reported through `notices`
/// and the source stays where it was.
pub fn execute_move(planned: &PlannedMove, dry_run: bool, notices: &NoticeSink<'_>) -> MoveOutcome {
    let source = &planned.source;
    let destination = &planned.destination;

    if planned.is_noop() {
        return MoveOutcome::Unchanged;
    }

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            if !dry_run {
                if let Err(e) = fs::create_dir_all(parent) {
                    return file_error(
                        notices,
                        source,
                        format!("Could not create directory [{}]: {}", parent.display(), e),
                    );
                }
            }
            notices(&Notice::DirectoryCreated {
                path: parent.to_path_buf(),
                dry_run,
            });
        }
    }

    if destination.exists() {
        if !dry_run {
            if let Err(e) = fs::remove_file(source) {
                return file_error(
                    notices,
                    source,
                    format!("Could not delete source [{}]: {}", source.display(), e),
                );
            }
        }
        notices(&Notice::SourceDeleted {
            source: source.clone(),
            existing: destination.clone(),
            dry_run,
        });
        return MoveOutcome::SourceDeleted;
    }

    if !dry_run {
        if let Err(e) = move_file(source, destination) {
            return file_error(
                notices,
                source,
                format!("Could not move to [{}]: {}", destination.display(), e),
            );
        }
    }
    notices(&Notice::FileMoved {
        from: source.clone(),
        to: destination.clone(),
        dry_run,
    });
    MoveOutcome::Moved
}

/// Execution phase: apply every planned move concurrently and tally the outcomes.
pub fn execute_moves(
    moves: Vec<PlannedMove>,
    dry_run: bool,
    pool: &WorkerPool,
    cancel: &CancellationToken,
    notices: &NoticeSink<'_>,
) -> anyhow::Result<MoveStats> {
    let outcomes = pool.fan_out(
        "execution",
        moves,
        FailurePolicy::Isolate,
        cancel,
        |_| true,
        |planned| Ok(execute_move(planned, dry_run, notices)),
    )?;

    let mut stats = MoveStats::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Done(outcome) => stats.record(outcome),
            Outcome::Failed { .. } => stats.record(MoveOutcome::Failed),
        }
    }
    tracing::debug!(?stats, dry_run, "execution finished");
    Ok(stats)
}
