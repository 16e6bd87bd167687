use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::date;
use crate::hash;
use crate::media::{self, MediaCandidate, PlannedMove};
use crate::metadata::MetadataReader;
use crate::notice::{Notice, NoticeSink};
use crate::pool::{Outcome, WorkerPool};
use crate::target;
use crate::SortOptions;

/// Which files count against `max_files` when deciding to stop enumerating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuotaScope {
    /// Stop after `max_files` candidates were submitted, dated or not.
    #[default]
    AllCandidates,
    /// Stop only once `max_files` files resolved a date. Undated files are free.
    ValidOnly,
}

/// Shared between planning units; only consulted to stop enumeration.
#[derive(Debug, Default)]
pub struct PlanCounters {
    valid: AtomicUsize,
    processed: AtomicUsize,
}

impl PlanCounters {
    pub fn valid(&self) -> usize {
        self.valid.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }
}

/// Every planned move of a run, in no particular order.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub moves: Vec<PlannedMove>,
    /// Candidates found in the input directory, submitted or not.
    pub candidates: usize,
    /// Files whose date resolved, as counted by the racy counter.
    pub resolved: usize,
    /// Planning units that finished without error.
    pub processed: usize,
}

impl Plan {
    pub fn dated(&self) -> usize {
        self.moves.iter().filter(|m| m.has_valid_date).count()
    }

    pub fn unsorted(&self) -> usize {
        self.moves.len() - self.dated()
    }
}

/// Regular files with a supported extension directly inside `input`, by name.
pub fn list_candidates(input: &Path, notices: &NoticeSink<'_>) -> anyhow::Result<Vec<MediaCandidate>> {
    let entries = fs::read_dir(input)
        .with_context(|| format!("Could not list files in {}", input.display()))?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                notices(&Notice::FileError {
                    path: input.to_path_buf(),
                    message: format!("Could not read directory entry: {}", e),
                });
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && media::is_media_file(&path) {
            candidates.push(MediaCandidate::new(path));
        }
    }
    candidates.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(candidates)
}

/// Collection phase: decide a destination for every candidate, concurrently.
pub fn plan_moves(
    options: &SortOptions,
    pool: &WorkerPool,
    cancel: &CancellationToken,
    reader: &MetadataReader,
    notices: &NoticeSink<'_>,
) -> anyhow::Result<Plan> {
    let candidates = list_candidates(&options.input, notices)?;
    let total = candidates.len();
    let counters = PlanCounters::default();
    let max = options.max_files;

    tracing::debug!(candidates = total, max, quota = ?options.quota_scope, "planning");

    let outcomes = pool.fan_out(
        "planning",
        candidates,
        options.failure_policy,
        cancel,
        |submitted| {
            // Racy on purpose: units still running may push `valid` past `max`.
            let valid_left = counters.valid() < max;
            match options.quota_scope {
                QuotaScope::AllCandidates => valid_left && submitted < max,
                QuotaScope::ValidOnly => valid_left,
            }
        },
        |candidate| plan_candidate(candidate, options, &counters, reader, notices),
    )?;

    let moves = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Outcome::Done(planned) => planned,
            Outcome::Failed { item, error } => {
                tracing::warn!(file = %item.filename, "planning failed, leaving unsorted: {:#}", error);
                notices(&Notice::FileError {
                    path: item.path.clone(),
                    message: format!("{:#}", error),
                });
                PlannedMove::unsorted(
                    item.path.clone(),
                    target::unsorted_path(&options.input, &item.path),
                )
            }
        })
        .collect();

    tracing::debug!(
        candidates = total,
        valid = counters.valid(),
        processed = counters.processed(),
        "planning finished"
    );

    Ok(Plan {
        moves,
        candidates: total,
        resolved: counters.valid(),
        processed: counters.processed(),
    })
}

/// Plan a single file: dated destination if its metadata yields a date,
/// unsorted otherwise. Only a total hash failure is an error.
fn plan_candidate(
    candidate: &MediaCandidate,
    options: &SortOptions,
    counters: &PlanCounters,
    reader: &MetadataReader,
    notices: &NoticeSink<'_>,
) -> anyhow::Result<PlannedMove> {
    let path = &candidate.path;
    let unsorted = || PlannedMove::unsorted(path.clone(), target::unsorted_path(&options.input, path));

    let planned = match reader(path) {
        Ok(metadata) => match date::resolve_creation_date(&metadata) {
            Some(resolved) => {
                counters.valid.fetch_add(1, Ordering::SeqCst);
                let hash = hash::hash_file(path, notices)?;
                tracing::debug!(
                    file = %candidate.filename,
                    source = ?resolved.source,
                    zone = ?resolved.zone,
                    "resolved creation date {}",
                    resolved.timestamp
                );
                PlannedMove::dated(
                    path.clone(),
                    target::target_path(&options.output, path, &resolved.timestamp, &hash),
                )
            }
            None => {
                notices(&Notice::NoCreationDate { path: path.clone() });
                unsorted()
            }
        },
        Err(e) => {
            notices(&Notice::MetadataUnavailable {
                path: path.clone(),
                error: e.to_string(),
            });
            unsorted()
        }
    };

    counters.processed.fetch_add(1, Ordering::SeqCst);
    Ok(planned)
}
