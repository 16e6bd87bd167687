use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Instant;

use anyhow::anyhow;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;

/// What a failing unit of work does to its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Keep going; the failure is reported as an outcome.
    #[default]
    Isolate,
    /// Stop starting new work and fail the whole phase.
    CancelSiblings,
}

/// Result of one unit of work.
#[derive(Debug)]
pub enum Outcome<I, T> {
    Done(T),
    Failed { item: I, error: anyhow::Error },
}

enum Report<I, T> {
    Finished(Outcome<I, T>),
    Skipped,
    Panicked(String),
}

/// Available parallelism minus one, reserving a core for the orchestrating thread.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .saturating_sub(1)
        .max(1)
}

/// Fixed-size pool running one blocking unit of work per item, joined before returning.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_threads(default_worker_count())
    }

    pub fn with_threads(threads: usize) -> anyhow::Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("photosort-{}", i))
            .build()?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Submit `job` for each item from the calling thread, then wait for all of them.
    ///
    /// `keep_submitting` is asked after every submission with the number of
    /// items submitted so far; returning false stops enumeration. It runs
    /// concurrently with already submitted work, so any threshold it checks is soft.
    ///
    /// A panicking unit always cancels the units that have not started yet and
    /// fails the phase. An `Err` from `job` does the same under
    /// [`FailurePolicy::CancelSiblings`]; under [`FailurePolicy::Isolate`] it
    /// comes back as [`Outcome::Failed`].
    pub fn fan_out<It, I, T, K, F>(
        &self,
        phase: &str,
        items: It,
        policy: FailurePolicy,
        cancel: &CancellationToken,
        mut keep_submitting: K,
        job: F,
    ) -> anyhow::Result<Vec<Outcome<I, T>>>
    where
        It: IntoIterator<Item = I>,
        I: Send,
        T: Send,
        K: FnMut(usize) -> bool,
        F: Fn(&I) -> anyhow::Result<T> + Sync,
    {
        let started = Instant::now();
        let aborted = AtomicBool::new(false);
        let stop = || aborted.load(Ordering::SeqCst) || cancel.is_cancelled();
        let (tx, rx) = mpsc::channel::<Report<I, T>>();
        let mut submitted = 0usize;

        self.pool.in_place_scope(|scope| {
            for item in items {
                if stop() {
                    break;
                }
                let tx = tx.clone();
                let job = &job;
                let aborted = &aborted;
                let stop = &stop;
                scope.spawn(move |_| {
                    if stop() {
                        let _ = tx.send(Report::Skipped);
                        return;
                    }
                    let result = panic::catch_unwind(AssertUnwindSafe(|| job(&item)));
                    let report = match result {
                        Ok(Ok(value)) => Report::Finished(Outcome::Done(value)),
                        Ok(Err(error)) => {
                            if policy == FailurePolicy::CancelSiblings {
                                aborted.store(true, Ordering::SeqCst);
                            }
                            Report::Finished(Outcome::Failed { item, error })
                        }
                        Err(payload) => {
                            aborted.store(true, Ordering::SeqCst);
                            Report::Panicked(panic_message(payload.as_ref()))
                        }
                    };
                    let _ = tx.send(report);
                });
                submitted += 1;
                if !keep_submitting(submitted) {
                    break;
                }
            }
        });
        drop(tx);

        let mut outcomes = Vec::with_capacity(submitted);
        let mut fatal: Option<anyhow::Error> = None;
        let mut skipped = 0usize;
        for report in rx {
            match report {
                Report::Finished(Outcome::Failed { error, .. })
                    if policy == FailurePolicy::CancelSiblings =>
                {
                    fatal.get_or_insert(error);
                }
                Report::Finished(outcome) => outcomes.push(outcome),
                Report::Skipped => skipped += 1,
                Report::Panicked(message) => {
                    fatal.get_or_insert_with(|| anyhow!("{} worker panicked: {}", phase, message));
                }
            }
        }

        tracing::debug!(
            phase,
            submitted,
            skipped,
            workers = self.workers(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "phase joined"
        );

        if let Some(error) = fatal {
            return Err(error.context(format!("{} aborted", phase)));
        }
        cancel.check()?;
        Ok(outcomes)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
