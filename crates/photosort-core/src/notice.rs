use std::fmt;
use std::path::PathBuf;

/// Discrete events emitted while planning and executing a sort run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Planning finished; execution is about to start.
    PlanReady {
        total: usize,
        dated: usize,
        unsorted: usize,
    },
    DirectoryCreated {
        path: PathBuf,
        dry_run: bool,
    },
    FileMoved {
        from: PathBuf,
        to: PathBuf,
        dry_run: bool,
    },
    /// The destination already existed, so the source was removed instead.
    SourceDeleted {
        source: PathBuf,
        existing: PathBuf,
        dry_run: bool,
    },
    HashFallback {
        path: PathBuf,
        error: String,
    },
    MetadataUnavailable {
        path: PathBuf,
        error: String,
    },
    NoCreationDate {
        path: PathBuf,
    },
    FileError {
        path: PathBuf,
        message: String,
    },
}

impl Notice {
    /// Error notices are kept apart from status notices by the presentation layer.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notice::HashFallback { .. }
                | Notice::MetadataUnavailable { .. }
                | Notice::NoCreationDate { .. }
                | Notice::FileError { .. }
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::PlanReady { total, .. } => write!(f, "Moving {} files.", total),
            Notice::DirectoryCreated { path, dry_run } => {
                let verb = if *dry_run { "Would create" } else { "Created" };
                write!(f, "{} directory [{}]", verb, path.display())
            }
            Notice::FileMoved { from, to, dry_run } => {
                let verb = if *dry_run { "Would move" } else { "Moved" };
                write!(f, "{} [{}] to [{}].", verb, from.display(), to.display())
            }
            Notice::SourceDeleted {
                source,
                existing,
                dry_run,
            } => {
                let verb = if *dry_run { "Would delete" } else { "Deleting" };
                write!(
                    f,
                    "Target file [{}] already exists. {} source [{}].",
                    existing.display(),
                    verb,
                    source.display()
                )
            }
            Notice::HashFallback { path, error } => write!(
                f,
                "XXHash32 failed for [{}]: {} - falling back to SHA1",
                path.display(),
                error
            ),
            Notice::MetadataUnavailable { path, error } => {
                write!(f, "Error reading metadata for [{}]: {}", path.display(), error)
            }
            Notice::NoCreationDate { path } => {
                write!(f, "No creation date information for [{}]", path.display())
            }
            Notice::FileError { path, message } => write!(f, "[{}]: {}", path.display(), message),
        }
    }
}

/// Type alias for the notice callback; the sink may borrow local state.
pub type NoticeSink<'a> = dyn Fn(&Notice) + Send + Sync + 'a;

/// A sink that drops every notice.
pub fn discard(_notice: &Notice) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let status = Notice::FileMoved {
            from: PathBuf::from("a.jpg"),
            to: PathBuf::from("b.jpg"),
            dry_run: true,
        };
        assert!(!status.is_error());
        assert_eq!(status.to_string(), "Would move [a.jpg] to [b.jpg].");

        let error = Notice::NoCreationDate {
            path: PathBuf::from("a.jpg"),
        };
        assert!(error.is_error());
    }

    fn emit(notices: &NoticeSink<'_>) {
        notices(&Notice::NoCreationDate {
            path: PathBuf::from("a.jpg"),
        });
    }

    #[test]
    fn test_sink_borrows_local_state() {
        let count = std::sync::atomic::AtomicUsize::new(0);
        let sink = |_: &Notice| {
            count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        };
        emit(&sink);
        emit(&sink);
        assert_eq!(count.into_inner(), 2);
    }
}
