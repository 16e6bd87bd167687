use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use photosort_core::{CancellationToken, FailurePolicy, Notice, QuotaScope, SortControl, SortOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "photo-sort",
    version,
    about = "Sort photos and videos into YYYY/MM folders by their creation date"
)]
struct Cli {
    /// Directory containing the files to sort
    #[arg(short, long)]
    input: PathBuf,

    /// Root of the sorted YYYY/MM tree
    #[arg(short, long)]
    output: PathBuf,

    /// Maximum number of files to sort in one run
    #[arg(short, long = "max", default_value_t = 500)]
    max_files: usize,

    /// Executable to run from the output directory after sorting
    #[arg(short, long)]
    postscript: Option<PathBuf>,

    /// Print every directory creation and move
    #[arg(short, long)]
    verbose: bool,

    /// Report what would happen without touching any file
    #[arg(short, long)]
    dry_run: bool,

    /// Only count dated files against --max; undated files never stop the run
    #[arg(long)]
    count_valid_only: bool,

    /// Abort the whole run when a file cannot be hashed, instead of leaving it unsorted
    #[arg(long)]
    fail_fast: bool,

    /// Write the computed plan as JSON to this path
    #[arg(long)]
    plan_json: Option<PathBuf>,

    /// Worker threads per phase (default: available cores minus one)
    #[arg(short = 'j', long = "jobs")]
    workers: Option<usize>,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "photosort_core=debug,photo_sort=debug"
    } else {
        "photosort_core=info,photo_sort=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let t_total = std::time::Instant::now();

    let options = SortOptions {
        input: cli.input,
        output: cli.output,
        max_files: cli.max_files,
        postscript: cli.postscript,
        verbose: cli.verbose,
        dry_run: cli.dry_run,
        quota_scope: if cli.count_valid_only {
            QuotaScope::ValidOnly
        } else {
            QuotaScope::AllCandidates
        },
        failure_policy: if cli.fail_fast {
            FailurePolicy::CancelSiblings
        } else {
            FailurePolicy::Isolate
        },
        plan_json: cli.plan_json,
        workers: cli.workers,
    };

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling...");
        handler_token.cancel();
    })
    .context("Error setting Ctrl+C handler")?;

    let verbose = options.verbose;
    let control = SortControl::new().with_cancel_token(token);
    let result = photosort_core::sort_with_control(&options, &control, &|notice: &Notice| {
        if notice.is_error() {
            eprintln!("{}", notice);
        } else if verbose || matches!(notice, Notice::PlanReady { .. }) {
            println!("{}", notice);
        }
    })?;

    for warning in &result.warnings {
        eprintln!("Warning: {}", warning);
    }

    let verb = if options.dry_run { "would be" } else { "were" };
    eprintln!(
        "Done! {} of {} files planned ({} dated, {} unsorted): {} {} moved, {} already in place, {} failed ({:.2}s)",
        result.planned,
        result.candidates,
        result.dated,
        result.unsorted,
        result.moved,
        verb,
        result.deleted_sources,
        result.failed,
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
