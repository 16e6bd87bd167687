use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::media::PlannedMove;
use crate::SortOptions;

#[derive(Serialize)]
struct PlanEntry {
    source: String,
    destination: String,
    has_valid_date: bool,
}

#[derive(Serialize)]
struct PlanJson {
    generated_at: DateTime<Utc>,
    dry_run: bool,
    input: String,
    output: String,
    max_files: usize,
    total: usize,
    dated: usize,
    unsorted: usize,
    moves: Vec<PlanEntry>,
}

/// `path` relative to `root`, `/`-separated; unchanged if it lies elsewhere.
fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Write the planned moves as pretty JSON, sorted by source.
///
/// Sources are relative to the input root. Dated destinations are relative to
/// the output root, unsorted ones to the input root.
pub fn write_plan_json(moves: &[PlannedMove], options: &SortOptions, path: &Path) -> anyhow::Result<()> {
    let mut entries: Vec<PlanEntry> = moves
        .iter()
        .map(|m| PlanEntry {
            source: relative(&m.source, &options.input),
            destination: if m.has_valid_date {
                relative(&m.destination, &options.output)
            } else {
                relative(&m.destination, &options.input)
            },
            has_valid_date: m.has_valid_date,
        })
        .collect();
    entries.sort_by(|a, b| a.source.cmp(&b.source));

    let dated = entries.iter().filter(|e| e.has_valid_date).count();
    let json = PlanJson {
        generated_at: Utc::now(),
        dry_run: options.dry_run,
        input: options.input.to_string_lossy().into_owned(),
        output: options.output.to_string_lossy().into_owned(),
        max_files: options.max_files,
        total: entries.len(),
        dated,
        unsorted: entries.len() - dated,
        moves: entries,
    };

    let file = File::create(path)
        .with_context(|| format!("Could not create plan file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &json)
        .with_context(|| format!("Could not write plan file {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Could not write plan file {}", path.display()))?;

    Ok(())
}
