use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context};

/// Run the post-run script with no arguments, from `working_dir` when it exists.
pub fn run_postscript(script: &Path, working_dir: &Path) -> anyhow::Result<()> {
    let mut command = Command::new(script);
    if working_dir.is_dir() {
        command.current_dir(working_dir);
    }

    tracing::debug!(script = %script.display(), cwd = %working_dir.display(), "running postscript");
    let output = command
        .output()
        .with_context(|| format!("Could not run postscript {}", script.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "Postscript {} exited with {:?}: {}",
            script.display(),
            output.status.code(),
            stderr.trim()
        );
    }
    Ok(())
}
