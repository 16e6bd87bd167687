use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, TimeZone, Timelike};

/// Holding area for files without a usable date, nested under the input root.
pub const UNSORTED_DIR: &str = "unsorted";

/// Lowercased text after the last `.` of the file name (the whole name if there is none).
fn extension(source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(dot) => name[dot + 1..].to_lowercase(),
        None => name.to_lowercase(),
    }
}

/// `YYYY-MM-DDTHHmmSS_<hash>.<ext>`
pub fn target_file_name<Tz: TimeZone>(source: &Path, date: &DateTime<Tz>, hash: &str) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}{:02}{:02}_{}.{}",
        date.year(),
        date.month(),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        hash,
        extension(source)
    )
}

/// `<output_root>/YYYY/MM/<target file name>`
pub fn target_path<Tz: TimeZone>(
    output_root: &Path,
    source: &Path,
    date: &DateTime<Tz>,
    hash: &str,
) -> PathBuf {
    output_root
        .join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
        .join(target_file_name(source, date, hash))
}

/// `<input_root>/unsorted/<original file name>`
pub fn unsorted_path(input_root: &Path, source: &Path) -> PathBuf {
    let name = source.file_name().unwrap_or(source.as_os_str());
    input_root.join(UNSORTED_DIR).join(name)
}
