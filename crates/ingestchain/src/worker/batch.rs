use std::path::Path;

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::WorkerError;

/// Extensions of files read as a list of locators, one per line.
pub const LIST_EXTENSIONS: &[&str] = &["csv", "lst"];

/// Expands a batch argument into locators.
///
/// A directory yields its regular files (top level only, sorted by name). A
/// `.csv` or `.lst` file yields one locator per non-blank line. Anything
/// else, URLs and `.txt` documents included, is a single locator.
pub fn collect_inputs(argument: &str) -> Result<Vec<String>, WorkerError> {
    let path = Path::new(argument);

    if path.is_dir() {
        return scan_directory(path);
    }

    let is_list = path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| LIST_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
    if is_list {
        return read_list(path);
    }

    Ok(vec![argument.to_string()])
}

fn scan_directory(dir: &Path) -> Result<Vec<String>, WorkerError> {
    let mut inputs = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1) // Only the top level
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| WorkerError::ScanFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        debug!("Found input: {}", entry.path().display());
        inputs.push(entry.path().to_string_lossy().to_string());
    }

    info!("Scanned {} inputs in {}", inputs.len(), dir.display());
    Ok(inputs)
}

/// Reads `path` as a locator list whatever its extension.
pub fn read_list(path: &Path) -> Result<Vec<String>, WorkerError> {
    let content = std::fs::read_to_string(path).map_err(|e| WorkerError::ReadList {
        path: path.to_path_buf(),
        source: e,
    })?;

    let inputs: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    info!("Read {} inputs from {}", inputs.len(), path.display());
    Ok(inputs)
}
