//! All-or-nothing output writing
//!
//! Every file of a run is staged as a temp file in the target directory,
//! synced, and only then renamed into place. A failed rename removes the
//! outputs this run already committed.

use crate::error::{PackslipError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Paths written by a processing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub slips: PathBuf,
    pub labels: PathBuf,
    pub summary: PathBuf,
}

/// Write each `(file_name, bytes)` into `dir`, all or nothing.
pub fn write_all_or_nothing(dir: &Path, files: &[(&str, &[u8])]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| PackslipError::io(dir, e))?;

    let mut staged = Vec::with_capacity(files.len());
    for (name, bytes) in files {
        let target = dir.join(name);
        let temp = stage(dir, bytes).map_err(|e| PackslipError::io(&target, e))?;
        staged.push((temp, target));
    }

    let mut committed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (temp, target) in staged {
        if let Err(e) = temp.persist(&target) {
            for path in &committed {
                if let Err(cleanup) = fs::remove_file(path) {
                    warn!(path = %path.display(), error = %cleanup, "Failed to remove partial output");
                }
            }
            return Err(PackslipError::io(&target, e.error));
        }
        info!(path = %target.display(), "Wrote output");
        committed.push(target);
    }
    Ok(committed)
}

/// Write a single file atomically
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PackslipError::Operation(format!("invalid file name: {}", path.display())))?;
    write_all_or_nothing(dir, &[(name, bytes)])?;
    Ok(())
}

fn stage(dir: &Path, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut temp = tempfile::Builder::new()
        .prefix(".packslip-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    Ok(temp)
}
