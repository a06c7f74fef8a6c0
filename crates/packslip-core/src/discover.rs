//! Shipping label discovery
//!
//! Labels are usually downloaded right next to the packing slips. When no
//! label document is given, the slip's directory is searched for a PDF
//! saved around the same time with the same number of pages.

use crate::error::{PackslipError, Result};
use crate::extract::PdfSource;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// How far apart the slip and label modification times may be
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Find the label document for `slip_path` using [`DEFAULT_WINDOW`]
pub fn find_matching_labels(slip_path: &Path) -> Result<Option<PathBuf>> {
    find_matching_labels_within(slip_path, DEFAULT_WINDOW)
}

/// Find the PDF next to `slip_path` that was modified within `window` of
/// it and has the same page count. The closest modification time wins.
pub fn find_matching_labels_within(slip_path: &Path, window: Duration) -> Result<Option<PathBuf>> {
    let slip_modified = modified(slip_path)?;
    let slip_pages = PdfSource::load(slip_path)?.page_count();
    let dir = match slip_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let slip_name = slip_path.file_name();

    let entries = fs::read_dir(dir).map_err(|e| PackslipError::io(dir, e))?;
    let mut best: Option<(Duration, PathBuf)> = None;

    for entry in entries {
        let path = entry.map_err(|e| PackslipError::io(dir, e))?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf || path.file_name() == slip_name || !path.is_file() {
            continue;
        }

        let Ok(candidate_modified) = modified(&path) else {
            continue;
        };
        let gap = distance(slip_modified, candidate_modified);
        if gap > window {
            continue;
        }

        let pages = match PdfSource::load(&path) {
            Ok(source) => source.page_count(),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping unreadable candidate");
                continue;
            }
        };
        if pages != slip_pages {
            debug!(path = %path.display(), pages, slip_pages, "Page count differs");
            continue;
        }

        let closer = match &best {
            Some((best_gap, best_path)) => (gap, &path) < (*best_gap, best_path),
            None => true,
        };
        if closer {
            best = Some((gap, path));
        }
    }

    if let Some((_, path)) = &best {
        debug!(path = %path.display(), "Found matching labels");
    }
    Ok(best.map(|(_, path)| path))
}

fn modified(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| PackslipError::io(path, e))
}

fn distance(a: SystemTime, b: SystemTime) -> Duration {
    a.duration_since(b)
        .or_else(|_| b.duration_since(a))
        .unwrap_or_default()
}
