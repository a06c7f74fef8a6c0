use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackslipError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed location table {}{}: {reason}", .path.display(), .line.map(|l| format!(" (line {})", l)).unwrap_or_default())]
    MalformedTable {
        path: PathBuf,
        line: Option<u64>,
        reason: String,
    },

    #[error("Unreadable PDF '{document}'{}: {reason}", .page.map(|p| format!(" (page {})", p)).unwrap_or_default())]
    UnreadablePdf {
        document: String,
        page: Option<u32>,
        reason: String,
    },

    #[error("Page count mismatch: {slips} packing slip pages vs {labels} shipping label pages")]
    PageCountMismatch { slips: usize, labels: usize },

    #[error("Slip and label disagree at position {}: slip '{slip_key}' vs label '{label_key}'", .position + 1)]
    CorrelationMismatch {
        position: usize,
        slip_key: String,
        label_key: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),
}

impl PackslipError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackslipError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PackslipError::Io { .. } => "io",
            PackslipError::MalformedTable { .. } => "malformed_table",
            PackslipError::UnreadablePdf { .. } => "unreadable_pdf",
            PackslipError::PageCountMismatch { .. } => "page_count_mismatch",
            PackslipError::CorrelationMismatch { .. } => "correlation_mismatch",
            PackslipError::InvalidConfig(_) => "invalid_config",
            PackslipError::Operation(_) => "operation",
        }
    }
}

pub type Result<T> = std::result::Result<T, PackslipError>;
