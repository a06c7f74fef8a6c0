//! Packing slip sorting
//!
//! Resolves each packing slip page to a warehouse location through a
//! product/location table, then reorders the slips and their shipping
//! labels into picking order and renders a per-location pick summary.
//!
//! The stages can be used on their own or driven end to end by
//! [`Pipeline`]:
//! - [`table`]: the product to location table (CSV)
//! - [`extract`]: per-page text of a PDF
//! - [`matcher`]: product, sample and variant detection
//! - [`indexer`]: slip/label pairing
//! - [`sorter`] and [`summary`]: picking order and per-location counts
//! - [`reassemble`], [`render`] and [`writer`]: the output documents

pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod indexer;
pub mod matcher;
pub mod pipeline;
pub mod reassemble;
pub mod render;
pub mod sorter;
pub mod summary;
pub mod table;
pub mod types;
pub mod writer;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{PackslipError, Result};
pub use extract::{extract, PageText, PdfSource};
pub use indexer::DocumentIndexer;
pub use matcher::{KnownProducts, ProductMatcher};
pub use pipeline::{Pipeline, PreparedRun, RunReport, UnmatchedPage};
pub use reassemble::{reassemble, reorder_pages};
pub use render::write_summaries;
pub use sorter::{sort, Sorter};
pub use summary::summarize;
pub use table::{LocationEntry, LocationTable};
pub use types::{
    LocationRank, LocationSummary, MatchResult, OrderUnit, PageRecord, SortedBatch, SourceDocument,
    SummaryLine,
};
pub use writer::OutputFiles;
