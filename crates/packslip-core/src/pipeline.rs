//! Run orchestration
//!
//! [`Pipeline::prepare`] performs the whole run in memory and returns a
//! [`PreparedRun`]. Nothing touches the filesystem until
//! [`PreparedRun::write_to`] commits all three outputs at once, so a run is
//! cancelled simply by dropping the prepared value.

use crate::config::Config;
use crate::error::{PackslipError, Result};
use crate::extract::PdfSource;
use crate::indexer::DocumentIndexer;
use crate::matcher::ProductMatcher;
use crate::reassemble::reassemble;
use crate::render::write_summaries;
use crate::sorter::Sorter;
use crate::summary::summarize;
use crate::table::LocationTable;
use crate::types::{
    LocationSummary, MatchResult, MatchedPage, PageRecord, SortedBatch, SourceDocument,
};
use crate::writer::{write_all_or_nothing, OutputFiles};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// A slip page the matcher could not resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmatchedPage {
    /// Zero-based slip page index
    pub page_index: u32,
    /// First item line on the page, if any
    pub hint: Option<String>,
}

/// Units per location, in picking order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationCount {
    /// `None` for the unmatched bucket
    pub location: Option<String>,
    pub units: usize,
}

/// What happened during a run, for the operator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub units: usize,
    pub matched: usize,
    pub samples: Vec<u32>,
    pub unmatched: Vec<UnmatchedPage>,
    /// Label pages with almost no text, likely blank or image-only
    pub blank_labels: Vec<u32>,
    pub per_location: Vec<LocationCount>,
}

impl RunReport {
    pub fn has_unmatched(&self) -> bool {
        !self.unmatched.is_empty()
    }
}

pub struct Pipeline {
    config: Config,
    table: LocationTable,
    generated_at: NaiveDateTime,
}

impl Pipeline {
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the configuration fails [`Config::validate`].
    pub fn new(config: Config, table: LocationTable) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            table,
            generated_at: Local::now().naive_local(),
        })
    }

    /// Fix the timestamp printed on summary pages
    pub fn with_generated_at(mut self, generated_at: NaiveDateTime) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn table(&self) -> &LocationTable {
        &self.table
    }

    /// Load both documents from disk and prepare a run
    pub fn prepare_files(&self, slips: &Path, labels: &Path) -> Result<PreparedRun> {
        let slips = PdfSource::load(slips)?;
        let labels = PdfSource::load(labels)?;
        self.prepare(slips, labels)
    }

    /// Match, pair, sort and render everything in memory
    pub fn prepare(&self, slips: PdfSource, labels: PdfSource) -> Result<PreparedRun> {
        if slips.page_count() == 0 {
            return Err(PackslipError::UnreadablePdf {
                document: slips.name().to_string(),
                page: None,
                reason: "document has no pages".into(),
            });
        }
        if slips.page_count() != labels.page_count() {
            return Err(PackslipError::PageCountMismatch {
                slips: slips.page_count(),
                labels: labels.page_count(),
            });
        }
        info!(
            slips = %slips.name(),
            labels = %labels.name(),
            pages = slips.page_count(),
            "Processing documents"
        );

        let mut report = RunReport::default();
        let matched = self.match_slips(&slips, &mut report);
        let label_pages = self.read_labels(&labels, &mut report);

        let indexer = match &self.config.pairing.correlation_pattern {
            Some(pattern) => DocumentIndexer::with_correlation(pattern)?,
            None => DocumentIndexer::new(),
        };
        let units = indexer.pair(matched, label_pages)?;

        let batch = Sorter::new(&self.config.locations.priority).sort(units);
        log_order(&batch);

        let summaries = summarize(&batch);
        report.units = batch.len();
        report.per_location = summaries
            .iter()
            .map(|s| LocationCount {
                location: s.location.clone(),
                units: s.total,
            })
            .collect();

        let (slips_pdf, labels_pdf) = reassemble(&slips, &labels, &batch)?;
        let summary_pdf = write_summaries(
            &summaries,
            &self.config.matching.sample_location,
            self.generated_at,
        )?;

        Ok(PreparedRun {
            batch,
            summaries,
            report,
            slips_pdf,
            labels_pdf,
            summary_pdf,
            file_names: [
                self.config.output.slips_file.clone(),
                self.config.output.labels_file.clone(),
                self.config.output.summary_file.clone(),
            ],
        })
    }

    fn match_slips(&self, slips: &PdfSource, report: &mut RunReport) -> Vec<MatchedPage> {
        let known = self.table.known_products();
        let matcher = ProductMatcher::new(&self.config.matching);
        let sample_location = &self.config.matching.sample_location;

        slips
            .pages()
            .map(|page| {
                let outcome = matcher.analyze(&page.text, &known);
                let mut record = PageRecord::new(SourceDocument::Slip, page.page_index, page.text);
                match &outcome.result {
                    MatchResult::Sample => {
                        info!(
                            page = record.page_number(),
                            item = outcome.product.as_deref().unwrap_or_default(),
                            location = %sample_location,
                            "Sample item"
                        );
                        record.resolved_location = Some(sample_location.clone());
                        report.samples.push(page.page_index);
                    }
                    MatchResult::Product(name) => {
                        record.resolved_location = self.table.lookup(name).map(str::to_string);
                        debug!(
                            page = record.page_number(),
                            product = %name,
                            location = record.resolved_location.as_deref().unwrap_or("-"),
                            variant = outcome.variant.as_deref().unwrap_or("-"),
                            quantity = outcome.quantity,
                            "Matched product"
                        );
                    }
                    MatchResult::Unmatched => {
                        warn!(
                            page = record.page_number(),
                            hint = outcome.hint.as_deref().unwrap_or("(none)"),
                            "No matching product in location table"
                        );
                        report.unmatched.push(UnmatchedPage {
                            page_index: page.page_index,
                            hint: outcome.hint.clone(),
                        });
                    }
                }
                if !outcome.result.is_unmatched() {
                    report.matched += 1;
                }
                record.resolved_product = outcome.product.clone();
                MatchedPage { record, outcome }
            })
            .collect()
    }

    fn read_labels(&self, labels: &PdfSource, report: &mut RunReport) -> Vec<PageRecord> {
        let threshold = self.config.labels.blank_threshold;
        labels
            .pages()
            .map(|page| {
                let chars = page.text.chars().filter(|c| !c.is_whitespace()).count();
                if chars < threshold {
                    warn!(
                        page = page.page_index + 1,
                        chars, "Shipping label page looks blank"
                    );
                    report.blank_labels.push(page.page_index);
                }
                PageRecord::new(SourceDocument::Label, page.page_index, page.text)
            })
            .collect()
    }
}

fn log_order(batch: &SortedBatch) {
    let mut current = None;
    for (unit, rank) in batch.iter() {
        if current != Some(rank) {
            info!(location = unit.location().unwrap_or("unmatched"), "Picking order");
            current = Some(rank);
        }
        info!(
            slip_page = unit.slip.page_number(),
            product = unit.product().or(unit.hint.as_deref()).unwrap_or("(unknown)"),
            variant = unit.variant.as_deref().unwrap_or("-"),
            quantity = unit.quantity,
            "  pick"
        );
    }
}

/// A finished run waiting to be written. Dropping it discards the run.
#[derive(Debug)]
pub struct PreparedRun {
    batch: SortedBatch,
    summaries: Vec<LocationSummary>,
    report: RunReport,
    slips_pdf: Vec<u8>,
    labels_pdf: Vec<u8>,
    summary_pdf: Vec<u8>,
    file_names: [String; 3],
}

impl PreparedRun {
    pub fn batch(&self) -> &SortedBatch {
        &self.batch
    }

    pub fn summaries(&self) -> &[LocationSummary] {
        &self.summaries
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn slips_pdf(&self) -> &[u8] {
        &self.slips_pdf
    }

    pub fn labels_pdf(&self) -> &[u8] {
        &self.labels_pdf
    }

    pub fn summary_pdf(&self) -> &[u8] {
        &self.summary_pdf
    }

    /// Write the three outputs into `dir`, all or nothing
    pub fn write_to(&self, dir: &Path) -> Result<OutputFiles> {
        let [slips, labels, summary] = &self.file_names;
        write_all_or_nothing(
            dir,
            &[
                (slips.as_str(), self.slips_pdf.as_slice()),
                (labels.as_str(), self.labels_pdf.as_slice()),
                (summary.as_str(), self.summary_pdf.as_slice()),
            ],
        )?;
        Ok(OutputFiles {
            slips: dir.join(slips),
            labels: dir.join(labels),
            summary: dir.join(summary),
        })
    }
}
