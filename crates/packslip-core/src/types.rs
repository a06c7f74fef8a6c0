//! Page, unit and batch types shared by the pipeline stages

use serde::Serialize;
use std::fmt;

/// Which input document a page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceDocument {
    Slip,
    Label,
}

impl fmt::Display for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDocument::Slip => write!(f, "packing slip"),
            SourceDocument::Label => write!(f, "shipping label"),
        }
    }
}

/// One page of an input document with its classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageRecord {
    pub source: SourceDocument,
    /// Zero-based index in the source document
    pub page_index: u32,
    pub raw_text: String,
    pub resolved_product: Option<String>,
    pub resolved_location: Option<String>,
}

impl PageRecord {
    pub fn new(source: SourceDocument, page_index: u32, raw_text: String) -> Self {
        Self {
            source,
            page_index,
            raw_text,
            resolved_product: None,
            resolved_location: None,
        }
    }

    /// Human-facing page number (1-based)
    pub fn page_number(&self) -> u32 {
        self.page_index + 1
    }
}

/// Outcome of matching one page against the product vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MatchResult {
    /// Canonical product name from the location table
    Product(String),
    /// Page mentions the sample keyword; routed to the sample location
    Sample,
    /// No known product found; kept for operator review
    Unmatched,
}

impl MatchResult {
    pub fn is_unmatched(&self) -> bool {
        matches!(self, MatchResult::Unmatched)
    }
}

/// Full matcher output for a page: the classification plus the details
/// the summary needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMatch {
    pub result: MatchResult,
    /// Name used for sorting and grouping (table spelling for products,
    /// the item line for samples)
    pub product: Option<String>,
    /// Size or other variant, part of the grouping key
    pub variant: Option<String>,
    /// Items ordered on the slip's line (`<size> <qty> of <total>`), 1 when absent
    pub quantity: u32,
    /// First line item on an unmatched page, for adding to the table
    pub hint: Option<String>,
}

impl PageMatch {
    pub fn unmatched(hint: Option<String>) -> Self {
        Self {
            result: MatchResult::Unmatched,
            product: None,
            variant: None,
            quantity: 1,
            hint,
        }
    }
}

/// A packing slip page after matching and location lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPage {
    pub record: PageRecord,
    pub outcome: PageMatch,
}

/// A paired slip/label representing one line item to pick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderUnit {
    /// Position in the original input order
    pub position: usize,
    pub slip: PageRecord,
    pub label: PageRecord,
    pub classification: MatchResult,
    pub variant: Option<String>,
    pub quantity: u32,
    pub hint: Option<String>,
}

impl OrderUnit {
    pub fn product(&self) -> Option<&str> {
        self.slip.resolved_product.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.slip.resolved_location.as_deref()
    }
}

/// Sort bucket of a location. Listed locations come first in priority
/// order, then unlisted codes lexicographically, then unmatched pages.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LocationRank {
    Listed(usize),
    Unlisted(String),
    Unmatched,
}

/// Units in picking order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortedBatch {
    units: Vec<OrderUnit>,
    ranks: Vec<LocationRank>,
}

impl SortedBatch {
    pub(crate) fn new(units: Vec<OrderUnit>, ranks: Vec<LocationRank>) -> Self {
        debug_assert_eq!(units.len(), ranks.len());
        Self { units, ranks }
    }

    pub fn units(&self) -> &[OrderUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units paired with their location bucket
    pub fn iter(&self) -> impl Iterator<Item = (&OrderUnit, &LocationRank)> {
        self.units.iter().zip(self.ranks.iter())
    }

    /// Original input positions in sorted order
    pub fn order(&self) -> Vec<usize> {
        self.units.iter().map(|u| u.position).collect()
    }

    /// Zero-based slip page indices in sorted order
    pub fn slip_order(&self) -> Vec<usize> {
        self.units
            .iter()
            .map(|u| u.slip.page_index as usize)
            .collect()
    }

    /// Zero-based label page indices in sorted order
    pub fn label_order(&self) -> Vec<usize> {
        self.units
            .iter()
            .map(|u| u.label.page_index as usize)
            .collect()
    }
}

/// One row of a location summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryLine {
    pub product: String,
    pub variant: Option<String>,
    /// Units (slip pages) on this line
    pub count: usize,
    /// Items to pick, summed over the units' parsed quantities
    pub quantity: u32,
}

/// Units to pick at one location, grouped by product and variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSummary {
    /// `None` for the unmatched bucket
    pub location: Option<String>,
    pub rank: LocationRank,
    pub lines: Vec<SummaryLine>,
    /// Units at this location
    pub total: usize,
    /// Items to pick at this location
    pub quantity: u32,
}

impl LocationSummary {
    /// Count for a product across all of its variants
    pub fn count_for(&self, product: &str) -> usize {
        let key = normalize(product);
        self.lines
            .iter()
            .filter(|line| normalize(&line.product) == key)
            .map(|line| line.count)
            .sum()
    }
}

/// Case-fold and collapse runs of whitespace to a single space.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
