//! Per-page text extraction
//!
//! Documents are parsed once with lopdf and kept alive so the same parse
//! serves text extraction and later page reassembly. Page text is produced
//! lazily; each call to [`PdfSource::pages`] starts a fresh pass.

use crate::error::{PackslipError, Result};
use lopdf::Document;
use std::path::Path;
use tracing::{debug, warn};

/// Text of a single page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// Zero-based page index
    pub page_index: u32,
    /// Empty when the page has no extractable text
    pub text: String,
}

/// A parsed input document
#[derive(Debug, Clone)]
pub struct PdfSource {
    name: String,
    doc: Document,
}

impl PdfSource {
    /// Read and parse a PDF from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| PackslipError::io(path, e))?;
        Self::from_bytes(path.display().to_string(), &bytes)
    }

    /// Parse PDF bytes. `name` is used in error messages and logs.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        let doc = Document::load_mem(bytes).map_err(|e| PackslipError::UnreadablePdf {
            document: name.clone(),
            page: None,
            reason: e.to_string(),
        })?;

        if doc.is_encrypted() {
            return Err(PackslipError::UnreadablePdf {
                document: name,
                page: None,
                reason: "document is encrypted".into(),
            });
        }

        debug!(document = %name, pages = doc.get_pages().len(), "Loaded PDF");
        Ok(Self { name, doc })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Lazy iterator over page text in page order
    pub fn pages(&self) -> PageTexts<'_> {
        let numbers: Vec<u32> = self.doc.get_pages().keys().copied().collect();
        PageTexts {
            source: self,
            numbers: numbers.into_iter(),
        }
    }

    fn page_text(&self, page_number: u32) -> String {
        match self.doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    document = %self.name,
                    page = page_number,
                    error = %e,
                    "No extractable text on page"
                );
                String::new()
            }
        }
    }
}

/// Iterator returned by [`PdfSource::pages`]
pub struct PageTexts<'a> {
    source: &'a PdfSource,
    numbers: std::vec::IntoIter<u32>,
}

impl Iterator for PageTexts<'_> {
    type Item = PageText;

    fn next(&mut self) -> Option<Self::Item> {
        let number = self.numbers.next()?;
        Some(PageText {
            page_index: number.saturating_sub(1),
            text: self.source.page_text(number),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.numbers.size_hint()
    }
}

impl ExactSizeIterator for PageTexts<'_> {}

/// Extract the text of every page of a PDF held in memory
pub fn extract(bytes: &[u8]) -> Result<Vec<PageText>> {
    let source = PdfSource::from_bytes("<memory>", bytes)?;
    Ok(source.pages().collect())
}
