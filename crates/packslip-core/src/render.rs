//! Summary document rendering
//!
//! One US Letter page per location: a heading, a `Product | Size | Qty`
//! grid with a grey header row and banded body rows, and a total. Tables
//! that do not fit continue on the next page with the header repeated.

use crate::error::{PackslipError, Result};
use crate::types::{LocationSummary, SummaryLine};
use chrono::NaiveDateTime;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 36.0;
const TABLE_TOP: f32 = 720.0;
const ROW_HEIGHT: f32 = 12.0;
const FONT_SIZE: f32 = 8.0;
/// Reserved below the last row for the total line
const FOOTER: f32 = 20.0;
const COLUMN_WIDTHS: [f32; 3] = [252.0, 54.0, 54.0];
const MAX_PRODUCT_CHARS: usize = 58;

/// Body rows that fit on one page
pub const ROWS_PER_PAGE: usize = ((TABLE_TOP - ROW_HEIGHT - MARGIN - FOOTER) / ROW_HEIGHT) as usize;

pub struct SummaryRenderer<'a> {
    sample_location: &'a str,
    generated_at: NaiveDateTime,
}

impl<'a> SummaryRenderer<'a> {
    pub fn new(sample_location: &'a str, generated_at: NaiveDateTime) -> Self {
        Self {
            sample_location,
            generated_at,
        }
    }

    /// Page heading for a location
    pub fn title(&self, summary: &LocationSummary) -> String {
        match summary.location.as_deref() {
            None => "Unmatched".to_string(),
            Some(code) if code.eq_ignore_ascii_case(self.sample_location) => capitalize(code),
            Some(code) => format!("Locker: {}", code),
        }
    }

    /// Render the summaries as a PDF, pages in the given order
    pub fn render(&self, summaries: &[LocationSummary]) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let regular = doc.add_object(font("Helvetica"));
        let bold = doc.add_object(font("Helvetica-Bold"));
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => regular, "F2" => bold },
        });

        let mut kids = Vec::new();
        for summary in summaries {
            let title = self.title(summary);
            let chunks: Vec<&[SummaryLine]> = if summary.lines.is_empty() {
                vec![&summary.lines[..]]
            } else {
                summary.lines.chunks(ROWS_PER_PAGE).collect()
            };
            let last = chunks.len() - 1;
            for (i, rows) in chunks.into_iter().enumerate() {
                let heading = if i == 0 {
                    title.clone()
                } else {
                    format!("{} (continued)", title)
                };
                let total = (i == last).then_some(summary.quantity);
                let content = self.page_content(&heading, rows, total);
                let encoded = content
                    .encode()
                    .map_err(|e| PackslipError::Operation(format!("encode summary page: {}", e)))?;
                let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
                let page_id = add_page(&mut doc, pages_id, content_id, resources_id);
                kids.push(Object::Reference(page_id));
            }
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| PackslipError::Operation(format!("Failed to save summary PDF: {}", e)))?;
        Ok(buffer)
    }

    fn page_content(&self, heading: &str, rows: &[SummaryLine], total: Option<u32>) -> Content {
        let mut ops = Vec::new();
        let left = MARGIN;
        let table_width: f32 = COLUMN_WIDTHS.iter().sum();

        text(&mut ops, "F2", 10.0, left, PAGE_HEIGHT - MARGIN - 10.0, heading);
        let stamp = format!("Generated {}", self.generated_at.format("%Y-%m-%d %H:%M"));
        text(&mut ops, "F1", 7.0, left, PAGE_HEIGHT - MARGIN - 22.0, &stamp);

        // Header background and banded rows
        fill(&mut ops, 0.827, left, TABLE_TOP - ROW_HEIGHT, table_width, ROW_HEIGHT);
        for i in (1..rows.len()).step_by(2) {
            let y = TABLE_TOP - ROW_HEIGHT * (i as f32 + 2.0);
            fill(&mut ops, 0.94, left, y, table_width, ROW_HEIGHT);
        }

        // Grid
        let row_count = rows.len() + 1;
        let bottom = TABLE_TOP - ROW_HEIGHT * row_count as f32;
        ops.push(Operation::new("w", vec![0.25f32.into()]));
        ops.push(Operation::new("G", vec![0.into()]));
        for r in 0..=row_count {
            let y = TABLE_TOP - ROW_HEIGHT * r as f32;
            line(&mut ops, left, y, left + table_width, y);
        }
        let mut x = left;
        line(&mut ops, x, TABLE_TOP, x, bottom);
        for width in COLUMN_WIDTHS {
            x += width;
            line(&mut ops, x, TABLE_TOP, x, bottom);
        }

        // Cells
        let header = ["Product", "Size", "Qty"];
        self.row(&mut ops, "F2", 0, header.map(String::from));
        for (i, line) in rows.iter().enumerate() {
            let cells = [
                truncate(&line.product, MAX_PRODUCT_CHARS),
                line.variant.clone().unwrap_or_default(),
                line.quantity.to_string(),
            ];
            self.row(&mut ops, "F1", i + 1, cells);
        }

        if let Some(total) = total {
            let label = format!("Total: {}", total);
            text(&mut ops, "F2", FONT_SIZE, left, bottom - 14.0, &label);
        }

        Content { operations: ops }
    }

    fn row(&self, ops: &mut Vec<Operation>, font: &str, index: usize, cells: [String; 3]) {
        let baseline = TABLE_TOP - ROW_HEIGHT * (index as f32 + 1.0) + 3.5;
        let mut x = MARGIN;
        for (column, (cell, width)) in cells.iter().zip(COLUMN_WIDTHS).enumerate() {
            let offset = if column == 0 {
                3.0
            } else {
                // Helvetica averages about half an em per glyph
                ((width - cell.chars().count() as f32 * FONT_SIZE * 0.5) / 2.0).max(2.0)
            };
            text(ops, font, FONT_SIZE, x + offset, baseline, cell);
            x += width;
        }
    }
}

/// Render summaries with a heading scheme that names the sample location
pub fn write_summaries(
    summaries: &[LocationSummary],
    sample_location: &str,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>> {
    SummaryRenderer::new(sample_location, generated_at).render(summaries)
}

fn font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn add_page(doc: &mut Document, parent: ObjectId, content: ObjectId, resources: ObjectId) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        "Contents" => content,
        "Resources" => resources,
    })
}

fn text(ops: &mut Vec<Operation>, font: &str, size: f32, x: f32, y: f32, value: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(win_ansi(value), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn fill(ops: &mut Vec<Operation>, gray: f32, x: f32, y: f32, width: f32, height: f32) {
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("g", vec![gray.into()]));
    ops.push(Operation::new(
        "re",
        vec![x.into(), y.into(), width.into(), height.into()],
    ));
    ops.push(Operation::new("f", vec![]));
    ops.push(Operation::new("Q", vec![]));
}

fn line(ops: &mut Vec<Operation>, x1: f32, y1: f32, x2: f32, y2: f32) {
    ops.push(Operation::new("m", vec![x1.into(), y1.into()]));
    ops.push(Operation::new("l", vec![x2.into(), y2.into()]));
    ops.push(Operation::new("S", vec![]));
}

/// Encode for the standard fonts; characters outside Latin-1 become `?`.
fn win_ansi(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' => b'-',
            '\u{2018}' | '\u{2019}' => b'\'',
            '\u{201C}' | '\u{201D}' => b'"',
            c if (c as u32) < 0x80 => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(max - 3).collect();
        cut.push_str("...");
        cut
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
