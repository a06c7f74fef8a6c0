//! Per-location pick summaries
//!
//! A batch is walked in sorted order; each location bucket becomes one
//! [`LocationSummary`]. Lines are keyed by the normalized product name plus
//! its variant, so `Shoe / Size 9` and `Shoe / Size 10` stay separate.

use crate::matcher::size_rank;
use crate::types::{normalize, LocationSummary, SortedBatch, SummaryLine};

const UNRECOGNIZED: &str = "(no item text)";

struct ProductGroup {
    key: String,
    display: String,
    /// (variant, units, quantity)
    variants: Vec<(Option<String>, usize, u32)>,
}

pub fn summarize(batch: &SortedBatch) -> Vec<LocationSummary> {
    let mut summaries: Vec<LocationSummary> = Vec::new();
    let mut groups: Vec<ProductGroup> = Vec::new();

    for (unit, rank) in batch.iter() {
        let starts_new = summaries.last().map_or(true, |s| &s.rank != rank);
        if starts_new {
            if let Some(current) = summaries.last_mut() {
                close(current, std::mem::take(&mut groups));
            }
            summaries.push(LocationSummary {
                location: unit.location().map(str::to_string),
                rank: rank.clone(),
                lines: Vec::new(),
                total: 0,
                quantity: 0,
            });
        }

        let display = unit
            .product()
            .or(unit.hint.as_deref())
            .unwrap_or(UNRECOGNIZED);
        let key = normalize(display);
        let index = match groups.iter().position(|g| g.key == key) {
            Some(i) => i,
            None => {
                groups.push(ProductGroup {
                    key,
                    display: display.to_string(),
                    variants: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[index];
        match group.variants.iter_mut().find(|(v, _, _)| *v == unit.variant) {
            Some((_, count, quantity)) => {
                *count += 1;
                *quantity += unit.quantity;
            }
            None => group
                .variants
                .push((unit.variant.clone(), 1, unit.quantity)),
        }
    }

    if let Some(current) = summaries.last_mut() {
        close(current, groups);
    }
    summaries
}

fn close(summary: &mut LocationSummary, groups: Vec<ProductGroup>) {
    for mut group in groups {
        group
            .variants
            .sort_by_key(|(variant, _, _)| variant.as_deref().map_or(0, size_rank));
        for (variant, count, quantity) in group.variants {
            summary.total += count;
            summary.quantity += quantity;
            summary.lines.push(SummaryLine {
                product: group.display.clone(),
                variant,
                count,
                quantity,
            });
        }
    }
}
