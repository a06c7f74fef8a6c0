//! Slip/label pairing
//!
//! Slips and labels are generated upstream in the same order, so page `i`
//! of one belongs with page `i` of the other. Differing page counts are a
//! hard error. An optional correlation pattern (e.g. an order number) is
//! checked on both pages of each pair when present on both.

use crate::error::{PackslipError, Result};
use crate::types::{MatchedPage, OrderUnit, PageRecord};
use regex::Regex;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct DocumentIndexer {
    correlation: Option<Regex>,
}

impl DocumentIndexer {
    /// Positional pairing only
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional pairing, verified by the first capture group of `pattern`
    pub fn with_correlation(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            PackslipError::InvalidConfig(format!("correlation pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            correlation: Some(regex),
        })
    }

    /// Pair slip pages with label pages by position.
    ///
    /// Fails before producing any unit when the page counts differ or a
    /// correlation key disagrees.
    pub fn pair(&self, slips: Vec<MatchedPage>, labels: Vec<PageRecord>) -> Result<Vec<OrderUnit>> {
        if slips.len() != labels.len() {
            return Err(PackslipError::PageCountMismatch {
                slips: slips.len(),
                labels: labels.len(),
            });
        }

        if let Some(regex) = &self.correlation {
            for (position, (slip, label)) in slips.iter().zip(labels.iter()).enumerate() {
                let slip_key = correlation_key(regex, &slip.record.raw_text);
                let label_key = correlation_key(regex, &label.raw_text);
                match (slip_key, label_key) {
                    (Some(slip_key), Some(label_key)) if slip_key != label_key => {
                        return Err(PackslipError::CorrelationMismatch {
                            position,
                            slip_key,
                            label_key,
                        });
                    }
                    (Some(_), Some(_)) => {}
                    _ => debug!(position, "No correlation key on both pages, pairing by position"),
                }
            }
        }

        let units = slips
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(position, (slip, mut label))| {
                label.resolved_product = slip.record.resolved_product.clone();
                label.resolved_location = slip.record.resolved_location.clone();
                OrderUnit {
                    position,
                    slip: slip.record,
                    label,
                    classification: slip.outcome.result,
                    variant: slip.outcome.variant,
                    quantity: slip.outcome.quantity,
                    hint: slip.outcome.hint,
                }
            })
            .collect();
        Ok(units)
    }
}

fn correlation_key(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str().trim().to_string())
}
