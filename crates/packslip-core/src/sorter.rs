//! Picking-order sort
//!
//! Units are ordered by location bucket (see [`LocationRank`]) and then by
//! product name, case-insensitively. The sort is stable: units with the
//! same key keep their input order.

use crate::types::{LocationRank, OrderUnit, SortedBatch};

/// Bucket of a location code within the priority list
pub fn rank(location: Option<&str>, priority: &[String]) -> LocationRank {
    match location {
        None => LocationRank::Unmatched,
        Some(code) => {
            let code = code.trim();
            match priority.iter().position(|p| p.trim() == code) {
                Some(index) => LocationRank::Listed(index),
                None => LocationRank::Unlisted(code.to_string()),
            }
        }
    }
}

pub struct Sorter<'a> {
    priority: &'a [String],
}

impl<'a> Sorter<'a> {
    pub fn new(priority: &'a [String]) -> Self {
        Self { priority }
    }

    pub fn sort(&self, units: Vec<OrderUnit>) -> SortedBatch {
        let mut keyed: Vec<((LocationRank, String), OrderUnit)> = units
            .into_iter()
            .map(|unit| {
                let key = (
                    rank(unit.location(), self.priority),
                    unit.product().map(str::to_lowercase).unwrap_or_default(),
                );
                (key, unit)
            })
            .collect();

        // slice::sort_by is stable
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let (ranks, units) = keyed
            .into_iter()
            .map(|((rank, _), unit)| (rank, unit))
            .unzip();
        SortedBatch::new(units, ranks)
    }
}

/// Sort units against a priority list
pub fn sort(units: Vec<OrderUnit>, priority: &[String]) -> SortedBatch {
    Sorter::new(priority).sort(units)
}
