//! Product-to-location lookup table
//!
//! Backed by a CSV file with a header row. Required columns are found by
//! header name (`Product Name`/`Product` and `Area`/`Location`, any case);
//! other columns are ignored.
//!
//! The file rows are kept as read so the editor can show and fix
//! duplicates, but lookups always go through an index where the **last**
//! row for a product wins. `remove_duplicates` applies the same policy to
//! the rows themselves.

use crate::error::{PackslipError, Result};
use crate::matcher::KnownProducts;
use crate::types::normalize;
use crate::writer::write_atomic;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

const PRODUCT_HEADERS: &[&str] = &["product name", "product"];
const LOCATION_HEADERS: &[&str] = &["area", "location"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationEntry {
    pub product_name: String,
    pub location_code: String,
}

/// What happened while reading a table file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows: usize,
    pub skipped: usize,
    /// Product names that appeared more than once (first spelling seen)
    pub duplicates: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    rows: Vec<LocationEntry>,
    /// normalized product -> index of the winning row
    index: HashMap<String, usize>,
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_stats(path).map(|(table, _)| table)
    }

    pub fn load_with_stats<P: AsRef<Path>>(path: P) -> Result<(Self, LoadStats)> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| PackslipError::io(path, e))?;
        let (table, stats) = Self::from_reader(file, path)?;
        info!(
            path = %path.display(),
            products = table.len(),
            rows = stats.rows,
            duplicates = stats.duplicates.len(),
            "Loaded location table"
        );
        Ok((table, stats))
    }

    /// Parse CSV from any reader. `path` is only used in error messages.
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<(Self, LoadStats)> {
        let malformed = |line: Option<u64>, reason: String| PackslipError::MalformedTable {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv
            .headers()
            .map_err(|e| malformed(e.position().map(|p| p.line()), e.to_string()))?
            .clone();
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        };
        let product_col = find(PRODUCT_HEADERS)
            .ok_or_else(|| malformed(Some(1), "missing column 'Product Name'".into()))?;
        let location_col =
            find(LOCATION_HEADERS).ok_or_else(|| malformed(Some(1), "missing column 'Area'".into()))?;

        let mut table = Self::new();
        let mut stats = LoadStats::default();
        for record in csv.records() {
            let record =
                record.map_err(|e| malformed(e.position().map(|p| p.line()), e.to_string()))?;
            stats.rows += 1;
            let product = record.get(product_col).unwrap_or("").trim();
            let location = record.get(location_col).unwrap_or("").trim();
            if product.is_empty() || location.is_empty() {
                debug!(
                    line = record.position().map(|p| p.line()),
                    "Skipping incomplete row"
                );
                stats.skipped += 1;
                continue;
            }
            table.rows.push(LocationEntry {
                product_name: product.to_string(),
                location_code: location.to_string(),
            });
        }

        stats.duplicates = table.duplicate_names();
        for name in &stats.duplicates {
            warn!(product = %name, "Duplicate product in location table, last row wins");
        }
        table.reindex();
        Ok((table, stats))
    }

    /// Exact match on the normalized product name
    pub fn lookup(&self, product_name: &str) -> Option<&str> {
        self.index
            .get(&normalize(product_name))
            .map(|&i| self.rows[i].location_code.as_str())
    }

    /// Number of distinct products
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Rows as stored, duplicates included
    pub fn rows(&self) -> &[LocationEntry] {
        &self.rows
    }

    /// Resolved entries (one per product), sorted case-insensitively by name
    pub fn entries(&self) -> Vec<&LocationEntry> {
        let mut entries: Vec<&LocationEntry> = self.index.values().map(|&i| &self.rows[i]).collect();
        entries.sort_by_key(|e| e.product_name.to_lowercase());
        entries
    }

    /// Vocabulary for the product matcher
    pub fn known_products(&self) -> KnownProducts {
        KnownProducts::new(self.index.values().map(|&i| self.rows[i].product_name.as_str()))
    }

    /// Set the location of a product, adding it if absent.
    /// Returns `true` when a new product was added.
    pub fn upsert(&mut self, product_name: &str, location_code: &str) -> bool {
        let key = normalize(product_name);
        let location_code = location_code.trim();
        let mut found = false;
        for row in self.rows.iter_mut() {
            if normalize(&row.product_name) == key {
                row.location_code = location_code.to_string();
                found = true;
            }
        }
        if !found {
            self.rows.push(LocationEntry {
                product_name: product_name.trim().to_string(),
                location_code: location_code.to_string(),
            });
        }
        self.reindex();
        !found
    }

    /// Replace the rows of `old_name` with `new_name` at `location_code`.
    /// Returns `false` when `old_name` is not in the table.
    pub fn rename(&mut self, old_name: &str, new_name: &str, location_code: &str) -> bool {
        let key = normalize(old_name);
        let mut found = false;
        for row in self.rows.iter_mut() {
            if normalize(&row.product_name) == key {
                row.product_name = new_name.trim().to_string();
                row.location_code = location_code.trim().to_string();
                found = true;
            }
        }
        if found {
            self.reindex();
        }
        found
    }

    /// Drop every row of a product
    pub fn remove(&mut self, product_name: &str) -> usize {
        let key = normalize(product_name);
        let before = self.rows.len();
        self.rows.retain(|row| normalize(&row.product_name) != key);
        self.reindex();
        before - self.rows.len()
    }

    /// Collapse duplicate rows, keeping the last one. Returns rows removed.
    pub fn remove_duplicates(&mut self) -> usize {
        let before = self.rows.len();
        let mut keep: Vec<usize> = self.index.values().copied().collect();
        keep.sort_unstable();
        let rows = std::mem::take(&mut self.rows);
        self.rows = rows
            .into_iter()
            .enumerate()
            .filter(|(i, _)| keep.binary_search(i).is_ok())
            .map(|(_, row)| row)
            .collect();
        self.reindex();
        let removed = before - self.rows.len();
        info!(removed, remaining = self.rows.len(), "Removed duplicate rows");
        removed
    }

    /// Case-insensitive substring search on product and location
    pub fn filter(&self, product_query: &str, location_query: &str) -> Vec<&LocationEntry> {
        let product_query = product_query.trim().to_lowercase();
        let location_query = location_query.trim().to_lowercase();
        let mut hits: Vec<&LocationEntry> = self
            .rows
            .iter()
            .filter(|row| {
                row.product_name.to_lowercase().contains(&product_query)
                    && row.location_code.to_lowercase().contains(&location_query)
            })
            .collect();
        hits.sort_by_key(|e| e.product_name.to_lowercase());
        hits
    }

    /// Serialize as CSV, rows sorted case-insensitively by product
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut rows: Vec<&LocationEntry> = self.rows.iter().collect();
        rows.sort_by_key(|e| e.product_name.to_lowercase());

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer
            .write_record(["Product Name", "Area"])
            .map_err(|e| PackslipError::Operation(e.to_string()))?;
        for row in rows {
            writer
                .write_record([row.product_name.as_str(), row.location_code.as_str()])
                .map_err(|e| PackslipError::Operation(e.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| PackslipError::Operation(e.to_string()))
    }

    /// Write the table back to disk atomically
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        write_atomic(path, &self.to_csv()?)?;
        info!(path = %path.display(), rows = self.rows.len(), "Saved location table");
        Ok(())
    }

    fn duplicate_names(&self) -> Vec<String> {
        let mut counts: HashMap<String, (usize, &str)> = HashMap::new();
        let mut order = Vec::new();
        for row in &self.rows {
            let key = normalize(&row.product_name);
            let entry = counts.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (0, row.product_name.as_str())
            });
            entry.0 += 1;
        }
        order
            .into_iter()
            .filter_map(|key| match counts.get(&key) {
                Some((n, name)) if *n > 1 => Some(name.to_string()),
                _ => None,
            })
            .collect()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, row) in self.rows.iter().enumerate() {
            self.index.insert(normalize(&row.product_name), i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(csv: &str) -> Result<(LocationTable, LoadStats)> {
        LocationTable::from_reader(csv.as_bytes(), Path::new("map.csv"))
    }

    #[test]
    fn test_load_and_lookup_normalized() {
        let (table, stats) = parse("Product Name,Area\nBoomer Tan,A13\nTrail Runner,D16\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(stats.rows, 2);
        assert_eq!(table.lookup("boomer   TAN"), Some("A13"));
        assert_eq!(table.lookup("Trail Runner"), Some("D16"));
        assert_eq!(table.lookup("Boomer"), None);
    }

    #[test]
    fn test_duplicate_rows_last_wins() {
        let (table, stats) = parse("Product Name,Area\nBoot,A13\nHat,B11\nboot,D16\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.lookup("Boot"), Some("D16"));
        assert_eq!(stats.duplicates, vec!["Boot".to_string()]);
    }

    #[test]
    fn test_remove_duplicates_keeps_last_row() {
        let (mut table, _) = parse("Product Name,Area\nBoot,A13\nHat,B11\nboot,D16\n").unwrap();
        assert_eq!(table.remove_duplicates(), 1);
        assert_eq!(
            table.rows(),
            &[
                LocationEntry {
                    product_name: "Hat".into(),
                    location_code: "B11".into()
                },
                LocationEntry {
                    product_name: "boot".into(),
                    location_code: "D16".into()
                },
            ]
        );
        assert_eq!(table.remove_duplicates(), 0);
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let result = parse("Product Name,Shelf\nBoot,A13\n");
        match result {
            Err(PackslipError::MalformedTable { line, reason, .. }) => {
                assert_eq!(line, Some(1));
                assert!(reason.contains("Area"));
            }
            other => panic!("expected MalformedTable, got {:?}", other.map(|t| t.1)),
        }
    }

    #[test]
    fn test_empty_file_is_malformed() {
        assert!(matches!(
            parse(""),
            Err(PackslipError::MalformedTable { .. })
        ));
    }

    #[test]
    fn test_header_aliases_and_extra_columns() {
        let (table, _) = parse("Notes,LOCATION,product\nfragile,B12,Glass Vase\n").unwrap();
        assert_eq!(table.lookup("glass vase"), Some("B12"));
    }

    #[test]
    fn test_incomplete_rows_skipped() {
        let (table, stats) = parse("Product Name,Area\nBoot,\n,A13\nHat\nCap,B11\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(stats.skipped, 3);
    }

    #[test]
    fn test_quoted_fields() {
        let (table, _) = parse("Product Name,Area\n\"Boot, Leather\",A13\n").unwrap();
        assert_eq!(table.lookup("boot, leather"), Some("A13"));
    }

    #[test]
    fn test_upsert_updates_or_inserts() {
        let mut table = LocationTable::new();
        assert!(table.upsert("Boot", "A13"));
        assert!(!table.upsert("BOOT", "D16"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("boot"), Some("D16"));
        assert_eq!(table.rows()[0].product_name, "Boot");
    }

    #[test]
    fn test_rename_and_remove() {
        let mut table = LocationTable::new();
        table.upsert("Boot", "A13");
        assert!(table.rename("boot", "Work Boot", "B11"));
        assert_eq!(table.lookup("Boot"), None);
        assert_eq!(table.lookup("work boot"), Some("B11"));
        assert!(!table.rename("missing", "x", "y"));
        assert_eq!(table.remove("WORK BOOT"), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let (table, _) =
            parse("Product Name,Area\nTrail Runner,D16\nboot,A13\nBoomer,A13\n").unwrap();
        let hits: Vec<_> = table
            .filter("boo", "a1")
            .iter()
            .map(|e| e.product_name.as_str())
            .collect();
        assert_eq!(hits, vec!["Boomer", "boot"]);
        assert_eq!(table.filter("", "").len(), 3);
    }

    #[test]
    fn test_save_round_trip_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.csv");
        let mut table = LocationTable::new();
        table.upsert("zebra", "B19");
        table.upsert("Apple", "A13");
        table.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Product Name,Area\nApple,A13\nzebra,B19\n");

        let reloaded = LocationTable::load(&path).unwrap();
        assert_eq!(reloaded.lookup("ZEBRA"), Some("B19"));
    }

    #[test]
    fn test_known_products_follow_winning_rows() {
        let (table, _) = parse("Product Name,Area\nBoot,A13\nboot,D16\nHat,B11\n").unwrap();
        assert_eq!(table.known_products().len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            LocationTable::load("/nonexistent/map.csv"),
            Err(PackslipError::Io { .. })
        ));
    }
}
