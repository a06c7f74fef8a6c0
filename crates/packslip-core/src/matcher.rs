//! Product matching for packing slip pages
//!
//! A page is classified as exactly one of:
//! - `Sample`: the page text mentions the sample keyword. This check runs
//!   first and wins over any product match.
//! - `Product(name)`: the longest known product name found in the
//!   normalized page text.
//! - `Unmatched`: nothing recognised.
//!
//! Variant detection and the unmatched hint read the line-item section that
//! follows the items marker (`ITEMS` by default).

use crate::config::MatchingConfig;
use crate::types::{normalize, MatchResult, PageMatch};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    /// `<size> <qty> of <total>`, e.g. `M 2 of 3` or `Size 1 1 of 1`
    static ref SIZE_QTY_LINE: Regex =
        Regex::new(r"^(\S+(?:\s+\d+)?)\s+(\d+)\s+of\s+\d+").unwrap();
    /// `<qty> of <total>` with no size
    static ref QTY_LINE: Regex = Regex::new(r"^(\d+)\s+of\s+\d+").unwrap();
    /// Inline size token, e.g. `Boomer Tan Size 9`
    static ref INLINE_SIZE: Regex = Regex::new(r"(?i)\bsize\s+(\d+)\b").unwrap();
    /// A whole token of the form `Size 9`
    static ref SIZE_TOKEN: Regex = Regex::new(r"(?i)^size\s+(\d+)$").unwrap();
}

/// Letter sizes recognised whether or not they are configured
const LETTER_SIZES: [&str; 6] = ["XS", "S", "M", "L", "XL", "XXL"];

/// Product vocabulary, ordered longest name first
#[derive(Debug, Clone, Default)]
pub struct KnownProducts {
    /// (normalized, display)
    names: Vec<(String, String)>,
}

impl KnownProducts {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut names: Vec<(String, String)> = names
            .into_iter()
            .filter_map(|name| {
                let display = name.as_ref().trim().to_string();
                let key = normalize(&display);
                if key.is_empty() || !seen.insert(key.clone()) {
                    return None;
                }
                Some((key, display))
            })
            .collect();
        // Longest first; equal lengths in lexical order so results are deterministic
        names.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Longest known name occurring in already-normalized text
    fn longest_in<'a>(&'a self, normalized_text: &str) -> Option<(&'a str, &'a str)> {
        self.names
            .iter()
            .find(|(key, _)| normalized_text.contains(key.as_str()))
            .map(|(key, display)| (key.as_str(), display.as_str()))
    }
}

pub struct ProductMatcher<'a> {
    config: &'a MatchingConfig,
    keyword: String,
    acceptable_sizes: HashSet<&'a str>,
}

impl<'a> ProductMatcher<'a> {
    pub fn new(config: &'a MatchingConfig) -> Self {
        Self {
            config,
            keyword: normalize(&config.sample_keyword),
            acceptable_sizes: config
                .acceptable_sizes
                .iter()
                .map(|s| s.as_str())
                .collect(),
        }
    }

    /// Classify a page: sample first, then longest product match.
    pub fn classify(&self, page_text: &str, known: &KnownProducts) -> MatchResult {
        let normalized = normalize(page_text);
        if self.is_sample(&normalized) {
            return MatchResult::Sample;
        }
        match known.longest_in(&normalized) {
            Some((_, display)) => MatchResult::Product(display.to_string()),
            None => MatchResult::Unmatched,
        }
    }

    /// Classify a page and collect the product name, variant and hint.
    pub fn analyze(&self, page_text: &str, known: &KnownProducts) -> PageMatch {
        let normalized = normalize(page_text);
        let lines: Vec<&str> = page_text.lines().map(str::trim).collect();

        if self.is_sample(&normalized) {
            let index = lines
                .iter()
                .position(|line| normalize(line).contains(&self.keyword));
            let product = index
                .map(|i| collapse(lines[i]))
                .unwrap_or_else(|| self.config.sample_keyword.clone());
            let (variant, quantity) = match index {
                Some(i) => self.variant_at(&lines, i),
                None => (None, 1),
            };
            return PageMatch {
                result: MatchResult::Sample,
                product: Some(product),
                variant: Some(variant.unwrap_or_else(|| "Sample".to_string())),
                quantity,
                hint: None,
            };
        }

        match known.longest_in(&normalized) {
            Some((key, display)) => {
                let (variant, quantity) = match self.item_line_index(&lines, key) {
                    Some(i) => self.variant_at(&lines, i),
                    None => (None, 1),
                };
                PageMatch {
                    result: MatchResult::Product(display.to_string()),
                    product: Some(display.to_string()),
                    variant,
                    quantity,
                    hint: None,
                }
            }
            None => PageMatch::unmatched(self.item_lines(page_text).into_iter().next()),
        }
    }

    /// Lines of the line-item section, stopping at a blank line or a stop phrase.
    pub fn item_lines(&self, page_text: &str) -> Vec<String> {
        let mut lines = page_text.lines().map(str::trim);
        if !lines.any(|line| line.contains(&self.config.items_marker)) {
            return Vec::new();
        }
        lines
            .take_while(|line| !line.is_empty() && !self.is_stop_phrase(line))
            .map(collapse)
            .collect()
    }

    fn is_stop_phrase(&self, line: &str) -> bool {
        self.config
            .stop_phrases
            .iter()
            .any(|phrase| line.contains(phrase.as_str()))
    }

    /// Line holding the product, preferring the line-item section.
    fn item_line_index(&self, lines: &[&str], key: &str) -> Option<usize> {
        let items_start = lines
            .iter()
            .position(|line| line.contains(&self.config.items_marker))
            .map(|i| i + 1)
            .unwrap_or(0);
        let contains = |line: &&str| normalize(line).contains(key);
        lines[items_start..]
            .iter()
            .position(contains)
            .map(|i| i + items_start)
            .or_else(|| lines.iter().position(contains))
    }

    /// An empty keyword never marks a page as a sample.
    fn is_sample(&self, normalized: &str) -> bool {
        !self.keyword.is_empty() && normalized.contains(&self.keyword)
    }

    /// Size and quantity from the item line and the line after it. The
    /// quantity defaults to 1 when no `<qty> of <total>` follows.
    fn variant_at(&self, lines: &[&str], index: usize) -> (Option<String>, u32) {
        let inline = INLINE_SIZE
            .captures(lines[index])
            .map(|caps| format!("Size {}", &caps[1]));
        let Some(next) = lines[index + 1..].iter().find(|line| !line.is_empty()) else {
            return (inline, 1);
        };
        if let Some(caps) = SIZE_QTY_LINE.captures(next) {
            let quantity = parse_quantity(&caps[2]);
            let size = inline.or_else(|| self.size_token(&caps[1]));
            return (size, quantity);
        }
        if let Some(caps) = QTY_LINE.captures(next) {
            return (inline, parse_quantity(&caps[1]));
        }
        (inline.or_else(|| self.size_token(next)), 1)
    }

    /// A size written on its own: `Size N`, a letter size or a configured token.
    fn size_token(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if let Some(caps) = SIZE_TOKEN.captures(candidate) {
            return Some(format!("Size {}", &caps[1]));
        }
        if self.acceptable_sizes.contains(candidate) {
            return Some(candidate.to_string());
        }
        let upper = candidate.to_uppercase();
        LETTER_SIZES.contains(&upper.as_str()).then_some(upper)
    }
}

fn parse_quantity(digits: &str) -> u32 {
    digits.parse().ok().filter(|&n| n > 0).unwrap_or(1)
}

/// Collapse whitespace without changing case.
fn collapse(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ordering key for sizes: numbers numerically, letter sizes small to
/// large, anything else last.
pub fn size_rank(size: &str) -> u32 {
    let clean = size.trim().to_lowercase();
    if let Some(rest) = clean.strip_prefix("size ") {
        if let Ok(n) = rest.trim().parse::<u32>() {
            return n;
        }
    }
    if let Ok(n) = clean.parse::<u32>() {
        return n;
    }
    match clean.as_str() {
        "xs" => 1,
        "s" => 2,
        "m" => 3,
        "l" => 4,
        "xl" => 5,
        "xxl" => 6,
        _ => 100,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn slip(items: &[&str]) -> String {
        let mut text = String::from("Order #1001\nShip to: Jane Doe\nITEMS QUANTITY\n");
        for item in items {
            text.push_str(item);
            text.push('\n');
        }
        text.push_str("\nThank you for shopping with us!\n");
        text
    }

    #[test]
    fn test_longest_match_wins() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Boomer", "Boomer Tan"]);
        let result = matcher.classify("Boomer Tan Size 9", &known);
        assert_eq!(result, MatchResult::Product("Boomer Tan".into()));
    }

    #[test]
    fn test_sample_beats_product_match() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Boomer Tan"]);
        let text = slip(&["Boomer Tan SAMPLE", "Size 1 1 of 1"]);
        assert_eq!(matcher.classify(&text, &known), MatchResult::Sample);
    }

    #[test]
    fn test_empty_text_is_unmatched() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Boomer"]);
        assert_eq!(matcher.classify("", &known), MatchResult::Unmatched);
        assert_eq!(matcher.analyze("", &known), PageMatch::unmatched(None));
    }

    #[test]
    fn test_match_is_case_and_whitespace_insensitive() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Trail  Runner"]);
        let result = matcher.classify("TRAIL\n   runner", &known);
        assert_eq!(result, MatchResult::Product("Trail  Runner".into()));
    }

    #[test]
    fn test_analyze_reads_size_quantity_line() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Trail Runner"]);
        let text = slip(&["Trail Runner", "M 1 of 1", "SKU TR-001-M"]);
        let found = matcher.analyze(&text, &known);
        assert_eq!(found.result, MatchResult::Product("Trail Runner".into()));
        assert_eq!(found.variant.as_deref(), Some("M"));
    }

    #[test]
    fn test_analyze_reads_quantity() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Wool Hat"]);
        let found = matcher.analyze(&slip(&["Wool Hat", "M 3 of 3"]), &known);
        assert_eq!(found.variant.as_deref(), Some("M"));
        assert_eq!(found.quantity, 3);

        let found = matcher.analyze(&slip(&["Wool Hat", "2 of 2"]), &known);
        assert_eq!(found.variant, None);
        assert_eq!(found.quantity, 2);

        let found = matcher.analyze(&slip(&["Wool Hat"]), &known);
        assert_eq!(found.quantity, 1);
    }

    #[test]
    fn test_analyze_numbered_size_on_quantity_line() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Shoe"]);
        let nine = matcher.analyze(&slip(&["Shoe", "Size 9 1 of 1"]), &known);
        let ten = matcher.analyze(&slip(&["Shoe", "Size 10 2 of 2"]), &known);
        assert_eq!(nine.variant.as_deref(), Some("Size 9"));
        assert_eq!(ten.variant.as_deref(), Some("Size 10"));
        assert_eq!(ten.quantity, 2);
    }

    #[test]
    fn test_analyze_letter_sizes_without_configuration() {
        let config = MatchingConfig {
            acceptable_sizes: Vec::new(),
            ..MatchingConfig::default()
        };
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Apron"]);
        let found = matcher.analyze(&slip(&["Apron", "XL 1 of 1"]), &known);
        assert_eq!(found.variant.as_deref(), Some("XL"));
        let found = matcher.analyze(&slip(&["Apron", "xs"]), &known);
        assert_eq!(found.variant.as_deref(), Some("XS"));
    }

    #[test]
    fn test_empty_keyword_never_marks_samples() {
        let config = MatchingConfig {
            sample_keyword: String::new(),
            ..MatchingConfig::default()
        };
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Boot"]);
        assert_eq!(
            matcher.classify("Boot", &known),
            MatchResult::Product("Boot".into())
        );
        assert_eq!(matcher.analyze("Boot", &known).result, MatchResult::Product("Boot".into()));
        assert_eq!(matcher.classify("Hat", &known), MatchResult::Unmatched);
    }

    #[test]
    fn test_analyze_bare_size_line() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Trail Runner"]);
        let text = slip(&["Trail Runner", "42"]);
        assert_eq!(
            matcher.analyze(&text, &known).variant.as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_analyze_unknown_size_is_dropped() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Trail Runner"]);
        let text = slip(&["Trail Runner", "XXXL 1 of 1"]);
        assert_eq!(matcher.analyze(&text, &known).variant, None);
    }

    #[test]
    fn test_analyze_inline_size() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Boomer", "Boomer Tan"]);
        let found = matcher.analyze(&slip(&["Boomer Tan Size 9"]), &known);
        assert_eq!(found.product.as_deref(), Some("Boomer Tan"));
        assert_eq!(found.variant.as_deref(), Some("Size 9"));
    }

    #[test]
    fn test_sample_product_and_default_variant() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Boomer"]);
        let found = matcher.analyze(&slip(&["Fabric  Sample Pack"]), &known);
        assert_eq!(found.result, MatchResult::Sample);
        assert_eq!(found.product.as_deref(), Some("Fabric Sample Pack"));
        assert_eq!(found.variant.as_deref(), Some("Sample"));
    }

    #[test]
    fn test_sample_with_inline_size() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(Vec::<String>::new());
        let found = matcher.analyze(&slip(&["Sample Size 39"]), &known);
        assert_eq!(found.variant.as_deref(), Some("Size 39"));
    }

    #[test]
    fn test_unmatched_hint_is_first_item_line() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let known = KnownProducts::new(["Boomer"]);
        let found = matcher.analyze(&slip(&["Mystery   Boot", "S 1 of 1"]), &known);
        assert_eq!(found, PageMatch::unmatched(Some("Mystery Boot".into())));
    }

    #[test]
    fn test_item_lines_stop_at_stop_phrase() {
        let config = MatchingConfig::default();
        let matcher = ProductMatcher::new(&config);
        let text = "ITEMS\nBoot\nS 1 of 1\nNOTES: leave at door\nHat\n";
        assert_eq!(matcher.item_lines(text), vec!["Boot", "S 1 of 1"]);
        assert!(matcher.item_lines("no marker here").is_empty());
    }

    #[test]
    fn test_known_products_dedupes_normalized_names() {
        let known = KnownProducts::new(["Boot", "boot ", "BOOT", ""]);
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn test_size_rank_orders_sizes() {
        assert!(size_rank("XS") < size_rank("M"));
        assert!(size_rank("M") < size_rank("XL"));
        assert!(size_rank("Size 9") < size_rank("Size 10"));
        assert_eq!(size_rank("42"), 42);
        assert_eq!(size_rank("Sample"), 100);
    }
}
