//! Run configuration
//!
//! TOML-based configuration for the sorting pipeline. Every field has a
//! default so an empty file (or no file at all) yields the standard warehouse
//! layout.

use crate::error::PackslipError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Picking route order
    #[serde(default)]
    pub locations: LocationsConfig,
    /// Product matching and item parsing
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Slip/label pairing
    #[serde(default)]
    pub pairing: PairingConfig,
    /// Shipping label checks
    #[serde(default)]
    pub labels: LabelsConfig,
    /// Output file names
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use packslip_core::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_file("packslip.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use packslip_core::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_str(r#"
    ///     [locations]
    ///     priority = ["A1", "A2", "garage"]
    /// "#)?;
    /// assert_eq!(config.locations.priority.len(), 3);
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings a run depends on
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an empty sample keyword or location, an
    /// invalid correlation pattern, or output file names that are empty or
    /// collide.
    pub fn validate(&self) -> crate::Result<()> {
        if self.matching.sample_keyword.trim().is_empty() {
            return Err(invalid("matching.sample_keyword must not be empty"));
        }
        if self.matching.sample_location.trim().is_empty() {
            return Err(invalid("matching.sample_location must not be empty"));
        }
        if let Some(pattern) = &self.pairing.correlation_pattern {
            regex::Regex::new(pattern).map_err(|e| {
                PackslipError::InvalidConfig(format!(
                    "Invalid pairing.correlation_pattern {}: {}",
                    pattern, e
                ))
            })?;
        }
        let names = [
            ("output.slips_file", &self.output.slips_file),
            ("output.labels_file", &self.output.labels_file),
            ("output.summary_file", &self.output.summary_file),
        ];
        for (i, (field, name)) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(invalid(&format!("{} must not be empty", field)));
            }
            if let Some((other, _)) = names[..i].iter().find(|(_, n)| n.trim() == name.trim()) {
                return Err(invalid(&format!(
                    "{} and {} are both {}",
                    other, field, name
                )));
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> PackslipError {
    PackslipError::InvalidConfig(message.to_string())
}

/// Location priority list defining the picking route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationsConfig {
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,
}

impl Default for LocationsConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
        }
    }
}

fn default_priority() -> Vec<String> {
    [
        "A13", "D16", "B11", "B12", "B13", "B14", "B16", "B17", "B18", "B19", "garage",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchingConfig {
    /// Keyword that routes a page to the sample location (case-insensitive)
    #[serde(default = "default_sample_keyword")]
    pub sample_keyword: String,
    /// Location every sample page is assigned to
    #[serde(default = "default_sample_location")]
    pub sample_location: String,
    /// Line that opens the line-item section of a packing slip
    #[serde(default = "default_items_marker")]
    pub items_marker: String,
    /// Lines containing any of these end the line-item section
    #[serde(default = "default_stop_phrases")]
    pub stop_phrases: Vec<String>,
    /// Size tokens recognised as a product variant
    #[serde(default = "default_acceptable_sizes")]
    pub acceptable_sizes: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            sample_keyword: default_sample_keyword(),
            sample_location: default_sample_location(),
            items_marker: default_items_marker(),
            stop_phrases: default_stop_phrases(),
            acceptable_sizes: default_acceptable_sizes(),
        }
    }
}

fn default_sample_keyword() -> String {
    "sample".to_string()
}

fn default_sample_location() -> String {
    "garage".to_string()
}

fn default_items_marker() -> String {
    "ITEMS".to_string()
}

fn default_stop_phrases() -> Vec<String> {
    [
        "Please note our return window",
        "Thank you for shopping with us!",
        "If you have any questions",
        "NOTES",
        "SIGNATURE REQUIRED SHIPPING",
        "please visit our returns portal",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_acceptable_sizes() -> Vec<String> {
    let mut sizes: Vec<String> = [
        "1", "2", "XS", "S", "M", "L", "XL", "XXL", "SM", "ML", "LG", "Size 1", "Size 2",
        "Sample",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    sizes.extend((30..=50).map(|n| n.to_string()));
    sizes
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PairingConfig {
    /// Regex whose first capture group identifies the order on both documents
    #[serde(default)]
    pub correlation_pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelsConfig {
    /// Label pages with fewer trimmed characters than this are reported as likely blank
    #[serde(default = "default_blank_threshold")]
    pub blank_threshold: usize,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            blank_threshold: default_blank_threshold(),
        }
    }
}

fn default_blank_threshold() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_slips_file")]
    pub slips_file: String,
    #[serde(default = "default_labels_file")]
    pub labels_file: String,
    #[serde(default = "default_summary_file")]
    pub summary_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            slips_file: default_slips_file(),
            labels_file: default_labels_file(),
            summary_file: default_summary_file(),
        }
    }
}

fn default_slips_file() -> String {
    "sorted_packing_slips.pdf".to_string()
}

fn default_labels_file() -> String {
    "sorted_shipping_labels.pdf".to_string()
}

fn default_summary_file() -> String {
    "location_summary.pdf".to_string()
}
