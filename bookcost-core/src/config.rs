//! Configuration for column aliases, price detection and filtering

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::columns::{self, ColumnMap};
use crate::price_book::DuplicatePolicy;

/// Main report configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub price: PriceConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl ReportConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ReportConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject alias overrides for fields the pipeline does not know
    pub fn validate(&self) -> Result<()> {
        for field in self.columns.student.keys() {
            if !columns::student::ALL.contains(&field.as_str()) {
                anyhow::bail!(
                    "Configuration error: Unknown student column '{}' in [columns.student]",
                    field
                );
            }
        }

        for field in self.columns.book.keys() {
            if !columns::book::ALL.contains(&field.as_str()) {
                anyhow::bail!(
                    "Configuration error: Unknown book column '{}' in [columns.book]",
                    field
                );
            }
        }

        if self.price.markers.is_empty() && self.price.fallback_markers.is_empty() {
            anyhow::bail!("Configuration error: [price] needs at least one marker");
        }

        Ok(())
    }

    /// Student column map: defaults overlaid with configured aliases
    pub fn student_column_map(&self) -> ColumnMap {
        overlay(ColumnMap::default_student(), &self.columns.student)
    }

    /// Book column map: defaults overlaid with configured aliases
    pub fn book_column_map(&self) -> ColumnMap {
        overlay(ColumnMap::default_book(), &self.columns.book)
    }
}

fn overlay(mut map: ColumnMap, overrides: &BTreeMap<String, Vec<String>>) -> ColumnMap {
    for (field, aliases) in overrides {
        map.set_aliases(field, aliases.clone());
    }
    map
}

/// Per-table alias overrides, keyed by canonical field name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default)]
    pub student: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub book: BTreeMap<String, Vec<String>>,
}

/// Price column detection and duplicate handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    /// Discount-price markers checked first
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,
    /// Looser discount keywords, checked only when no marker matched
    #[serde(default = "default_fallback_markers")]
    pub fallback_markers: Vec<String>,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            markers: default_markers(),
            fallback_markers: default_fallback_markers(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }
}

fn default_markers() -> Vec<String> {
    vec!["折后价".to_string()]
}

fn default_fallback_markers() -> Vec<String> {
    vec!["折".to_string(), "discount".to_string()]
}

/// College filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// How many college names a no-match error suggests
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
        }
    }
}

fn default_sample_limit() -> usize {
    10
}
