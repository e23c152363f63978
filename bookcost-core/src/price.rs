//! Price column resolver
//!
//! Source price lists label the post-discount price inconsistently. The
//! resolver runs an ordered list of matchers over the column labels; the first
//! matcher that finds a column decides, and within a matcher the first column
//! in table order wins.

use crate::config::PriceConfig;

/// A strategy that proposes a price column from the table's labels
pub trait PriceColumnMatcher: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Return the first matching label, if any
    fn find<'a>(&self, columns: &'a [String]) -> Option<&'a str>;
}

/// Matches labels containing any marker, either verbatim or ignoring case
pub struct MarkerMatcher {
    name: String,
    markers: Vec<String>,
}

impl MarkerMatcher {
    pub fn new(name: impl Into<String>, markers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            markers,
        }
    }

    fn matches(&self, label: &str) -> bool {
        let lower = label.to_lowercase();
        self.markers
            .iter()
            .any(|marker| label.contains(marker.as_str()) || lower.contains(&marker.to_lowercase()))
    }
}

impl PriceColumnMatcher for MarkerMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn find<'a>(&self, columns: &'a [String]) -> Option<&'a str> {
        columns
            .iter()
            .find(|label| self.matches(label))
            .map(String::as_str)
    }
}

/// Ordered list of price column matchers
pub struct PriceColumnResolver {
    matchers: Vec<Box<dyn PriceColumnMatcher>>,
}

impl PriceColumnResolver {
    /// Exact discount-price markers first, then looser discount keywords
    pub fn new(config: &PriceConfig) -> Self {
        Self::with_matchers(vec![
            Box::new(MarkerMatcher::new("discount-price-marker", config.markers.clone())),
            Box::new(MarkerMatcher::new(
                "discount-keyword",
                config.fallback_markers.clone(),
            )),
        ])
    }

    pub fn with_matchers(matchers: Vec<Box<dyn PriceColumnMatcher>>) -> Self {
        Self { matchers }
    }

    /// Label of the price column, or `None` when no matcher finds one
    pub fn resolve<'a>(&self, columns: &'a [String]) -> Option<&'a str> {
        for matcher in &self.matchers {
            if let Some(label) = matcher.find(columns) {
                tracing::debug!(matcher = matcher.name(), column = label, "price column resolved");
                return Some(label);
            }
        }
        None
    }
}

impl Default for PriceColumnResolver {
    fn default() -> Self {
        Self::new(&PriceConfig::default())
    }
}
