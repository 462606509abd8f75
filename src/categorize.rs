//! Failure categorization: map captured output to a named category and an
//! optional remediation suggestion.
//!
//! Categories are checked in config declaration order and the first matching
//! pattern wins; matches are never aggregated. Patterns compile as
//! case-insensitive regexes against the full output. An invalid pattern is
//! skipped with a warning, never a hard failure.

use crate::config::ErrorCategory;
use crate::utils;
use regex::RegexBuilder;

/// Outcome of categorizing one failed check's output.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Categorization {
    pub category: Option<String>,
    pub suggestion: Option<String>,
}

/// Find the first category whose first matching pattern hits `output`.
pub fn categorize(output: &str, categories: &[ErrorCategory]) -> Categorization {
    if output.is_empty() || categories.is_empty() {
        return Categorization::default();
    }
    for category in categories {
        for pattern in &category.patterns {
            let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => re,
                Err(e) => {
                    eprintln!(
                        "{} invalid pattern '{}' in category '{}' skipped: {}",
                        utils::warn_prefix(),
                        pattern,
                        category.name,
                        e
                    );
                    continue;
                }
            };
            if regex.is_match(output) {
                return Categorization {
                    category: Some(category.name.clone()),
                    suggestion: category.suggestion.clone(),
                };
            }
        }
    }
    Categorization::default()
}
