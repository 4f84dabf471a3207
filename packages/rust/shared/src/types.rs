//! Core domain types for listing optimization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ListingForgeError, Result};

/// Exact length of an ASIN.
pub const ASIN_LEN: usize = 10;

const LENGTH_MESSAGE: &str = "ASIN must be 10 characters";
const CHARSET_MESSAGE: &str = "ASIN must contain only uppercase letters and numbers";

// ---------------------------------------------------------------------------
// ValidationIssue
// ---------------------------------------------------------------------------

/// A single failed input check, addressed by the field path it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: Vec<String>,
    pub message: String,
}

impl ValidationIssue {
    /// An issue on the `asin` field.
    pub fn asin(message: impl Into<String>) -> Self {
        Self {
            path: vec!["asin".into()],
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Asin
// ---------------------------------------------------------------------------

/// A validated Amazon Standard Identification Number: 10 chars of `[A-Z0-9]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Asin(String);

impl Asin {
    /// Validate `raw` as an ASIN.
    ///
    /// Every failing check is reported, so `"abc"` yields both a length issue
    /// and a charset issue.
    pub fn parse(raw: &str) -> Result<Self> {
        let issues = Self::check(raw);
        if issues.is_empty() {
            Ok(Self(raw.to_string()))
        } else {
            Err(ListingForgeError::validation("Invalid ASIN format", issues))
        }
    }

    /// Run all ASIN checks against `raw`, returning the failures in order.
    pub fn check(raw: &str) -> Vec<ValidationIssue> {
        let len = raw.chars().count();
        let mut issues = Vec::new();

        if len < ASIN_LEN {
            issues.push(ValidationIssue::asin(LENGTH_MESSAGE));
        }
        if len > ASIN_LEN {
            issues.push(ValidationIssue::asin(LENGTH_MESSAGE));
        }
        let charset_ok =
            len == ASIN_LEN && raw.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !charset_ok {
            issues.push(ValidationIssue::asin(CHARSET_MESSAGE));
        }

        issues
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Asin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Asin {
    type Err = ListingForgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Asin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// Listing content as found on (or substituted for) the product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductListing {
    pub asin: Asin,
    /// Never empty.
    pub title: String,
    /// At most 5 entries, page order.
    pub bullets: Vec<String>,
    /// Whitespace-normalized, at most 2000 chars plus a `...` marker.
    pub description: String,
}

/// The generative model's rewrite of a listing.
///
/// Deserialization is the schema check: all four fields are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedListing {
    pub optimized_title: String,
    pub optimized_bullets: Vec<String>,
    pub optimized_description: String,
    pub suggested_keywords: Vec<String>,
}

// ---------------------------------------------------------------------------
// Optimization records
// ---------------------------------------------------------------------------

/// Input to the persistence gateway: a record minus its assigned fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOptimization {
    pub asin: Asin,
    pub original_title: String,
    pub original_bullets: Vec<String>,
    pub original_description: String,
    pub optimized_title: String,
    pub optimized_bullets: Vec<String>,
    pub optimized_description: String,
    pub suggested_keywords: Vec<String>,
}

impl NewOptimization {
    /// Combine the original listing with its optimized rewrite.
    pub fn new(original: ProductListing, optimized: OptimizedListing) -> Self {
        Self {
            asin: original.asin,
            original_title: original.title,
            original_bullets: original.bullets,
            original_description: original.description,
            optimized_title: optimized.optimized_title,
            optimized_bullets: optimized.optimized_bullets,
            optimized_description: optimized.optimized_description,
            suggested_keywords: optimized.suggested_keywords,
        }
    }
}

/// A persisted optimization run. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRecord {
    /// Monotonic surrogate key assigned by storage.
    pub id: i64,
    pub asin: String,
    pub original_title: String,
    pub original_bullets: Vec<String>,
    pub original_description: String,
    pub optimized_title: String,
    pub optimized_bullets: Vec<String>,
    pub optimized_description: String,
    pub suggested_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_asin() {
        let asin = Asin::parse("B07H65KP63").expect("valid asin");
        assert_eq!(asin.as_str(), "B07H65KP63");
        assert_eq!(asin.to_string(), "B07H65KP63");
    }

    #[test]
    fn rejects_lowercase() {
        let issues = Asin::check("b07h65kp63");
        assert_eq!(issues, vec![ValidationIssue::asin(CHARSET_MESSAGE)]);
    }

    #[test]
    fn short_input_reports_length_and_charset() {
        let issues = Asin::check("ABC");
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].message, LENGTH_MESSAGE);
        assert_eq!(issues[1].message, CHARSET_MESSAGE);
        assert_eq!(issues[0].path, vec!["asin".to_string()]);
    }

    #[test]
    fn rejects_long_and_symbols() {
        assert_eq!(Asin::check("B07H65KP63X").len(), 2);
        assert_eq!(Asin::check("B07H65-P63").len(), 1);
        assert_eq!(Asin::check("").len(), 2);
    }

    #[test]
    fn parse_error_is_validation() {
        let err = Asin::parse("nope").unwrap_err();
        assert!(matches!(err, ListingForgeError::Validation { .. }));
        assert!(err.to_string().contains("Invalid ASIN format"));
    }

    #[test]
    fn optimized_listing_requires_all_fields() {
        let ok = r#"{"optimizedTitle":"t","optimizedBullets":["a"],"optimizedDescription":"d","suggestedKeywords":["k"]}"#;
        let parsed: OptimizedListing = serde_json::from_str(ok).expect("parse");
        assert_eq!(parsed.optimized_title, "t");

        let missing = r#"{"optimizedTitle":"t","optimizedBullets":["a"],"optimizedDescription":"d"}"#;
        assert!(serde_json::from_str::<OptimizedListing>(missing).is_err());
    }

    #[test]
    fn record_serializes_camel_case() {
        let now = Utc::now();
        let record = OptimizationRecord {
            id: 7,
            asin: "B07H65KP63".into(),
            original_title: "Old".into(),
            original_bullets: vec!["a".into()],
            original_description: "desc".into(),
            optimized_title: "New".into(),
            optimized_bullets: vec!["b".into()],
            optimized_description: "better".into(),
            suggested_keywords: vec!["kw".into()],
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["originalTitle"], "Old");
        assert_eq!(json["suggestedKeywords"][0], "kw");
        assert!(json.get("createdAt").is_some());
    }
}
