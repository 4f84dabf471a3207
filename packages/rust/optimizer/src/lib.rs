//! Generative-AI listing optimization.
//!
//! Builds the prompt and output schema for a [`ProductListing`], sends it to a
//! [`TextGenerator`] (in production, [`GeminiClient`]), and parses the reply
//! into an [`OptimizedListing`]. Failures here are never degraded: there is
//! no sensible placeholder for optimized content.

pub mod gemini;
pub mod prompt;

use async_trait::async_trait;
use listingforge_shared::{ListingForgeError, OptimizedListing, ProductListing, Result};
use serde_json::Value;
use tracing::{error, info, instrument};

pub use gemini::GeminiClient;
pub use prompt::{SYSTEM_PROMPT, build_user_prompt, response_schema};

/// A structured-output request for a text generation service.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub user_prompt: String,
    /// Schema the response text must conform to.
    pub response_schema: Value,
}

impl GenerationRequest {
    /// The optimization request for a listing.
    pub fn for_listing(listing: &ProductListing) -> Self {
        Self {
            system_instruction: SYSTEM_PROMPT.to_string(),
            user_prompt: build_user_prompt(listing),
            response_schema: response_schema(),
        }
    }
}

/// A generative text service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run the request, returning the raw response text (`None` if the
    /// service answered without any text).
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>>;
}

/// Optimize a listing through `generator`.
#[instrument(skip_all, fields(asin = %listing.asin))]
pub async fn optimize_listing(
    generator: &dyn TextGenerator,
    listing: &ProductListing,
) -> Result<OptimizedListing> {
    let request = GenerationRequest::for_listing(listing);

    let result = generator
        .generate(&request)
        .await
        .and_then(|raw| parse_optimized(raw.as_deref()));

    match &result {
        Ok(optimized) => info!(
            bullets = optimized.optimized_bullets.len(),
            keywords = optimized.suggested_keywords.len(),
            "listing optimized"
        ),
        Err(e) => error!(error = %e, "listing optimization failed"),
    }
    result
}

/// Schema-checked parse of the model's response text.
pub fn parse_optimized(raw: Option<&str>) -> Result<OptimizedListing> {
    let raw = raw
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ListingForgeError::Optimization("Empty response from Gemini AI".into()))?;

    serde_json::from_str(raw).map_err(|e| ListingForgeError::Optimization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use listingforge_shared::Asin;
    use std::sync::Mutex;

    /// Replays a canned response and records the request it received.
    struct Canned {
        response: Result<Option<String>>,
        seen: Mutex<Option<GenerationRequest>>,
    }

    impl Canned {
        fn text(text: &str) -> Self {
            Self {
                response: Ok(Some(text.to_string())),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>> {
            *self.seen.lock().unwrap() = Some(request.clone());
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(ListingForgeError::Optimization(e.to_string())),
            }
        }
    }

    fn listing() -> ProductListing {
        ProductListing {
            asin: Asin::parse("B07H65KP63").unwrap(),
            title: "Acme Kettle".into(),
            bullets: vec!["Fast boil".into()],
            description: "A kettle.".into(),
        }
    }

    const VALID: &str = r#"{
        "optimizedTitle": "Acme 1.7L Electric Kettle",
        "optimizedBullets": ["a", "b", "c", "d", "e"],
        "optimizedDescription": "Better kettle.",
        "suggestedKeywords": ["tea kettle", "hot water", "stainless"]
    }"#;

    #[tokio::test]
    async fn optimizes_with_valid_response() {
        let generator = Canned::text(VALID);
        let optimized = optimize_listing(&generator, &listing()).await.unwrap();
        assert_eq!(optimized.optimized_title, "Acme 1.7L Electric Kettle");
        assert_eq!(optimized.optimized_bullets.len(), 5);
        assert_eq!(optimized.suggested_keywords.len(), 3);

        let seen = generator.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.system_instruction, SYSTEM_PROMPT);
        assert!(seen.user_prompt.contains("1. Fast boil"));
    }

    #[tokio::test]
    async fn non_json_response_fails() {
        let generator = Canned::text("Sure! Here is your optimized listing.");
        let err = optimize_listing(&generator, &listing()).await.unwrap_err();
        assert!(matches!(err, ListingForgeError::Optimization(_)));
    }

    #[tokio::test]
    async fn generator_error_propagates() {
        let generator = Canned {
            response: Err(ListingForgeError::Optimization("quota".into())),
            seen: Mutex::new(None),
        };
        let err = optimize_listing(&generator, &listing()).await.unwrap_err();
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn empty_response_is_reported() {
        for raw in [None, Some(""), Some("   ")] {
            let err = parse_optimized(raw).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Failed to optimize listing with AI: Empty response from Gemini AI"
            );
        }
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let wrong_types = r#"{"optimizedTitle": 5, "optimizedBullets": [], "optimizedDescription": "", "suggestedKeywords": []}"#;
        assert!(parse_optimized(Some(wrong_types)).is_err());

        let missing = r#"{"optimizedTitle": "t", "optimizedBullets": []}"#;
        assert!(parse_optimized(Some(missing)).is_err());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let extra = r#"{"optimizedTitle": "t", "optimizedBullets": [], "optimizedDescription": "d", "suggestedKeywords": [], "notes": "x"}"#;
        assert!(parse_optimized(Some(extra)).is_ok());
    }
}
