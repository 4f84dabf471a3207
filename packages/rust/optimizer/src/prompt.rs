//! Prompt text and output schema for listing optimization.

use listingforge_shared::ProductListing;
use serde_json::{Value, json};

/// Instruction block describing the rewrite policy and output shape.
pub const SYSTEM_PROMPT: &str = r#"You are an expert Amazon listing optimization specialist. Your goal is to improve product listings for better visibility, conversion, and compliance with Amazon's guidelines.

When optimizing:
1. Title: Make it keyword-rich, readable, and compelling (150-200 characters max)
2. Bullet Points: Make them clear, concise, benefit-focused (5 bullets, each 150-200 characters)
3. Description: Make it persuasive, detailed, and compliant with Amazon guidelines (avoid unsubstantiated claims)
4. Keywords: Suggest 3-5 highly relevant SEO keywords not already in the title

Respond ONLY with valid JSON in this exact format:
{
  "optimizedTitle": "string",
  "optimizedBullets": ["string", "string", "string", "string", "string"],
  "optimizedDescription": "string",
  "suggestedKeywords": ["string", "string", "string"]
}"#;

/// Embed the original listing verbatim, bullets numbered from 1.
pub fn build_user_prompt(listing: &ProductListing) -> String {
    let bullets = listing
        .bullets
        .iter()
        .enumerate()
        .map(|(i, bullet)| format!("{}. {bullet}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Optimize this Amazon product listing:\n\n\
         ORIGINAL TITLE:\n{title}\n\n\
         ORIGINAL BULLET POINTS:\n{bullets}\n\n\
         ORIGINAL DESCRIPTION:\n{description}\n\n\
         Provide optimized version following best practices for Amazon SEO and conversion.",
        title = listing.title,
        description = listing.description,
    )
}

/// Structured-output schema: an object with four required fields.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "optimizedTitle": { "type": "STRING" },
            "optimizedBullets": { "type": "ARRAY", "items": { "type": "STRING" } },
            "optimizedDescription": { "type": "STRING" },
            "suggestedKeywords": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": [
            "optimizedTitle",
            "optimizedBullets",
            "optimizedDescription",
            "suggestedKeywords"
        ]
    })
}
