//! Product page scraping: extraction policy and fetch-with-degrade.
//!
//! This crate provides:
//! - [`extract`]: Deterministic field extraction from product page HTML
//! - [`fetch`]: [`ProductFetcher`], which never fails and falls back to
//!   placeholder data when the live page is unavailable

pub mod extract;
pub mod fetch;

pub use extract::{extract_listing, fallback_description, filler_bullets, normalize_description};
pub use fetch::{ProductFetcher, ScrapeFailure, placeholder_listing};
