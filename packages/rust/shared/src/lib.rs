//! Shared types, error model, and configuration for ListingForge.
//!
//! This crate is the foundation depended on by all other ListingForge crates.
//! It provides:
//! - [`ListingForgeError`]: the unified error type
//! - Domain types ([`Asin`], [`ProductListing`], [`OptimizedListing`], [`OptimizationRecord`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GeminiConfig, ScraperConfig, ServerConfig, StorageConfig, api_key_present,
    config_dir, config_file_path, expand_home, init_config, load_config, load_config_from,
    parse_base_url,
};
pub use error::{ListingForgeError, Result};
pub use types::{
    Asin, NewOptimization, OptimizationRecord, OptimizedListing, ProductListing,
    ValidationIssue,
};
