//! Core pipeline orchestration for ListingForge.
//!
//! This crate ties together scraping, AI optimization, and storage into the
//! end-to-end `optimize` workflow, plus the history reads served alongside it.

pub mod pipeline;

pub use pipeline::{
    ListingSource, OptimizationStore, Pipeline, PipelineError, PipelineStep, ProgressReporter,
    SilentProgress,
};
