//! End-to-end `optimize` pipeline: ASIN → validate → fetch → optimize → store.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::task::AbortHandle;
use tracing::{error, info, instrument};

use listingforge_optimizer::{GeminiClient, TextGenerator, optimize_listing};
use listingforge_scraper::ProductFetcher;
use listingforge_shared::{
    AppConfig, Asin, ListingForgeError, NewOptimization, OptimizationRecord, ProductListing,
    Result, expand_home,
};
use listingforge_storage::Storage;

// ---------------------------------------------------------------------------
// Step errors
// ---------------------------------------------------------------------------

/// The pipeline stage an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Validate,
    Fetch,
    Optimize,
    Store,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::Fetch => "fetch",
            Self::Optimize => "optimize",
            Self::Store => "store",
        };
        f.write_str(name)
    }
}

/// A failed run, tagged with the step that failed.
#[derive(Debug, thiserror::Error)]
#[error("{step} step failed: {kind}")]
pub struct PipelineError {
    pub step: PipelineStep,
    #[source]
    pub kind: ListingForgeError,
}

impl PipelineError {
    fn at(step: PipelineStep) -> impl FnOnce(ListingForgeError) -> Self {
        move |kind| Self { step, kind }
    }
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Source of product listings. Infallible: implementations degrade instead.
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listing(&self, asin: &Asin) -> ProductListing;
}

#[async_trait]
impl ListingSource for ProductFetcher {
    async fn fetch_listing(&self, asin: &Asin) -> ProductListing {
        ProductFetcher::fetch_listing(self, asin).await
    }
}

/// Append-only store of optimization records.
#[async_trait]
pub trait OptimizationStore: Send + Sync {
    async fn create_optimization(&self, new: &NewOptimization) -> Result<OptimizationRecord>;
    async fn get_optimizations_by_asin(&self, asin: &str) -> Result<Vec<OptimizationRecord>>;
    async fn get_all_optimizations(&self) -> Result<Vec<OptimizationRecord>>;
}

#[async_trait]
impl OptimizationStore for Storage {
    async fn create_optimization(&self, new: &NewOptimization) -> Result<OptimizationRecord> {
        Storage::create_optimization(self, new).await
    }

    async fn get_optimizations_by_asin(&self, asin: &str) -> Result<Vec<OptimizationRecord>> {
        Storage::get_optimizations_by_asin(self, asin).await
    }

    async fn get_all_optimizations(&self) -> Result<Vec<OptimizationRecord>> {
        Storage::get_all_optimizations(self).await
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, record: &OptimizationRecord);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _record: &OptimizationRecord) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Cancels the fetch task when a run is dropped mid-fetch.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The optimize workflow with its collaborators wired in.
///
/// Cheap to clone; every run shares the same store.
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn ListingSource>,
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn OptimizationStore>,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn ListingSource>,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn OptimizationStore>,
    ) -> Self {
        Self {
            source,
            generator,
            store,
        }
    }

    /// Build the production pipeline: live scraper, Gemini, libSQL at
    /// `config.storage.db_path`.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let db_path = expand_home(&config.storage.db_path)?;
        let storage = Storage::open(&db_path).await?;
        Self::with_storage(config, storage)
    }

    /// Like [`Pipeline::from_config`] but with an already-open database.
    pub fn with_storage(config: &AppConfig, storage: Storage) -> Result<Self> {
        let fetcher = ProductFetcher::new(&config.scraper)?;
        let gemini = GeminiClient::from_config(&config.gemini)?;
        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(gemini),
            Arc::new(storage),
        ))
    }

    /// Run one optimization for `raw_asin` and persist the result.
    ///
    /// Validation happens before any I/O. No step is retried and nothing is
    /// stored unless every step succeeds.
    #[instrument(skip_all, fields(asin = %raw_asin))]
    pub async fn optimize(
        &self,
        raw_asin: &str,
        progress: &dyn ProgressReporter,
    ) -> std::result::Result<OptimizationRecord, PipelineError> {
        let start = Instant::now();

        // --- Step 1: Validate ---
        progress.phase("Validating ASIN");
        let asin = Asin::parse(raw_asin).map_err(PipelineError::at(PipelineStep::Validate))?;

        // --- Step 2: Fetch (degrades, only a crashed task fails) ---
        progress.phase("Fetching product page");
        let source = Arc::clone(&self.source);
        let fetch_asin = asin.clone();
        let task = tokio::spawn(async move { source.fetch_listing(&fetch_asin).await });
        let _abort = AbortOnDrop(task.abort_handle());
        let listing = task
            .await
            .map_err(|e| {
                error!(error = %e, "fetch task failed");
                PipelineError {
                    step: PipelineStep::Fetch,
                    kind: ListingForgeError::Network(format!(
                        "Failed to fetch product data from Amazon: {e}"
                    )),
                }
            })?;

        // --- Step 3: Optimize ---
        progress.phase("Optimizing with Gemini");
        let optimized = optimize_listing(self.generator.as_ref(), &listing)
            .await
            .map_err(PipelineError::at(PipelineStep::Optimize))?;

        // --- Step 4: Store ---
        progress.phase("Saving optimization");
        let new = NewOptimization::new(listing, optimized);
        let record = self.store.create_optimization(&new).await.map_err(|e| {
            error!(error = %e, "failed to store optimization");
            PipelineError {
                step: PipelineStep::Store,
                kind: e,
            }
        })?;

        info!(
            id = record.id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "optimization complete"
        );
        progress.done(&record);
        Ok(record)
    }

    /// Every stored record, newest first.
    pub async fn history(&self) -> Result<Vec<OptimizationRecord>> {
        self.store.get_all_optimizations().await
    }

    /// Stored records for one ASIN, newest first. No format check is applied.
    pub async fn history_for(&self, asin: &str) -> Result<Vec<OptimizationRecord>> {
        self.store.get_optimizations_by_asin(asin).await
    }
}
