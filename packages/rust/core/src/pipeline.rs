//! End-to-end `search` pipeline: config → explore → deduplicate → persist.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument};

use mapsweep_provider::{HttpProvider, ProviderOptions};
use mapsweep_search::{ExploreProgress, ExploreStats, Explorer};
use mapsweep_shared::{
    BusinessRecord, DetailExtractor, DistanceUnit, ExploreConfig, LatLng, ListingSource,
    MapSweepError, PersistOutcome, Result, ResultSink, RunId, SearchRegion,
};

/// Configuration for one sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Identifier the run is recorded under.
    pub run_id: RunId,
    /// Business category, e.g. "factories".
    pub category: String,
    /// Center of the initial region.
    pub center: LatLng,
    /// Radius of the initial region, in `unit`.
    pub radius: f64,
    pub unit: DistanceUnit,
    /// Engine policy.
    pub explore: ExploreConfig,
}

impl SweepConfig {
    pub fn new(
        category: impl Into<String>,
        center: LatLng,
        radius: f64,
        unit: DistanceUnit,
        explore: ExploreConfig,
    ) -> Self {
        Self {
            run_id: RunId::new(),
            category: category.into(),
            center,
            radius,
            unit,
            explore,
        }
    }

    /// The depth-0 region the sweep starts from.
    pub fn initial_region(&self) -> SearchRegion {
        SearchRegion::root(self.center, self.radius, self.unit)
    }

    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(MapSweepError::config("category must not be empty"));
        }
        self.initial_region().validate()?;
        self.explore.validate()
    }
}

/// The two collaborators the explorer queries.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ListingSource>,
    pub extractor: Arc<dyn DetailExtractor>,
}

impl Collaborators {
    pub fn new(source: Arc<dyn ListingSource>, extractor: Arc<dyn DetailExtractor>) -> Self {
        Self { source, extractor }
    }

    /// One HTTP sidecar client serving both roles.
    pub fn http(opts: &ProviderOptions) -> Result<Self> {
        let provider = Arc::new(HttpProvider::new(opts)?);
        Ok(Self {
            source: provider.clone(),
            extractor: provider,
        })
    }
}

/// Result of the `search` pipeline.
#[derive(Debug)]
pub struct SweepSummary {
    pub run_id: RunId,
    /// Deduplicated records, in first-seen order.
    pub records: Vec<BusinessRecord>,
    /// What the sink did with `records`.
    pub persisted: PersistOutcome,
    /// Set when the sink failed; `records` are still returned.
    pub persist_error: Option<String>,
    pub stats: ExploreStats,
    /// Failed regions and listings as `(target, message)`.
    pub errors: Vec<(String, String)>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl SweepSummary {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Stats as a JSON object for the `runs` table.
    pub fn stats_json(&self) -> String {
        serde_json::json!({
            "records": self.records.len(),
            "inserted": self.persisted.inserted,
            "skipped": self.persisted.skipped,
            "persist_error": self.persist_error,
            "regions_enqueued": self.stats.regions_enqueued,
            "regions_searched": self.stats.regions_searched,
            "regions_failed": self.stats.regions_failed,
            "regions_subdivided": self.stats.regions_subdivided,
            "search_calls": self.stats.search_calls,
            "detail_fetches": self.stats.detail_fetches,
            "duplicates_skipped": self.stats.duplicates_skipped,
            "max_depth_reached": self.stats.max_depth_reached,
            "errors": self.errors.len(),
            "elapsed_ms": self.elapsed.as_millis() as u64,
        })
        .to_string()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each region search.
    fn region_searched(&self, region: &SearchRegion, listings: usize, accepted: usize);
    /// Called when a saturated region is split.
    fn region_subdivided(&self, _region: &SearchRegion, _children: usize) {}
    /// Called when the pipeline completes.
    fn done(&self, summary: &SweepSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn region_searched(&self, _region: &SearchRegion, _listings: usize, _accepted: usize) {}
    fn done(&self, _summary: &SweepSummary) {}
}

/// Run the full `search` pipeline.
///
/// 1. Validate the configuration
/// 2. Explore the initial region
/// 3. Persist the deduplicated records to `sink`
///
/// A sink failure is recorded in [`SweepSummary::persist_error`] instead of
/// discarding the exploration.
#[instrument(skip_all, fields(run_id = %config.run_id, category = %config.category))]
pub async fn run_sweep(
    config: &SweepConfig,
    collaborators: Collaborators,
    sink: &dyn ResultSink,
    progress: &dyn ProgressReporter,
) -> Result<SweepSummary> {
    let start = Instant::now();

    config.validate()?;
    let region = config.initial_region();

    info!(%region, "starting sweep");

    // --- Phase 1: Explore ---
    progress.phase("Exploring regions");
    let explorer = Explorer::new(
        config.explore.clone(),
        collaborators.source,
        collaborators.extractor,
    )?;
    let explore_progress = PipelineExploreProgress { inner: progress };
    let exploration = explorer
        .explore(region, &config.category, &explore_progress)
        .await?;

    // --- Phase 2: Persist ---
    progress.phase(&format!("Saving {} records", exploration.records.len()));
    let (persisted, persist_error) = match sink.persist(&exploration.records).await {
        Ok(outcome) => (outcome, None),
        Err(e) => {
            error!(sink = sink.name(), error = %e, "failed to persist records");
            (PersistOutcome::default(), Some(e.to_string()))
        }
    };

    let summary = SweepSummary {
        run_id: config.run_id.clone(),
        records: exploration.records,
        persisted,
        persist_error,
        stats: exploration.stats,
        errors: exploration.errors,
        elapsed: start.elapsed(),
    };

    progress.done(&summary);

    info!(
        records = summary.record_count(),
        inserted = summary.persisted.inserted,
        skipped = summary.persisted.skipped,
        sink = sink.name(),
        errors = summary.errors.len(),
        elapsed_ms = summary.elapsed.as_millis(),
        "sweep complete"
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Explore progress adapter
// ---------------------------------------------------------------------------

/// Adapts a `ProgressReporter` to the `ExploreProgress` interface.
struct PipelineExploreProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl ExploreProgress for PipelineExploreProgress<'_> {
    fn region_searched(&self, region: &SearchRegion, listings: usize, accepted: usize) {
        self.inner.region_searched(region, listings, accepted);
    }

    fn region_subdivided(&self, region: &SearchRegion, children: usize) {
        self.inner.region_subdivided(region, children);
    }
}
