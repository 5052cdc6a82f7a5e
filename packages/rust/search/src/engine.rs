//! Adaptive area-partitioning search engine.
//!
//! The explorer starts from one region, asks the listing source what it
//! holds, and splits the region into smaller overlapping children whenever
//! the result page comes back full. Every listing is resolved to a record
//! and funnelled through a shared [`DedupStore`], so a business surfaced by
//! several overlapping regions is kept once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use mapsweep_geo::{child_radius_m, subdivide};
use mapsweep_shared::{
    BusinessRecord, DetailExtractor, ExploreConfig, ListingHandle, ListingSource, MapSweepError,
    Result, SearchRegion,
};

use crate::dedup::DedupStore;
use crate::queue::RegionQueue;
use crate::retry::RetryPolicy;
use crate::throttle::RateLimiter;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Counters describing one exploration.
#[derive(Debug, Clone, Default)]
pub struct ExploreStats {
    /// Regions ever pushed onto the queue.
    pub regions_enqueued: usize,
    /// Regions popped and searched, failed ones included.
    pub regions_searched: usize,
    /// Regions whose search failed after all retries.
    pub regions_failed: usize,
    /// Regions that were split into children.
    pub regions_subdivided: usize,
    /// Listing source calls, retries included.
    pub search_calls: usize,
    /// Detail extractor calls, retries included.
    pub detail_fetches: usize,
    /// Listings dropped because their business was already captured.
    pub duplicates_skipped: usize,
    /// Deepest region searched.
    pub max_depth_reached: u32,
    /// Wall-clock duration of the exploration.
    pub duration: Duration,
}

/// Outcome of [`Explorer::explore`].
#[derive(Debug, Clone)]
pub struct Exploration {
    /// Every accepted record, in first-seen order.
    pub records: Vec<BusinessRecord>,
    pub stats: ExploreStats,
    /// Failed regions and listings as `(target, message)`.
    pub errors: Vec<(String, String)>,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Observer for per-region progress. Called from the exploration loop.
pub trait ExploreProgress: Send + Sync {
    /// A region was searched; `accepted` of its `listings` were new businesses.
    fn region_searched(&self, region: &SearchRegion, listings: usize, accepted: usize);
    /// A saturated region was split into `children` sub-regions.
    fn region_subdivided(&self, region: &SearchRegion, children: usize);
}

/// No-op progress observer.
pub struct SilentProgress;

impl ExploreProgress for SilentProgress {
    fn region_searched(&self, _region: &SearchRegion, _listings: usize, _accepted: usize) {}
    fn region_subdivided(&self, _region: &SearchRegion, _children: usize) {}
}

// ---------------------------------------------------------------------------
// Explorer
// ---------------------------------------------------------------------------

/// Drives the region queue to completion against the two collaborators.
pub struct Explorer {
    config: ExploreConfig,
    source: Arc<dyn ListingSource>,
    extractor: Arc<dyn DetailExtractor>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl Explorer {
    /// Create an explorer. Fails with a config error if `config` is out of bounds.
    pub fn new(
        config: ExploreConfig,
        source: Arc<dyn ListingSource>,
        extractor: Arc<dyn DetailExtractor>,
    ) -> Result<Self> {
        config.validate()?;
        let limiter = Arc::new(RateLimiter::new(config.request_delay()));
        let retry = RetryPolicy::from(&config);
        Ok(Self {
            config,
            source,
            extractor,
            limiter,
            retry,
        })
    }

    pub fn config(&self) -> &ExploreConfig {
        &self.config
    }

    /// Find every business of `category` inside `initial`.
    ///
    /// Returns an error only for invalid input; region and listing failures
    /// are logged, collected in [`Exploration::errors`], and skipped.
    #[instrument(skip_all, fields(category = %category, region = %initial))]
    pub async fn explore(
        &self,
        initial: SearchRegion,
        category: &str,
        progress: &dyn ExploreProgress,
    ) -> Result<Exploration> {
        let start_time = Instant::now();

        initial.validate()?;
        if initial.depth != 0 {
            return Err(MapSweepError::config(format!(
                "initial region must have depth 0, got {}",
                initial.depth
            )));
        }
        let category = category.trim();
        if category.is_empty() {
            return Err(MapSweepError::config("category must not be empty"));
        }

        let ctx = Arc::new(RegionContext {
            source: self.source.clone(),
            extractor: self.extractor.clone(),
            limiter: self.limiter.clone(),
            retry: self.retry,
            category: category.to_string(),
            dedup: Mutex::new(DedupStore::new()),
        });

        let mut queue = RegionQueue::new();
        queue.push(initial);

        let mut stats = ExploreStats::default();
        let mut errors: Vec<(String, String)> = Vec::new();

        info!(
            max_depth = self.config.max_depth,
            fanout = self.config.fanout,
            page_cap = self.config.page_cap,
            concurrency = self.config.concurrency,
            region_budget = self.config.region_budget(),
            "starting exploration"
        );

        while !queue.is_empty() {
            // Take a batch from the queue (up to concurrency limit)
            let batch = queue.drain_batch(self.config.concurrency as usize);

            let handles: Vec<_> = batch
                .into_iter()
                .map(|region| (region, tokio::spawn(search_region(ctx.clone(), region))))
                .collect();

            for (region, handle) in handles {
                stats.regions_searched += 1;
                stats.max_depth_reached = stats.max_depth_reached.max(region.depth);

                let report = match handle.await {
                    Ok(report) => report,
                    Err(e) => {
                        warn!(%region, error = %e, "region task failed");
                        stats.regions_failed += 1;
                        errors.push((region.to_string(), e.to_string()));
                        continue;
                    }
                };

                stats.search_calls += report.search_calls;
                stats.detail_fetches += report.detail_fetches;
                stats.duplicates_skipped += report.duplicates;
                errors.extend(report.errors);

                let Some(listings) = report.listings else {
                    // Failed search: zero results, never subdivided.
                    stats.regions_failed += 1;
                    continue;
                };

                progress.region_searched(&region, listings, report.accepted);

                if listings < self.config.page_cap {
                    debug!(%region, listings, "region below page cap; covered");
                    continue;
                }

                if region.depth >= self.config.max_depth {
                    debug!(%region, listings, "region saturated at max depth; not subdividing");
                    continue;
                }

                let child_radius = child_radius_m(&region, self.config.subdivision_factor);
                if child_radius < self.config.min_radius_m {
                    debug!(
                        %region,
                        child_radius_m = child_radius,
                        min_radius_m = self.config.min_radius_m,
                        "region saturated but children would be too small; not subdividing"
                    );
                    continue;
                }

                let children =
                    subdivide(&region, self.config.fanout, self.config.subdivision_factor);
                debug!(%region, listings, children = children.len(), "region saturated; subdividing");
                progress.region_subdivided(&region, children.len());
                stats.regions_subdivided += 1;
                queue.extend(children);
            }
        }

        stats.regions_enqueued = queue.total_enqueued();
        stats.duration = start_time.elapsed();

        let records = std::mem::take(&mut *ctx.dedup.lock().await).into_records();

        info!(
            records = records.len(),
            regions_searched = stats.regions_searched,
            regions_subdivided = stats.regions_subdivided,
            search_calls = stats.search_calls,
            detail_fetches = stats.detail_fetches,
            duplicates_skipped = stats.duplicates_skipped,
            errors = errors.len(),
            duration_ms = stats.duration.as_millis(),
            "exploration completed"
        );

        Ok(Exploration {
            records,
            stats,
            errors,
        })
    }
}

// ---------------------------------------------------------------------------
// Per-region work
// ---------------------------------------------------------------------------

/// State shared by all region tasks of one exploration.
struct RegionContext {
    source: Arc<dyn ListingSource>,
    extractor: Arc<dyn DetailExtractor>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    category: String,
    dedup: Mutex<DedupStore>,
}

/// What one region task found.
#[derive(Debug, Default)]
struct RegionReport {
    /// Listing count, or `None` if the search itself failed.
    listings: Option<usize>,
    accepted: usize,
    duplicates: usize,
    search_calls: usize,
    detail_fetches: usize,
    errors: Vec<(String, String)>,
}

/// Search one region and resolve its listings into the dedup store.
async fn search_region(ctx: Arc<RegionContext>, region: SearchRegion) -> RegionReport {
    let mut report = RegionReport::default();

    let source = &ctx.source;
    let category = ctx.category.as_str();
    let target = &region;
    let searched = ctx
        .retry
        .run(&ctx.limiter, "search", move || source.search(target, category))
        .await;
    report.search_calls = searched.attempts as usize;

    let listings = match searched.result {
        Ok(listings) => listings,
        Err(e) => {
            warn!(%region, error = %e, "search failed; skipping region");
            report.errors.push((region.to_string(), e.to_string()));
            return report;
        }
    };
    report.listings = Some(listings.len());
    debug!(%region, listings = listings.len(), "region searched");

    for handle in &listings {
        if let Some(key) = handle.pre_key() {
            if ctx.dedup.lock().await.contains(&key) {
                report.duplicates += 1;
                continue;
            }
        }

        match fetch_record(&ctx, handle, &mut report).await {
            Ok(record) => match ctx.dedup.lock().await.insert(record) {
                Ok(true) => report.accepted += 1,
                Ok(false) => report.duplicates += 1,
                Err(e) => {
                    warn!(listing = %handle.id, error = %e, "record rejected");
                    report.errors.push((listing_label(handle), e.to_string()));
                }
            },
            Err(e) => {
                warn!(listing = %handle.id, error = %e, "detail fetch failed; skipping listing");
                report.errors.push((listing_label(handle), e.to_string()));
            }
        }
    }

    report
}

async fn fetch_record(
    ctx: &RegionContext,
    handle: &ListingHandle,
    report: &mut RegionReport,
) -> Result<BusinessRecord> {
    let extractor = &ctx.extractor;
    let fetched = ctx
        .retry
        .run(&ctx.limiter, "fetch", move || extractor.fetch(handle))
        .await;
    report.detail_fetches += fetched.attempts as usize;
    fetched.result
}

fn listing_label(handle: &ListingHandle) -> String {
    format!("listing {}", handle.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mapsweep_shared::{DistanceUnit, LatLng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAGE_CAP: usize = 20;

    fn root_center() -> LatLng {
        LatLng::new(41.8781, -87.6298)
    }

    fn root_region() -> SearchRegion {
        SearchRegion::root(root_center(), 5.0, DistanceUnit::Kilometers)
    }

    fn test_config() -> ExploreConfig {
        ExploreConfig {
            max_depth: 2,
            fanout: 4,
            subdivision_factor: 2.0,
            page_cap: PAGE_CAP,
            max_retries: 2,
            retry_backoff_ms: 0,
            request_delay_ms: 0,
            concurrency: 1,
            min_radius_m: 0.0,
        }
    }

    /// Bare handles `<prefix>-0 .. <prefix>-(n-1)`.
    fn listings(prefix: &str, n: usize) -> Vec<ListingHandle> {
        (0..n)
            .map(|i| ListingHandle::bare(format!("{prefix}-{i}")))
            .collect()
    }

    /// Handles carrying the summary fields the fake extractor will return.
    fn summarized(prefix: &str, n: usize) -> Vec<ListingHandle> {
        listings(prefix, n)
            .into_iter()
            .map(|h| ListingHandle {
                name: Some(format!("Biz {}", h.id)),
                address: Some(format!("{} Industrial Pkwy", h.id)),
                ..h
            })
            .collect()
    }

    /// Stable per-region label for fake sources.
    fn region_tag(region: &SearchRegion) -> String {
        format!("d{}@{:.6},{:.6}", region.depth, region.center.lat, region.center.lng)
    }

    type SearchFn = dyn Fn(&SearchRegion) -> Result<Vec<ListingHandle>> + Send + Sync;

    struct FakeSource {
        respond: Box<SearchFn>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(
            respond: impl Fn(&SearchRegion) -> Result<Vec<ListingHandle>> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                respond: Box::new(respond),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ListingSource for FakeSource {
        async fn search(
            &self,
            region: &SearchRegion,
            _category: &str,
        ) -> Result<Vec<ListingHandle>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)(region)
        }
    }

    /// Builds a record from the handle id; ids starting with `bad-` fail to parse.
    #[derive(Default)]
    struct FakeExtractor {
        calls: AtomicUsize,
    }

    impl FakeExtractor {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DetailExtractor for FakeExtractor {
        async fn fetch(&self, handle: &ListingHandle) -> Result<BusinessRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if handle.id.starts_with("bad-") {
                return Err(MapSweepError::parse(format!("{}: malformed detail", handle.id)));
            }
            if handle.id.starts_with("noaddr-") {
                return Ok(BusinessRecord::new(format!("Biz {}", handle.id), "N/A"));
            }
            Ok(BusinessRecord::new(
                format!("Biz {}", handle.id),
                format!("{} Industrial Pkwy", handle.id),
            ))
        }
    }

    fn explorer(
        config: ExploreConfig,
        source: &Arc<FakeSource>,
        extractor: &Arc<FakeExtractor>,
    ) -> Explorer {
        Explorer::new(config, source.clone(), extractor.clone()).unwrap()
    }

    #[derive(Default)]
    struct CountingProgress {
        searched: AtomicUsize,
        subdivided: AtomicUsize,
    }

    impl ExploreProgress for CountingProgress {
        fn region_searched(&self, _region: &SearchRegion, _listings: usize, _accepted: usize) {
            self.searched.fetch_add(1, Ordering::SeqCst);
        }
        fn region_subdivided(&self, _region: &SearchRegion, _children: usize) {
            self.subdivided.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn saturated_root_with_distinct_children() {
        let source = FakeSource::new(|region| {
            if region.depth == 0 {
                Ok(listings("root", PAGE_CAP))
            } else {
                Ok(listings(&region_tag(region), 5))
            }
        });
        let extractor = Arc::new(FakeExtractor::default());
        let progress = CountingProgress::default();

        let result = explorer(test_config(), &source, &extractor)
            .explore(root_region(), "factories", &progress)
            .await
            .unwrap();

        assert_eq!(result.records.len(), 20 + 4 * 5);
        assert!(result.errors.is_empty());
        assert_eq!(source.calls(), 5);
        assert_eq!(result.stats.regions_subdivided, 1);
        assert_eq!(result.stats.duplicates_skipped, 0);
        assert_eq!(result.stats.regions_enqueued, result.stats.regions_searched);
        assert_eq!(result.stats.max_depth_reached, 1);
        assert_eq!(progress.searched.load(Ordering::SeqCst), 5);
        assert_eq!(progress.subdivided.load(Ordering::SeqCst), 1);

        let mut keys: Vec<_> = result
            .records
            .iter()
            .map(|r| r.identity_key().unwrap())
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 40, "no duplicate identity keys");
    }

    #[tokio::test]
    async fn fully_overlapping_children_add_nothing() {
        let source = FakeSource::new(|_| Ok(listings("shared", PAGE_CAP)));
        let extractor = Arc::new(FakeExtractor::default());

        let result = explorer(test_config(), &source, &extractor)
            .explore(root_region(), "factories", &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.records.len(), 20);
        // Every level saturates until max depth: 1 + 4 + 16 regions.
        assert_eq!(source.calls(), 21);
        // Bare handles have no pre-key, so every listing is fetched.
        assert_eq!(extractor.calls(), 21 * 20);
        assert_eq!(result.stats.duplicates_skipped, 20 * 20);
    }

    #[tokio::test]
    async fn pre_key_skips_detail_fetches_for_known_businesses() {
        let source = FakeSource::new(|_| Ok(summarized("shared", PAGE_CAP)));
        let extractor = Arc::new(FakeExtractor::default());

        let result = explorer(test_config(), &source, &extractor)
            .explore(root_region(), "factories", &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.records.len(), 20);
        assert_eq!(extractor.calls(), 20);
        assert_eq!(result.stats.detail_fetches, 20);
        assert_eq!(result.stats.duplicates_skipped, 20 * 20);
    }

    #[tokio::test]
    async fn terminates_within_region_budget() {
        let grid = (0..=4u32)
            .flat_map(|depth| (2..=5u32).map(move |fanout| (depth, fanout)))
            .chain([(6, 2), (5, 3), (3, 8)]);

        for (max_depth, fanout) in grid {
            let source = FakeSource::new(|_| Ok(summarized("same", 3)));
            let extractor = Arc::new(FakeExtractor::default());
            let config = ExploreConfig {
                max_depth,
                fanout,
                page_cap: 3,
                ..test_config()
            };
            let budget = config.region_budget() as usize;

            let result = explorer(config, &source, &extractor)
                .explore(root_region(), "factories", &SilentProgress)
                .await
                .unwrap();

            let k = fanout as usize;
            let bound = (k.pow(max_depth + 1) - 1) / (k - 1);
            assert_eq!(budget, bound);
            assert!(
                source.calls() <= bound,
                "depth {max_depth} fanout {fanout}: {} calls > {bound}",
                source.calls()
            );
            // Always saturated, so the whole tree is visited.
            assert_eq!(source.calls(), bound);
            assert_eq!(result.stats.max_depth_reached, max_depth);
            assert_eq!(result.records.len(), 3);
        }
    }

    #[tokio::test]
    async fn below_cap_region_is_never_subdivided() {
        let source = FakeSource::new(|_| Ok(listings("few", PAGE_CAP - 1)));
        let extractor = Arc::new(FakeExtractor::default());

        let result = explorer(test_config(), &source, &extractor)
            .explore(root_region(), "factories", &SilentProgress)
            .await
            .unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(result.stats.regions_enqueued, 1);
        assert_eq!(result.stats.regions_subdivided, 0);
        assert_eq!(result.records.len(), PAGE_CAP - 1);
    }

    #[tokio::test]
    async fn only_saturated_children_recurse() {
        // Root and the first child saturate; every other region is sparse.
        let source = FakeSource::new(|region| {
            let north_child = region.depth == 1 && region.center.lat > root_center().lat + 1e-6;
            if region.depth == 0 || north_child {
                Ok(listings(&region_tag(region), PAGE_CAP))
            } else {
                Ok(listings(&region_tag(region), 2))
            }
        });
        let extractor = Arc::new(FakeExtractor::default());

        let result = explorer(test_config(), &source, &extractor)
            .explore(root_region(), "factories", &SilentProgress)
            .await
            .unwrap();

        // root + 4 children + 4 grandchildren under the north child
        assert_eq!(source.calls(), 9);
        assert_eq!(result.stats.regions_subdivided, 2);
        assert_eq!(result.records.len(), 20 + 20 + 3 * 2 + 4 * 2);
    }

    #[tokio::test]
    async fn failing_region_is_isolated() {
        let source = FakeSource::new(|region| {
            let north_child = region.depth == 1
                && region.center.lat > root_center().lat + 1e-6
                && (region.center.lng - root_center().lng).abs() < 1e-9;
            match region.depth {
                0 => Ok(listings("root", PAGE_CAP)),
                _ if north_child => Err(MapSweepError::Provider("automation blocked".into())),
                _ => Ok(listings(&region_tag(region), 5)),
            }
        });
        let extractor = Arc::new(FakeExtractor::default());

        let result = explorer(test_config(), &source, &extractor)
            .explore(root_region(), "factories", &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.records.len(), 20 + 3 * 5);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].1.contains("automation blocked"));
        assert_eq!(result.stats.regions_failed, 1);
        // root + 3 healthy children + 3 attempts on the failing one
        assert_eq!(source.calls(), 1 + 3 + 3);
        assert_eq!(result.stats.search_calls, 7);
        assert_eq!(result.stats.regions_searched, 5);
    }

    #[tokio::test]
    async fn failed_saturated_search_does_not_subdivide() {
        let source = FakeSource::new(|_| Err(MapSweepError::Provider("down".into())));
        let extractor = Arc::new(FakeExtractor::default());

        let result = explorer(test_config(), &source, &extractor)
            .explore(root_region(), "factories", &SilentProgress)
            .await
            .unwrap();

        assert!(result.records.is_empty());
        assert_eq!(source.calls(), 3);
        assert_eq!(result.stats.regions_enqueued, 1);
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn unparseable_listings_are_skipped_without_retry() {
        let source = FakeSource::new(|_| {
            let mut page = listings("ok", 3);
            page.push(ListingHandle::bare("bad-1"));
            page.push(ListingHandle::bare("noaddr-1"));
            Ok(page)
        });
        let extractor = Arc::new(FakeExtractor::default());

        let result = explorer(test_config(), &source, &extractor)
            .explore(root_region(), "factories", &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.records.len(), 3);
        assert_eq!(extractor.calls(), 5, "parse errors are not retried");
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().any(|(target, _)| target == "listing bad-1"));
        assert!(result.errors.iter().any(|(target, _)| target == "listing noaddr-1"));
    }

    #[tokio::test]
    async fn min_radius_stops_subdivision() {
        let source = FakeSource::new(|_| Ok(listings("dense", PAGE_CAP)));
        let extractor = Arc::new(FakeExtractor::default());
        let config = ExploreConfig {
            min_radius_m: 600.0,
            ..test_config()
        };
        let region = SearchRegion::root(root_center(), 1.0, DistanceUnit::Kilometers);

        let result = explorer(config, &source, &extractor)
            .explore(region, "factories", &SilentProgress)
            .await
            .unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(result.stats.regions_subdivided, 0);
    }

    #[tokio::test]
    async fn invalid_input_fails_before_any_query() {
        let source = FakeSource::new(|_| Ok(listings("x", 1)));
        let extractor = Arc::new(FakeExtractor::default());
        let explorer = explorer(test_config(), &source, &extractor);

        let err = explorer
            .explore(root_region(), "   ", &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, MapSweepError::Config { .. }));

        let nested = SearchRegion {
            depth: 1,
            ..root_region()
        };
        assert!(explorer.explore(nested, "factories", &SilentProgress).await.is_err());

        let flat = SearchRegion {
            radius: -1.0,
            ..root_region()
        };
        assert!(explorer.explore(flat, "factories", &SilentProgress).await.is_err());

        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let source = FakeSource::new(|_| Ok(Vec::new()));
        let extractor = Arc::new(FakeExtractor::default());
        let config = ExploreConfig {
            subdivision_factor: 0.5,
            ..test_config()
        };
        let result = Explorer::new(config, source, extractor);
        assert!(matches!(result, Err(MapSweepError::Config { .. })));
    }

    #[tokio::test]
    async fn parallel_batches_match_sequential_result() {
        let source = FakeSource::new(|region| {
            if region.depth == 0 {
                Ok(listings("root", PAGE_CAP))
            } else {
                // Children overlap on two shared listings each.
                let mut page = listings(&region_tag(region), 5);
                page.extend(listings("root", 2));
                Ok(page)
            }
        });
        let extractor = Arc::new(FakeExtractor::default());
        let config = ExploreConfig {
            concurrency: 4,
            ..test_config()
        };

        let result = explorer(config, &source, &extractor)
            .explore(root_region(), "factories", &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.records.len(), 40);
        assert_eq!(result.stats.duplicates_skipped, 4 * 2);
        assert_eq!(source.calls(), 5);
    }
}
