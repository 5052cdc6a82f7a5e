//! Adaptive region search and business deduplication.
//!
//! This crate provides:
//! - [`engine`] - The [`Explorer`] that drives recursive area partitioning
//! - [`dedup`] - First-seen-wins [`DedupStore`] keyed by identity key
//! - [`queue`] - Breadth-first [`RegionQueue`] of pending regions
//! - [`retry`] / [`throttle`] - Backoff and call spacing for collaborator calls

pub mod dedup;
pub mod engine;
pub mod queue;
pub mod retry;
pub mod throttle;

pub use dedup::DedupStore;
pub use engine::{ExploreProgress, ExploreStats, Exploration, Explorer, SilentProgress};
pub use queue::RegionQueue;
pub use retry::{Attempted, RetryPolicy};
pub use throttle::RateLimiter;
