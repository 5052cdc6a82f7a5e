//! Collaborator capabilities consumed by the search engine.
//!
//! The engine never talks to a browser, an HTTP API, or a file directly;
//! it only sees these traits. Test doubles implement them with fixed data.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{BusinessRecord, ListingHandle, PersistOutcome, SearchRegion};

/// Queries one region and returns a page of candidate listings.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Search `region` for businesses in `category`.
    ///
    /// The page size is bounded by the provider; a full page signals that
    /// the region may hold more than was returned.
    async fn search(&self, region: &SearchRegion, category: &str) -> Result<Vec<ListingHandle>>;
}

/// Turns a listing handle into a full record.
#[async_trait]
pub trait DetailExtractor: Send + Sync {
    /// Fetch the full record behind `handle`.
    ///
    /// Partial records are fine, but `name` and `address` must be present.
    async fn fetch(&self, handle: &ListingHandle) -> Result<BusinessRecord>;
}

/// Persists the final record set. Must skip keys it already holds.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, records: &[BusinessRecord]) -> Result<PersistOutcome>;

    /// Human-readable sink name for tracing.
    fn name(&self) -> &str;
}
