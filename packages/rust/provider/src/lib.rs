//! HTTP listing provider backed by a local map-scraping sidecar.
//!
//! The sidecar owns the browser session and exposes two JSON endpoints:
//! `GET /search` for a page of listings around a point and
//! `GET /places/{id}` for one listing's details. [`HttpProvider`] implements
//! both [`ListingSource`] and [`DetailExtractor`] on top of them.

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use mapsweep_geo::format_coordinates;
use mapsweep_shared::{
    AppConfig, BusinessRecord, DetailExtractor, ListingHandle, ListingSource, MapSweepError,
    Result, SearchRegion,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

pub use wire::{PlaceDetail, SearchResponse, WireListing, WireReview, parse_number};

/// User-Agent string for sidecar requests.
const USER_AGENT: &str = concat!("MapSweep/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Connection settings for the sidecar.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Sidecar base URL, e.g. `http://127.0.0.1:4780`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Largest page a search may return.
    pub page_cap: usize,
}

impl From<&AppConfig> for ProviderOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.provider.base_url.clone(),
            timeout_secs: config.provider.timeout_secs,
            page_cap: config.search.page_cap,
        }
    }
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// HttpProvider
// ---------------------------------------------------------------------------

/// Listing source and detail extractor talking to the sidecar over HTTP.
pub struct HttpProvider {
    client: Client,
    base: Url,
    page_cap: usize,
}

impl HttpProvider {
    pub fn new(opts: &ProviderOptions) -> Result<Self> {
        let base = Url::parse(&opts.base_url).map_err(|e| {
            MapSweepError::config(format!("invalid provider base_url '{}': {e}", opts.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(MapSweepError::config(format!(
                "provider base_url '{}' cannot be used as a base",
                opts.base_url
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| MapSweepError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            page_cap: opts.page_cap,
        })
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| MapSweepError::config(format!("invalid base URL {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `url` and decode its JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MapSweepError::Provider(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("{url}: HTTP {status}");
            return Err(if is_permanent(status) {
                MapSweepError::Rejected(message)
            } else {
                MapSweepError::Provider(message)
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| MapSweepError::Provider(format!("{url}: failed to read body: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| MapSweepError::parse(format!("{url}: malformed response: {e}")))
    }
}

#[async_trait]
impl ListingSource for HttpProvider {
    #[instrument(skip_all, fields(region = %region))]
    async fn search(&self, region: &SearchRegion, category: &str) -> Result<Vec<ListingHandle>> {
        let query = build_query(region, category);
        let mut url = self.endpoint(&["search"])?;
        url.query_pairs_mut()
            .append_pair("q", &query)
            .append_pair("lat", &region.center.lat.to_string())
            .append_pair("lng", &region.center.lng.to_string())
            .append_pair("radius_m", &format!("{:.0}", region.radius_meters()))
            .append_pair("limit", &self.page_cap.to_string());

        debug!(%query, "searching region");
        let response: SearchResponse = self.get_json(url).await?;

        let mut listings: Vec<ListingHandle> =
            response.results.into_iter().map(ListingHandle::from).collect();
        listings.truncate(self.page_cap);

        debug!(listings = listings.len(), "search returned");
        Ok(listings)
    }
}

#[async_trait]
impl DetailExtractor for HttpProvider {
    #[instrument(skip_all, fields(listing = %handle.id))]
    async fn fetch(&self, handle: &ListingHandle) -> Result<BusinessRecord> {
        let url = self.endpoint(&["places", handle.id.as_str()])?;
        let detail: PlaceDetail = self.get_json(url).await?;
        detail.into_record(&handle.id)
    }
}

/// Free-text query sent to the map, e.g.
/// `factories within 5 km of 41.8781° N, 87.6298° W`.
/// Client errors other than timeouts and throttling will fail the same way again.
fn is_permanent(status: StatusCode) -> bool {
    status.is_client_error()
        && status != StatusCode::REQUEST_TIMEOUT
        && status != StatusCode::TOO_MANY_REQUESTS
}

pub fn build_query(region: &SearchRegion, category: &str) -> String {
    let (lat, lng) = format_coordinates(region.center);
    format!(
        "{} within {} {} of {lat}, {lng}",
        category.trim(),
        region.radius,
        region.unit
    )
}
