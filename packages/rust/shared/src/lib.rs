//! Shared types, error model, configuration, and collaborator traits for MapSweep.
//!
//! This crate is the foundation depended on by all other MapSweep crates.
//! It provides:
//! - [`MapSweepError`] - the unified error type
//! - Domain types ([`SearchRegion`], [`BusinessRecord`], [`IdentityKey`], [`ListingHandle`])
//! - Configuration ([`AppConfig`], [`ExploreConfig`], config loading)
//! - Collaborator traits ([`ListingSource`], [`DetailExtractor`], [`ResultSink`])

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExploreConfig, MAX_DEPTH_LIMIT, MAX_FANOUT, OutputConfig, ProviderConfig,
    SearchConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{MapSweepError, Result};
pub use traits::{DetailExtractor, ListingSource, ResultSink};
pub use types::{
    BusinessRecord, DistanceUnit, IdentityKey, LatLng, ListingHandle, PersistOutcome, Review,
    RunId, SearchRegion, clean_field,
};
