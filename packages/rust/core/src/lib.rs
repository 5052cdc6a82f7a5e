//! Core pipeline orchestration for MapSweep.
//!
//! This crate ties the provider, the search engine, and a result sink
//! together into the end-to-end `run_sweep` workflow.

pub mod pipeline;

pub use pipeline::{
    Collaborators, ProgressReporter, SilentProgress, SweepConfig, SweepSummary, run_sweep,
};
