//! # Annex
//!
//! A harness for driving approximate nearest-neighbor indexes over
//! interchangeable distance metrics.
//!
//! ## Features
//!
//! - Uniform [`index::VectorIndex`] interface over HNSW instantiations
//! - Dot-product (over normalized data) and cosine metrics
//! - Runtime construction from a type name and optional tuning parameters
//! - Dataset preparation: shuffle, normalize, control split
//! - Recall and throughput measurement against exact search

pub mod cli;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod eval;
pub mod index;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
