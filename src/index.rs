//! Metric-polymorphic vector index interface.
//!
//! Callers work with `Box<dyn VectorIndex>` produced by
//! [`factory::make_index`] or [`factory::IndexFactory`] and never name the
//! concrete engine instantiation. Each instantiation decides how a dataset
//! must be preprocessed before its vectors are inserted.

pub mod adapter;
pub mod config;
pub mod factory;

use crate::dataset::Dataset;
use crate::error::Result;

pub use self::adapter::{CosineIndex, DotProductIndex, HnswAdapter};
pub use self::config::{IndexConfig, IndexType};
pub use self::factory::{IndexFactory, make_index};

/// Capability set shared by every index instantiation.
///
/// Errors raised by the engine (dimension mismatch, unknown key, invalid
/// values) are returned unchanged.
pub trait VectorIndex: std::fmt::Debug {
    /// Add `vector` under `key`, replacing any vector already stored there.
    fn insert(&mut self, key: &str, vector: &[f32]) -> Result<()>;

    /// Delete the entry stored under `key`.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Up to `k` `(key, distance)` pairs, nearest first.
    fn search(&self, target: &[f32], k: usize) -> Result<Vec<(String, f32)>>;

    /// Whether the engine's structural invariants hold.
    fn check(&self) -> bool;

    /// Number of nodes held by the engine.
    fn size(&self) -> usize;

    /// Preprocess `dataset` in place the way this index's metric expects.
    fn prepare_dataset(&self, dataset: &mut Dataset);

    /// Whether the index holds no nodes.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}
