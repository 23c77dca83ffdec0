//! Binding of the HNSW engine to [`VectorIndex`].

use log::debug;

use crate::dataset::{self, Dataset};
use crate::engine::{CosineDistance, Distance, DotProductDistance, IndexOptions, KeyMapper};
use crate::error::Result;
use crate::index::VectorIndex;

/// [`VectorIndex`] over a `KeyMapper<String, D>`.
///
/// `NORMALIZE_DATASET` is the preprocessing policy of the instantiation: it
/// must be `true` exactly when `D` assumes unit-length inputs.
#[derive(Debug, Clone)]
pub struct HnswAdapter<D: Distance, const NORMALIZE_DATASET: bool> {
    wrapped: KeyMapper<String, D>,
}

/// Dot-product distance over normalized data.
pub type DotProductIndex = HnswAdapter<DotProductDistance, true>;

/// Cosine distance, normalization happens inside the metric.
pub type CosineIndex = HnswAdapter<CosineDistance, false>;

impl<D: Distance, const NORMALIZE_DATASET: bool> Default for HnswAdapter<D, NORMALIZE_DATASET> {
    fn default() -> Self {
        Self {
            wrapped: KeyMapper::default(),
        }
    }
}

impl<D: Distance, const NORMALIZE_DATASET: bool> HnswAdapter<D, NORMALIZE_DATASET> {
    /// Create an empty index and inject `options` into its engine.
    pub fn new(options: IndexOptions) -> Self {
        let mut adapter = Self::default();
        adapter.wrapped.index_mut().set_options(options);
        debug!(
            "created {} index: {:?}, normalize_dataset={}",
            adapter.wrapped.index().metric().name(),
            adapter.wrapped.index().options(),
            NORMALIZE_DATASET
        );
        adapter
    }

    /// The wrapped engine.
    pub fn wrapped(&self) -> &KeyMapper<String, D> {
        &self.wrapped
    }
}

impl<D: Distance, const NORMALIZE_DATASET: bool> VectorIndex for HnswAdapter<D, NORMALIZE_DATASET> {
    fn insert(&mut self, key: &str, vector: &[f32]) -> Result<()> {
        self.wrapped.insert(key.to_string(), vector)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.wrapped.remove(key)
    }

    fn search(&self, target: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        let hits = self.wrapped.search(target, k)?;
        Ok(hits.into_iter().map(|hit| (hit.key, hit.distance)).collect())
    }

    fn check(&self) -> bool {
        self.wrapped.check()
    }

    fn size(&self) -> usize {
        self.wrapped.index().nodes_len()
    }

    fn prepare_dataset(&self, dataset: &mut Dataset) {
        if NORMALIZE_DATASET {
            dataset::normalize(dataset);
        }
    }
}
