//! External keys on top of [`HnswIndex`].

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use crate::engine::distance::Distance;
use crate::engine::hnsw::{HnswIndex, NodeId, SearchResult};
use crate::engine::options::IndexOptions;
use crate::error::{AnnexError, Result};

/// Maps caller keys to graph node ids.
///
/// Inserting an existing key replaces its vector: the old node is removed
/// and a new one is linked in.
#[derive(Debug, Clone)]
pub struct KeyMapper<K, D: Distance> {
    index: HnswIndex<D>,
    key_to_id: HashMap<K, NodeId>,
    id_to_key: HashMap<NodeId, K>,
    next_id: NodeId,
}

impl<K, D> Default for KeyMapper<K, D>
where
    K: Eq + Hash + Clone + Display,
    D: Distance,
{
    fn default() -> Self {
        Self::new(IndexOptions::default())
    }
}

impl<K, D> KeyMapper<K, D>
where
    K: Eq + Hash + Clone + Display,
    D: Distance,
{
    /// Create an empty mapper over a fresh index.
    pub fn new(options: IndexOptions) -> Self {
        Self::from_index(HnswIndex::new(options))
    }

    /// Wrap an existing, empty index.
    pub fn from_index(index: HnswIndex<D>) -> Self {
        Self {
            index,
            key_to_id: HashMap::new(),
            id_to_key: HashMap::new(),
            next_id: 0,
        }
    }

    /// The wrapped graph.
    pub fn index(&self) -> &HnswIndex<D> {
        &self.index
    }

    /// Mutable access to the wrapped graph, for option injection.
    pub fn index_mut(&mut self) -> &mut HnswIndex<D> {
        &mut self.index
    }

    /// Number of mapped keys.
    pub fn len(&self) -> usize {
        self.key_to_id.len()
    }

    /// Whether no key is mapped.
    pub fn is_empty(&self) -> bool {
        self.key_to_id.is_empty()
    }

    /// Whether `key` is mapped.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.key_to_id.contains_key(key)
    }

    /// Stored vector of `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&[f32]>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.key_to_id
            .get(key)
            .and_then(|&id| self.index.vector(id))
    }

    /// Insert or replace the vector stored under `key`.
    pub fn insert(&mut self, key: K, vector: &[f32]) -> Result<()> {
        self.index.validate(vector)?;

        let id = self.next_id;
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| AnnexError::invalid_operation("node id space exhausted"))?;

        if let Some(old_id) = self.key_to_id.remove(&key) {
            self.id_to_key.remove(&old_id);
            self.index.remove(old_id)?;
        }

        self.index.insert(id, vector.to_vec())?;
        self.key_to_id.insert(key.clone(), id);
        self.id_to_key.insert(id, key);
        Ok(())
    }

    /// Remove `key`. Fails with [`AnnexError::KeyNotFound`] if it is absent.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<()>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        let id = self
            .key_to_id
            .remove(key)
            .ok_or_else(|| AnnexError::key_not_found(key.to_string()))?;
        self.id_to_key.remove(&id);
        self.index.remove(id)
    }

    /// Search for the `k` nearest keys.
    pub fn search(&self, target: &[f32], k: usize) -> Result<Vec<SearchResult<K>>> {
        self.search_with_ef(target, k, k)
    }

    /// Search for the `k` nearest keys with a beam of width `max(k, ef)`.
    pub fn search_with_ef(
        &self,
        target: &[f32],
        k: usize,
        ef: usize,
    ) -> Result<Vec<SearchResult<K>>> {
        let hits = self.index.search_with_ef(target, k, ef)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                self.id_to_key.get(&hit.key).map(|key| SearchResult {
                    key: key.clone(),
                    distance: hit.distance,
                })
            })
            .collect())
    }

    /// Graph invariants plus consistency of the key maps.
    pub fn check(&self) -> bool {
        self.index.check()
            && self.key_to_id.len() == self.id_to_key.len()
            && self.key_to_id.len() == self.index.nodes_len()
            && self.key_to_id.iter().all(|(key, id)| {
                self.index.contains(*id) && self.id_to_key.get(id) == Some(key)
            })
    }
}
