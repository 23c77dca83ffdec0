//! HNSW (Hierarchical Navigable Small World) graph over numeric node ids.
//!
//! Every node lives on layers `0..=level`, where the level is drawn from an
//! exponentially decaying distribution. Searches descend greedily from the
//! entry point (the node with the highest level) and run a beam search on
//! layer 0.
//!
//! The index is single-threaded: mutation goes through `&mut self` and the
//! caller provides any locking it needs.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::distance::Distance;
use crate::engine::options::{IndexOptions, InsertMethod};
use crate::error::{AnnexError, Result};

/// Identifier of a node inside the graph.
pub type NodeId = u32;

/// Seed used for level assignment unless one is given explicitly.
pub const DEFAULT_SEED: u64 = 42;

/// Upper bound on node levels.
const MAX_LEVEL: usize = 16;

/// A search hit: key and distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<K> {
    pub key: K,
    pub distance: f32,
}

/// A node in the HNSW graph.
#[derive(Debug, Clone)]
struct Node {
    vector: Vec<f32>,
    /// `links[layer]` holds the outgoing links on that layer.
    links: Vec<Vec<NodeId>>,
}

impl Node {
    fn new(vector: Vec<f32>, level: usize) -> Self {
        Self {
            vector,
            links: vec![Vec::new(); level + 1],
        }
    }

    fn level(&self) -> usize {
        self.links.len() - 1
    }
}

/// Priority queue entry for HNSW search.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SearchCandidate {
    distance: f32,
    node_id: NodeId,
}

impl Eq for SearchCandidate {}

impl PartialOrd for SearchCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties broken by id so results are deterministic.
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

/// HNSW index keyed by [`NodeId`].
#[derive(Debug, Clone)]
pub struct HnswIndex<D: Distance> {
    options: IndexOptions,
    distance: D,
    nodes: HashMap<NodeId, Node>,
    entry_point: Option<NodeId>,
    dimension: Option<usize>,
    rng: StdRng,
}

impl<D: Distance> Default for HnswIndex<D> {
    fn default() -> Self {
        Self::new(IndexOptions::default())
    }
}

impl<D: Distance> HnswIndex<D> {
    /// Create an empty index with the given options.
    pub fn new(options: IndexOptions) -> Self {
        Self::with_seed(options, DEFAULT_SEED)
    }

    /// Create an empty index whose level assignment uses `seed`.
    pub fn with_seed(options: IndexOptions, seed: u64) -> Self {
        Self {
            options,
            distance: D::default(),
            nodes: HashMap::new(),
            entry_point: None,
            dimension: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Current options.
    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Replace the options. Already built links are kept as they are.
    pub fn set_options(&mut self, options: IndexOptions) {
        self.options = options;
    }

    /// The distance function of this index.
    pub fn metric(&self) -> &D {
        &self.distance
    }

    /// Number of nodes in the graph.
    pub fn nodes_len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Dimensionality fixed by the first insert, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Whether `id` is in the graph.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Stored vector of `id`.
    pub fn vector(&self, id: NodeId) -> Option<&[f32]> {
        self.nodes.get(&id).map(|node| node.vector.as_slice())
    }

    /// Current entry point.
    pub fn entry_point(&self) -> Option<NodeId> {
        self.entry_point
    }

    /// Validate a vector against the index dimension without inserting it.
    pub fn validate(&self, vector: &[f32]) -> Result<()> {
        if vector.is_empty() {
            return Err(AnnexError::invalid_vector("vector is empty"));
        }
        if let Some(expected) = self.dimension
            && vector.len() != expected
        {
            return Err(AnnexError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        if !vector.iter().all(|x| x.is_finite()) {
            return Err(AnnexError::invalid_vector(
                "vector contains NaN or infinite values",
            ));
        }
        Ok(())
    }

    /// Insert a vector under a fresh id.
    pub fn insert(&mut self, id: NodeId, vector: Vec<f32>) -> Result<()> {
        self.validate(&vector)?;
        if self.nodes.contains_key(&id) {
            return Err(AnnexError::invalid_operation(format!(
                "node {id} already exists in the index"
            )));
        }
        self.dimension.get_or_insert(vector.len());

        let level = self.random_level();
        trace!("inserting node {id} at level {level}");

        let Some(entry_point) = self.entry_point else {
            self.nodes.insert(id, Node::new(vector, level));
            self.entry_point = Some(id);
            return Ok(());
        };

        let top_level = self.level_of(entry_point);
        let mut closest = vec![entry_point];
        for layer in (level + 1..=top_level).rev() {
            closest = self.greedy_closest(&vector, &closest, layer);
        }

        let mut layer_links = Vec::with_capacity(level.min(top_level) + 1);
        for layer in (0..=level.min(top_level)).rev() {
            let candidates =
                self.search_layer(&vector, &closest, self.options.ef_construction, layer);
            let selected = self.select_neighbors(&candidates, self.options.max_links_on(layer));
            closest = candidates.iter().map(|c| c.node_id).collect();
            layer_links.push((layer, selected));
        }

        let mut node = Node::new(vector, level);
        for (layer, selected) in &layer_links {
            node.links[*layer] = selected.clone();
        }
        self.nodes.insert(id, node);

        for (layer, selected) in layer_links {
            for neighbor in selected {
                self.add_link(neighbor, id, layer);
            }
        }

        if level > top_level {
            self.entry_point = Some(id);
        }

        Ok(())
    }

    /// Remove a node and repair the graph according to the remove method.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        let removed = self
            .nodes
            .remove(&id)
            .ok_or_else(|| AnnexError::key_not_found(format!("node {id}")))?;

        // Links are directed, so incoming links can come from nodes the
        // removed node never linked back to.
        let mut orphaned: Vec<(NodeId, usize)> = Vec::new();
        for (&node_id, node) in self.nodes.iter_mut() {
            for (layer, links) in node.links.iter_mut().enumerate() {
                let before = links.len();
                links.retain(|&link| link != id);
                if links.len() != before {
                    orphaned.push((node_id, layer));
                }
            }
        }
        orphaned.sort_unstable();

        if self.options.remove_method.compensates() {
            for (node_id, layer) in orphaned {
                let Some(replacements) = removed.links.get(layer) else {
                    continue;
                };
                self.relink(node_id, layer, replacements);
            }
        }

        if self.entry_point == Some(id) {
            self.entry_point = self
                .nodes
                .iter()
                .max_by_key(|(node_id, node)| (node.level(), Reverse(**node_id)))
                .map(|(node_id, _)| *node_id);
        }

        Ok(())
    }

    /// Search for the `k` nearest nodes using a beam of width `k`.
    pub fn search(&self, target: &[f32], k: usize) -> Result<Vec<SearchResult<NodeId>>> {
        self.search_with_ef(target, k, k)
    }

    /// Search for the `k` nearest nodes using a beam of width `max(k, ef)`.
    pub fn search_with_ef(
        &self,
        target: &[f32],
        k: usize,
        ef: usize,
    ) -> Result<Vec<SearchResult<NodeId>>> {
        if let Some(expected) = self.dimension
            && target.len() != expected
        {
            return Err(AnnexError::DimensionMismatch {
                expected,
                actual: target.len(),
            });
        }

        let Some(entry_point) = self.entry_point else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut closest = vec![entry_point];
        for layer in (1..=self.level_of(entry_point)).rev() {
            closest = self.greedy_closest(target, &closest, layer);
        }

        let candidates = self.search_layer(target, &closest, ef.max(k), 0);
        Ok(candidates
            .into_iter()
            .take(k)
            .map(|c| SearchResult {
                key: c.node_id,
                distance: c.distance,
            })
            .collect())
    }

    /// Verify the structural invariants of the graph.
    pub fn check(&self) -> bool {
        let Some(entry_point) = self.entry_point else {
            return self.nodes.is_empty();
        };
        let Some(entry) = self.nodes.get(&entry_point) else {
            return false;
        };
        let top_level = entry.level();

        for (&id, node) in &self.nodes {
            if node.links.is_empty() || node.level() > top_level {
                return false;
            }
            if Some(node.vector.len()) != self.dimension {
                return false;
            }

            for (layer, links) in node.links.iter().enumerate() {
                if links.len() > self.options.max_links_on(layer) {
                    return false;
                }

                let mut seen = HashSet::with_capacity(links.len());
                for &link in links {
                    if link == id || !seen.insert(link) {
                        return false;
                    }
                    match self.nodes.get(&link) {
                        Some(target) if target.level() >= layer => {}
                        _ => return false,
                    }
                }
            }
        }

        true
    }

    fn level_of(&self, id: NodeId) -> usize {
        self.nodes.get(&id).map_or(0, Node::level)
    }

    fn random_level(&mut self) -> usize {
        let level_mult = 1.0 / (self.options.max_links.max(2) as f64).ln();
        let uniform: f64 = self.rng.random();
        let level = (-(1.0 - uniform).ln() * level_mult).floor() as usize;
        level.min(MAX_LEVEL)
    }

    fn distance_to(&self, query: &[f32], id: NodeId) -> Option<f32> {
        self.nodes
            .get(&id)
            .map(|node| self.distance.distance(query, &node.vector))
    }

    fn greedy_closest(&self, query: &[f32], entry_points: &[NodeId], layer: usize) -> Vec<NodeId> {
        self.search_layer(query, entry_points, 1, layer)
            .into_iter()
            .map(|c| c.node_id)
            .take(1)
            .collect()
    }

    /// Beam search on one layer. Returns candidates sorted by ascending distance.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[NodeId],
        ef: usize,
        layer: usize,
    ) -> Vec<SearchCandidate> {
        let mut visited = HashSet::new();
        let mut candidates = BinaryHeap::new(); // min-heap via Reverse
        let mut results = BinaryHeap::new(); // max-heap, farthest on top

        for &entry_id in entry_points {
            if !visited.insert(entry_id) {
                continue;
            }
            if let Some(distance) = self.distance_to(query, entry_id) {
                let candidate = SearchCandidate {
                    distance,
                    node_id: entry_id,
                };
                candidates.push(Reverse(candidate));
                results.push(candidate);
            }
        }
        while results.len() > ef {
            results.pop();
        }

        while let Some(Reverse(current)) = candidates.pop() {
            if let Some(farthest) = results.peek()
                && current.distance > farthest.distance
                && results.len() >= ef
            {
                break;
            }

            let Some(node) = self.nodes.get(&current.node_id) else {
                continue;
            };
            let Some(links) = node.links.get(layer) else {
                continue;
            };

            for &neighbor_id in links {
                if !visited.insert(neighbor_id) {
                    continue;
                }
                let Some(distance) = self.distance_to(query, neighbor_id) else {
                    continue;
                };
                let candidate = SearchCandidate {
                    distance,
                    node_id: neighbor_id,
                };

                if results.len() < ef {
                    results.push(candidate);
                    candidates.push(Reverse(candidate));
                } else if let Some(farthest) = results.peek()
                    && candidate < *farthest
                {
                    results.pop();
                    results.push(candidate);
                    candidates.push(Reverse(candidate));
                }
            }
        }

        results.into_sorted_vec()
    }

    /// Pick at most `max_links` neighbors out of `candidates`, which are
    /// sorted by ascending distance to the node being linked.
    fn select_neighbors(&self, candidates: &[SearchCandidate], max_links: usize) -> Vec<NodeId> {
        match self.options.insert_method {
            InsertMethod::LinkNearest => candidates
                .iter()
                .take(max_links)
                .map(|c| c.node_id)
                .collect(),
            InsertMethod::LinkDiverse => {
                let mut selected: Vec<NodeId> =
                    Vec::with_capacity(candidates.len().min(max_links));
                let mut pruned: Vec<NodeId> = Vec::new();

                for candidate in candidates {
                    if selected.len() >= max_links {
                        break;
                    }
                    let Some(candidate_node) = self.nodes.get(&candidate.node_id) else {
                        continue;
                    };
                    let diverse = selected.iter().all(|chosen| {
                        self.distance_to(&candidate_node.vector, *chosen)
                            .is_none_or(|d| d > candidate.distance)
                    });
                    if diverse {
                        selected.push(candidate.node_id);
                    } else {
                        pruned.push(candidate.node_id);
                    }
                }

                let missing = max_links.saturating_sub(selected.len());
                selected.extend(pruned.into_iter().take(missing));
                selected
            }
        }
    }

    /// Add `from -> to` on `layer`, shrinking `from`'s links if over capacity.
    fn add_link(&mut self, from: NodeId, to: NodeId, layer: usize) {
        let cap = self.options.max_links_on(layer);
        let Some(node) = self.nodes.get_mut(&from) else {
            return;
        };
        let Some(links) = node.links.get_mut(layer) else {
            return;
        };
        if links.contains(&to) {
            return;
        }
        links.push(to);
        if links.len() > cap {
            let current = links.clone();
            self.reselect_links(from, layer, &current);
        }
    }

    /// Reconnect `id` on `layer` using its current links plus `extra`.
    fn relink(&mut self, id: NodeId, layer: usize, extra: &[NodeId]) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let Some(current) = node.links.get(layer) else {
            return;
        };
        let mut pool = current.clone();
        for &candidate in extra {
            if candidate != id && !pool.contains(&candidate) {
                match self.nodes.get(&candidate) {
                    Some(target) if target.level() >= layer => pool.push(candidate),
                    _ => {}
                }
            }
        }
        self.reselect_links(id, layer, &pool);
    }

    /// Replace the links of `id` on `layer` by a selection out of `pool`.
    fn reselect_links(&mut self, id: NodeId, layer: usize, pool: &[NodeId]) {
        let Some(base) = self.nodes.get(&id).map(|node| node.vector.clone()) else {
            return;
        };
        let mut candidates: Vec<SearchCandidate> = pool
            .iter()
            .filter_map(|&node_id| {
                self.distance_to(&base, node_id)
                    .map(|distance| SearchCandidate { distance, node_id })
            })
            .collect();
        candidates.sort();

        let selected = self.select_neighbors(&candidates, self.options.max_links_on(layer));
        if let Some(links) = self
            .nodes
            .get_mut(&id)
            .and_then(|node| node.links.get_mut(layer))
        {
            *links = selected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::distance::{CosineDistance, DotProductDistance};
    use crate::engine::options::RemoveMethod;

    fn small_options() -> IndexOptions {
        IndexOptions {
            max_links: 4,
            ef_construction: 32,
            ..Default::default()
        }
    }

    fn grid_vectors(count: usize) -> Vec<Vec<f32>> {
        (0..count)
            .map(|i| {
                let angle = i as f32 * 0.173;
                vec![angle.cos(), angle.sin(), (i % 7) as f32 * 0.1 + 0.05]
            })
            .collect()
    }

    #[test]
    fn test_huge_link_cap_does_not_overallocate() {
        for insert_method in [InsertMethod::LinkNearest, InsertMethod::LinkDiverse] {
            let options = IndexOptions {
                max_links: usize::MAX / 2 + 1,
                ef_construction: 8,
                insert_method,
                ..Default::default()
            };
            let mut index: HnswIndex<CosineDistance> = HnswIndex::new(options);
            for (id, vector) in grid_vectors(10).into_iter().enumerate() {
                index.insert(id as NodeId, vector).unwrap();
            }
            assert_eq!(index.nodes_len(), 10);
            assert!(index.check());
        }
    }

    #[test]
    fn test_empty_index() {
        let index: HnswIndex<CosineDistance> = HnswIndex::default();
        assert!(index.is_empty());
        assert!(index.check());
        assert!(index.search(&[1.0, 0.0], 3).unwrap().is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn test_insert_and_search_exact_match() {
        let mut index: HnswIndex<CosineDistance> = HnswIndex::new(small_options());
        index.insert(1, vec![1.0, 0.0]).unwrap();
        index.insert(2, vec![0.0, 1.0]).unwrap();
        index.insert(3, vec![0.7, 0.7]).unwrap();

        let results = index.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, 2);
        assert!(results[0].distance.abs() < 1e-6);
        assert!(index.check());
    }

    #[test]
    fn test_results_sorted_ascending() {
        let mut index: HnswIndex<CosineDistance> = HnswIndex::new(small_options());
        for (i, v) in grid_vectors(100).into_iter().enumerate() {
            index.insert(i as NodeId, v).unwrap();
        }

        let results = index.search_with_ef(&[1.0, 0.2, 0.3], 10, 64).unwrap();
        assert_eq!(results.len(), 10);
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        assert!(index.check());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut index: HnswIndex<CosineDistance> = HnswIndex::default();
        index.insert(1, vec![1.0, 2.0]).unwrap();
        assert!(index.insert(1, vec![2.0, 1.0]).is_err());
        assert_eq!(index.nodes_len(), 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index: HnswIndex<CosineDistance> = HnswIndex::default();
        index.insert(1, vec![1.0, 2.0, 3.0]).unwrap();

        match index.insert(2, vec![1.0, 2.0]) {
            Err(AnnexError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected dimension mismatch, got {other:?}"),
        }
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut index: HnswIndex<DotProductDistance> = HnswIndex::default();
        assert!(index.insert(1, vec![f32::NAN, 1.0]).is_err());
        assert!(index.insert(1, Vec::new()).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_keeps_invariants() {
        for remove_method in [RemoveMethod::NoLink, RemoveMethod::CompensateIncomingLinks] {
            let options = IndexOptions {
                remove_method,
                ..small_options()
            };
            let mut index: HnswIndex<CosineDistance> = HnswIndex::new(options);
            for (i, v) in grid_vectors(80).into_iter().enumerate() {
                index.insert(i as NodeId, v).unwrap();
            }

            for id in (0..80).step_by(3) {
                index.remove(id).unwrap();
                assert!(index.check(), "broken graph after removing {id}");
            }
            assert_eq!(index.nodes_len(), 80 - 27);

            let results = index.search_with_ef(&[1.0, 0.0, 0.05], 5, 64).unwrap();
            assert!(results.iter().all(|r| r.key % 3 != 0));
        }
    }

    #[test]
    fn test_remove_missing() {
        let mut index: HnswIndex<CosineDistance> = HnswIndex::default();
        assert!(matches!(index.remove(9), Err(AnnexError::KeyNotFound(_))));
    }

    #[test]
    fn test_remove_everything() {
        let mut index: HnswIndex<CosineDistance> = HnswIndex::new(small_options());
        for (i, v) in grid_vectors(20).into_iter().enumerate() {
            index.insert(i as NodeId, v).unwrap();
        }
        for id in 0..20 {
            index.remove(id).unwrap();
        }
        assert!(index.is_empty());
        assert_eq!(index.entry_point(), None);
        assert!(index.check());
    }

    #[test]
    fn test_link_diverse_respects_caps() {
        let options = IndexOptions {
            insert_method: InsertMethod::LinkDiverse,
            ..small_options()
        };
        let mut index: HnswIndex<CosineDistance> = HnswIndex::new(options);
        for (i, v) in grid_vectors(120).into_iter().enumerate() {
            index.insert(i as NodeId, v).unwrap();
        }
        assert!(index.check());

        let target = index.vector(42).unwrap().to_vec();
        let results = index.search_with_ef(&target, 1, 64).unwrap();
        assert_eq!(results[0].key, 42);
    }

    #[test]
    fn test_same_seed_same_graph() {
        let build = || {
            let mut index: HnswIndex<CosineDistance> = HnswIndex::with_seed(small_options(), 7);
            for (i, v) in grid_vectors(50).into_iter().enumerate() {
                index.insert(i as NodeId, v).unwrap();
            }
            index
        };
        let a = build();
        let b = build();
        assert_eq!(a.entry_point(), b.entry_point());
        assert_eq!(
            a.search(&[0.3, 0.9, 0.2], 5).unwrap(),
            b.search(&[0.3, 0.9, 0.2], 5).unwrap()
        );
    }

    #[test]
    fn test_search_candidate_ordering() {
        let mut candidates = [
            SearchCandidate {
                distance: 0.5,
                node_id: 1,
            },
            SearchCandidate {
                distance: 0.2,
                node_id: 2,
            },
            SearchCandidate {
                distance: 0.8,
                node_id: 3,
            },
            SearchCandidate {
                distance: 0.2,
                node_id: 0,
            },
        ];

        candidates.sort();

        assert_eq!(candidates[0].node_id, 0);
        assert_eq!(candidates[1].node_id, 2);
        assert_eq!(candidates[2].node_id, 1);
        assert_eq!(candidates[3].node_id, 3);
    }
}
