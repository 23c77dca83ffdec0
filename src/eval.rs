//! Recall and throughput evaluation of an index against exact search.
//!
//! A run shuffles the dataset, lets the index preprocess it, holds out a
//! control set, inserts the rest, then measures search recall for every
//! control vector and optionally removes a share of the keys and measures
//! recall again.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::{self, Dataset};
use crate::engine::IndexOptions;
use crate::error::{AnnexError, Result};
use crate::index::{IndexConfig, IndexFactory, IndexType, VectorIndex};

/// Exact `k` nearest entries of `target`, nearest first.
pub fn exact_search(
    dataset: &Dataset,
    target: &[f32],
    k: usize,
    index_type: IndexType,
) -> Vec<(String, f32)> {
    let mut scored: Vec<(&str, f32)> = dataset
        .par_iter()
        .map(|(key, vector)| (key.as_str(), index_type.distance(target, vector)))
        .collect();

    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(k)
        .map(|(key, distance)| (key.to_string(), distance))
        .collect()
}

/// Fraction of the keys in `truth` that also appear in `found`.
///
/// An empty `truth` counts as full recall.
pub fn recall_at_k(truth: &[(String, f32)], found: &[(String, f32)]) -> f32 {
    if truth.is_empty() {
        return 1.0;
    }
    let found: HashSet<&str> = found.iter().map(|(key, _)| key.as_str()).collect();
    let hits = truth
        .iter()
        .filter(|(key, _)| found.contains(key.as_str()))
        .count();
    hits as f32 / truth.len() as f32
}

/// Keep the last vector of each key, in order of first appearance.
///
/// Mirrors what an index holds after inserting the dataset in order.
pub fn latest_entries(dataset: &Dataset) -> Dataset {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut latest = Dataset::new();
    for (key, vector) in dataset {
        match positions.get(key.as_str()) {
            Some(&pos) => latest[pos].1 = vector.clone(),
            None => {
                positions.insert(key.as_str(), latest.len());
                latest.push((key.clone(), vector.clone()));
            }
        }
    }
    latest
}

/// Benchmark parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Index to build.
    pub index: IndexConfig,
    /// `k` used for every search.
    pub neighbors: usize,
    /// Explicit control set size; 1% of the dataset when unset.
    pub control_size: Option<usize>,
    /// Share of indexed keys removed after the search phase, in [0, 1].
    pub remove_fraction: f64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::new("cosine"),
            neighbors: 10,
            control_size: None,
            remove_fraction: 0.0,
        }
    }
}

/// Count and wall time of one phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub operations: usize,
    pub duration_ms: f64,
    pub operations_per_second: f64,
}

impl PhaseTiming {
    fn new(operations: usize, elapsed: Duration) -> Self {
        let seconds = elapsed.as_secs_f64();
        Self {
            operations,
            duration_ms: seconds * 1000.0,
            operations_per_second: if seconds > 0.0 {
                operations as f64 / seconds
            } else {
                0.0
            },
        }
    }
}

/// Outcome of a benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub index_type: String,
    pub options: IndexOptions,
    pub dataset_size: usize,
    pub control_size: usize,
    pub neighbors: usize,
    pub insert: PhaseTiming,
    pub search: PhaseTiming,
    pub recall: f32,
    pub remove: PhaseTiming,
    pub recall_after_remove: Option<f32>,
    pub index_size: usize,
    pub check_passed: bool,
}

/// Drives an index built from [`BenchmarkConfig`] over a dataset.
#[derive(Debug, Clone)]
pub struct Benchmark {
    config: BenchmarkConfig,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Run all phases over `dataset`, shuffling it with `rng` first.
    pub fn run<R: Rng + ?Sized>(&self, mut dataset: Dataset, rng: &mut R) -> Result<BenchmarkReport> {
        let config = &self.config;
        if config.neighbors == 0 {
            return Err(AnnexError::config("neighbors must be > 0"));
        }
        if !(0.0..=1.0).contains(&config.remove_fraction) {
            return Err(AnnexError::config(format!(
                "remove fraction must be within [0, 1], got {}",
                config.remove_fraction
            )));
        }

        let index_type = config.index.index_type()?;
        let options = config.index.options()?;
        let mut index = IndexFactory::create(&config.index)?;

        let dataset_size = dataset.len();
        dataset::shuffle(&mut dataset, rng);
        index.prepare_dataset(&mut dataset);

        let control_size = dataset::control_size(&dataset, config.control_size);
        if control_size > dataset.len() {
            return Err(AnnexError::dataset(format!(
                "control size {control_size} exceeds dataset size {}",
                dataset.len()
            )));
        }
        let mut control = Dataset::new();
        dataset::split_dataset(&mut dataset, &mut control, control_size);
        info!(
            "{} index: {} entries to insert, {} control queries",
            index_type,
            dataset.len(),
            control.len()
        );

        let insert = Self::insert_all(&mut *index, &dataset)?;
        info!(
            "inserted {} entries in {:.1} ms ({:.0}/s)",
            insert.operations, insert.duration_ms, insert.operations_per_second
        );
        let mut check_passed = Self::check(&*index, "insert");

        let indexed = latest_entries(&dataset);
        let (search, recall) =
            Self::measure_recall(&*index, &indexed, &control, config.neighbors, index_type)?;
        info!(
            "searched {} queries in {:.1} ms, recall@{} = {:.4}",
            search.operations, search.duration_ms, config.neighbors, recall
        );

        let remove_count = (indexed.len() as f64 * config.remove_fraction).round() as usize;
        let (removed, remaining) = indexed.split_at(remove_count.min(indexed.len()));

        let started = Instant::now();
        for (key, _) in removed {
            index.remove(key)?;
        }
        let remove = PhaseTiming::new(removed.len(), started.elapsed());

        let recall_after_remove = if removed.is_empty() {
            None
        } else {
            info!(
                "removed {} entries in {:.1} ms",
                remove.operations, remove.duration_ms
            );
            check_passed &= Self::check(&*index, "remove");
            let remaining = remaining.to_vec();
            let (_, recall) =
                Self::measure_recall(&*index, &remaining, &control, config.neighbors, index_type)?;
            info!("recall@{} after removal = {:.4}", config.neighbors, recall);
            Some(recall)
        };

        Ok(BenchmarkReport {
            index_type: index_type.name().to_string(),
            options,
            dataset_size,
            control_size,
            neighbors: config.neighbors,
            insert,
            search,
            recall,
            remove,
            recall_after_remove,
            index_size: index.size(),
            check_passed,
        })
    }

    fn insert_all(index: &mut dyn VectorIndex, dataset: &Dataset) -> Result<PhaseTiming> {
        let started = Instant::now();
        for (key, vector) in dataset {
            index.insert(key, vector)?;
        }
        Ok(PhaseTiming::new(dataset.len(), started.elapsed()))
    }

    /// Search every control vector; returns timing and mean recall.
    fn measure_recall(
        index: &dyn VectorIndex,
        indexed: &Dataset,
        control: &Dataset,
        neighbors: usize,
        index_type: IndexType,
    ) -> Result<(PhaseTiming, f32)> {
        let mut found = Vec::with_capacity(control.len());
        let started = Instant::now();
        for (_, target) in control {
            found.push(index.search(target, neighbors)?);
        }
        let timing = PhaseTiming::new(control.len(), started.elapsed());

        if control.is_empty() {
            return Ok((timing, 1.0));
        }
        let total: f32 = control
            .iter()
            .zip(&found)
            .map(|((_, target), hits)| {
                let truth = exact_search(indexed, target, neighbors, index_type);
                recall_at_k(&truth, hits)
            })
            .sum();
        Ok((timing, total / control.len() as f32))
    }

    fn check(index: &dyn VectorIndex, phase: &str) -> bool {
        let passed = index.check();
        if !passed {
            warn!("index invariants violated after {phase}");
        }
        passed
    }
}
