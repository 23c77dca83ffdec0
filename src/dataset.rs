//! Dataset preparation: shuffling, normalization and control-set splitting.
//!
//! A dataset is an ordered list of `(key, vector)` entries. All helpers
//! mutate caller-owned containers in place and never keep hidden state;
//! randomness always comes from a caller-supplied generator.

pub mod io;

use log::warn;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::engine::distance::dot_product;

/// Dense vector.
pub type Vector = Vec<f32>;

/// Ordered `(key, vector)` entries.
pub type Dataset = Vec<(String, Vector)>;

/// Permute the entries uniformly at random.
///
/// The permutation only depends on the state of `rng`, so a generator seeded
/// with the same value yields the same order on every run.
pub fn shuffle<R: Rng + ?Sized>(dataset: &mut Dataset, rng: &mut R) {
    dataset.shuffle(rng);
}

/// Scale every vector to unit L2 length.
///
/// Vectors with zero norm end up with non-finite components; callers must
/// filter them out beforehand.
pub fn normalize(dataset: &mut Dataset) {
    for (_, vector) in dataset.iter_mut() {
        let coef = 1.0 / dot_product(vector, vector).sqrt();
        for value in vector.iter_mut() {
            *value *= coef;
        }
    }
}

/// Number of entries to hold out as the control set.
///
/// An explicit size is returned as is, even when it exceeds the dataset.
/// Otherwise 1% of the entries, at least one, at most all of them.
pub fn control_size(dataset: &Dataset, explicit_size: Option<usize>) -> usize {
    match explicit_size {
        Some(size) => {
            if size > dataset.len() {
                warn!(
                    "control size {size} exceeds dataset size {}",
                    dataset.len()
                );
            }
            size
        }
        None => dataset.len().min((dataset.len() / 100).max(1)),
    }
}

/// Move the first `control_size` entries of `main` into `control`.
///
/// `control` is overwritten; `main` keeps the remaining suffix in order.
///
/// # Panics
///
/// Panics if `control_size > main.len()`.
pub fn split_dataset(main: &mut Dataset, control: &mut Dataset, control_size: usize) {
    let rest = main.split_off(control_size);
    *control = std::mem::replace(main, rest);
}
