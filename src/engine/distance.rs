//! Distance functions used by the HNSW engine.
//!
//! Both metrics return a distance where smaller means closer and identical
//! directions yield 0.0.

use std::fmt::Debug;

use wide::f32x8;

const LANES: usize = 8;

/// A distance function between two vectors of equal dimension.
pub trait Distance: Debug + Default + Clone + Send + Sync + 'static {
    /// Distance between `a` and `b`. Callers guarantee equal lengths.
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;

    /// Short name of the metric.
    fn name(&self) -> &'static str;
}

/// `1 - <a, b>`.
///
/// Equals the cosine distance when both inputs have unit length, so indexes
/// using it expect normalized data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DotProductDistance;

impl Distance for DotProductDistance {
    #[inline]
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        1.0 - dot_product(a, b)
    }

    fn name(&self) -> &'static str {
        "dot_product"
    }
}

/// `1 - <a, b> / (|a| |b|)`. Normalizes internally.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CosineDistance;

impl Distance for CosineDistance {
    #[inline]
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        let norm_a = dot_product(a, a).sqrt();
        let norm_b = dot_product(b, b).sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            1.0 // Maximum distance for zero vectors
        } else {
            1.0 - dot_product(a, b) / (norm_a * norm_b)
        }
    }

    fn name(&self) -> &'static str {
        "cosine"
    }
}

/// Inner product of two equally sized slices.
///
/// Processes eight lanes at a time with `wide` and finishes the remainder
/// with scalar code.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let chunks_a = a.chunks_exact(LANES);
    let chunks_b = b.chunks_exact(LANES);
    let tail: f32 = chunks_a
        .remainder()
        .iter()
        .zip(chunks_b.remainder())
        .map(|(x, y)| x * y)
        .sum();

    let mut acc = f32x8::splat(0.0);
    for (ca, cb) in chunks_a.zip(chunks_b) {
        acc = acc + load(ca) * load(cb);
    }

    acc.to_array().iter().sum::<f32>() + tail
}

#[inline]
fn load(chunk: &[f32]) -> f32x8 {
    f32x8::new([
        chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
    ])
}
