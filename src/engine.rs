//! Graph-based approximate nearest neighbor engine.
//!
//! The engine is the collaborator behind [`crate::index::VectorIndex`]:
//! an HNSW graph over numeric ids ([`HnswIndex`]), a key mapper that
//! attaches external keys to it ([`KeyMapper`]), the distance functions
//! ([`DotProductDistance`], [`CosineDistance`]) and the construction
//! options ([`IndexOptions`]).

pub mod distance;
pub mod hnsw;
pub mod key_mapper;
pub mod options;

pub use self::distance::{CosineDistance, Distance, DotProductDistance, dot_product};
pub use self::hnsw::{HnswIndex, NodeId, SearchResult};
pub use self::key_mapper::KeyMapper;
pub use self::options::{IndexOptions, InsertMethod, RemoveMethod};
