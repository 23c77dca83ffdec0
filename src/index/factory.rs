//! Factory for creating vector index instances.

use log::debug;

use crate::error::Result;
use crate::index::VectorIndex;
use crate::index::adapter::{CosineIndex, DotProductIndex};
use crate::index::config::{IndexConfig, IndexType};

/// Factory for creating vector index instances.
///
/// Validation happens before anything is built, so an invalid configuration
/// never yields a partially constructed index.
///
/// # Example
///
/// ```
/// use annex::index::{IndexConfig, IndexFactory};
///
/// # fn main() -> annex::error::Result<()> {
/// let config = IndexConfig::new("cosine").with_max_links(16);
/// let mut index = IndexFactory::create(&config)?;
///
/// index.insert("a", &[1.0, 0.0])?;
/// assert_eq!(index.size(), 1);
/// # Ok(())
/// # }
/// ```
pub struct IndexFactory;

impl IndexFactory {
    /// Create an empty index from `config`.
    ///
    /// Fails with a configuration error on an unknown index type, insert
    /// method or remove method.
    pub fn create(config: &IndexConfig) -> Result<Box<dyn VectorIndex>> {
        let options = config.options()?;

        let index: Box<dyn VectorIndex> = match config.index_type()? {
            IndexType::DotProduct => Box::new(DotProductIndex::new(options)),
            IndexType::Cosine => Box::new(CosineIndex::new(options)),
        };

        debug!("index factory built a {} index", config.index_type);
        Ok(index)
    }
}

/// Build an index from loose runtime parameters.
///
/// Unset parameters keep the engine defaults.
pub fn make_index(
    index_type: &str,
    max_links: Option<usize>,
    ef_construction: Option<usize>,
    insert_method: Option<&str>,
    remove_method: Option<&str>,
) -> Result<Box<dyn VectorIndex>> {
    let config = IndexConfig {
        index_type: index_type.to_string(),
        max_links,
        ef_construction,
        insert_method: insert_method.map(str::to_string),
        remove_method: remove_method.map(str::to_string),
    };
    IndexFactory::create(&config)
}
