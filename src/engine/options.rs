//! Construction options for the HNSW engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnnexError, Result};

/// How a newly inserted node picks its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsertMethod {
    /// Link to the nearest candidates found during construction search.
    #[default]
    LinkNearest,
    /// Prefer candidates that are closer to the new node than to any
    /// neighbor already selected, then back-fill with the nearest rest.
    LinkDiverse,
}

impl InsertMethod {
    /// Get the name of this insert method.
    pub fn name(&self) -> &'static str {
        match self {
            InsertMethod::LinkNearest => "link_nearest",
            InsertMethod::LinkDiverse => "link_diverse",
        }
    }
}

impl FromStr for InsertMethod {
    type Err = AnnexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "link_nearest" => Ok(InsertMethod::LinkNearest),
            "link_diverse" => Ok(InsertMethod::LinkDiverse),
            _ => Err(AnnexError::config(format!("unknown insert method: {s}"))),
        }
    }
}

impl fmt::Display for InsertMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happens to the neighbors of a removed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemoveMethod {
    /// Drop the links to the removed node and nothing else.
    NoLink,
    /// Reconnect every former neighbor to the removed node's other
    /// neighbors while link capacity allows.
    #[default]
    #[serde(alias = "compensate_incomming_links")]
    CompensateIncomingLinks,
}

impl RemoveMethod {
    /// Get the name of this remove method.
    pub fn name(&self) -> &'static str {
        match self {
            RemoveMethod::NoLink => "no_link",
            RemoveMethod::CompensateIncomingLinks => "compensate_incoming_links",
        }
    }

    /// Whether removal reconnects the nodes that lost a link.
    pub fn compensates(&self) -> bool {
        matches!(self, RemoveMethod::CompensateIncomingLinks)
    }
}

impl FromStr for RemoveMethod {
    type Err = AnnexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "no_link" => Ok(RemoveMethod::NoLink),
            "compensate_incoming_links" | "compensate_incomming_links" => {
                Ok(RemoveMethod::CompensateIncomingLinks)
            }
            _ => Err(AnnexError::config(format!("unknown remove method: {s}"))),
        }
    }
}

impl fmt::Display for RemoveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Largest accepted `max_links`. Layer 0 holds twice as many links, which
/// must stay addressable by `u32` node ids.
pub const MAX_LINKS_LIMIT: usize = u32::MAX as usize / 2;

/// Options accepted by [`crate::engine::HnswIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexOptions {
    /// Maximum number of links per node on the upper layers.
    /// Layer 0 allows twice as many.
    pub max_links: usize,
    /// Beam width used while searching for neighbors of a new node.
    pub ef_construction: usize,
    /// Neighbor selection policy on insert.
    pub insert_method: InsertMethod,
    /// Repair policy on remove.
    pub remove_method: RemoveMethod,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            max_links: 32,
            ef_construction: 200,
            insert_method: InsertMethod::default(),
            remove_method: RemoveMethod::default(),
        }
    }
}

impl IndexOptions {
    /// Link cap for a node on `layer`.
    pub fn max_links_on(&self, layer: usize) -> usize {
        if layer == 0 {
            self.max_links.saturating_mul(2)
        } else {
            self.max_links
        }
    }

    /// Validate the option values.
    pub fn validate(&self) -> Result<()> {
        if self.max_links == 0 {
            return Err(AnnexError::config("max_links must be > 0"));
        }
        if self.max_links > MAX_LINKS_LIMIT {
            return Err(AnnexError::config(format!(
                "max_links must be <= {MAX_LINKS_LIMIT}, got {}",
                self.max_links
            )));
        }
        if self.ef_construction == 0 {
            return Err(AnnexError::config("ef_construction must be > 0"));
        }
        Ok(())
    }
}
