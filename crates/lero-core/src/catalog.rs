//! # Catalog Interface
//!
//! The catalog resolves the host's internal identifiers into the names the scoring
//! service sees: base-table names for table attribution and for `Relation Name`, and
//! index names for `Index Name`. Indexes and tables share one identifier space in the
//! host, so a single lookup serves both.
//!
//! The trait sits behind `dyn Catalog` so any host can provide it; `InMemoryCatalog`
//! is a HashMap-backed implementation for tests and embedding.

use crate::plan::RelId;
use std::collections::HashMap;

/// Name lookup by internal identifier.
pub trait Catalog: Send + Sync {
    /// Name of the relation (table or index) with the given identifier, or `None` if
    /// the identifier is unknown.
    fn relation_name(&self, id: RelId) -> Option<String>;
}

/// In-memory catalog populated programmatically.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    pub relations: HashMap<RelId, String>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_relation(&mut self, id: RelId, name: impl Into<String>) {
        self.relations.insert(id, name.into());
    }

    pub fn with_relation(mut self, id: RelId, name: impl Into<String>) -> Self {
        self.add_relation(id, name);
        self
    }
}

impl Catalog for InMemoryCatalog {
    fn relation_name(&self, id: RelId) -> Option<String> {
        self.relations.get(&id).cloned()
    }
}
