//! # Base-Table Attribution
//!
//! During the recording round every join is described to the scoring service by the
//! base tables that feed it. This module walks an access path and collects those
//! table names.
//!
//! ## Traversal
//!
//! - **Scans** contribute the name of the relation they read.
//! - **Joins** contribute both inputs, inner side first, then outer. The result is
//!   consumed as a multiset, so the order only needs to be stable.
//! - **Materialize, Sort, Aggregate** are transparent: the walk descends into the
//!   sole sub-path.
//! - **Incremental sort, limit and unhandled kinds** stop the walk for that branch.
//!   They are reported in `Attribution::skipped` so the caller can warn about them.
//!
//! Duplicates are kept: a self-join is attributed to the same table twice.

use crate::catalog::Catalog;
use crate::plan::{AccessPath, RelId};

/// Result of attributing one access path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribution {
    pub tables: Vec<String>,
    pub skipped: Vec<SkippedPath>,
}

/// A branch of an access path the walk could not attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkippedPath {
    /// A path kind the walk does not descend into.
    Unhandled(&'static str),
    /// A scanned relation the catalog could not name.
    UnknownRelation(RelId),
}

impl std::fmt::Display for SkippedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkippedPath::Unhandled(label) => write!(f, "{} path", label),
            SkippedPath::UnknownRelation(id) => write!(f, "unknown relation {}", id),
        }
    }
}

impl Attribution {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Attribute a single access path.
pub fn attribute_tables(path: &AccessPath, catalog: &dyn Catalog) -> Attribution {
    let mut out = Attribution::default();
    collect(path, catalog, &mut out);
    out
}

/// Attribute both inputs of a join into one list, in the order the recording round
/// stores them.
pub fn attribute_join(
    outer: &AccessPath,
    inner: &AccessPath,
    catalog: &dyn Catalog,
) -> Attribution {
    let mut out = Attribution::default();
    collect(outer, catalog, &mut out);
    collect(inner, catalog, &mut out);
    out
}

fn collect(path: &AccessPath, catalog: &dyn Catalog, out: &mut Attribution) {
    match path {
        AccessPath::Scan { relation, .. } => match catalog.relation_name(*relation) {
            Some(name) => out.tables.push(name),
            None => out.skipped.push(SkippedPath::UnknownRelation(*relation)),
        },
        AccessPath::Join { inner, outer, .. } => {
            collect(inner, catalog, out);
            collect(outer, catalog, out);
        }
        AccessPath::Materialize { sub }
        | AccessPath::Sort { sub }
        | AccessPath::Aggregate { sub } => collect(sub, catalog, out),
        AccessPath::IncrementalSort { .. }
        | AccessPath::Limit { .. }
        | AccessPath::Unhandled(_) => out.skipped.push(SkippedPath::Unhandled(path.label())),
    }
}
