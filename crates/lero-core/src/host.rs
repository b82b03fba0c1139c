//! # Host Planner Interface
//!
//! The exploration engine never enumerates plans itself. It drives the host's own
//! cost-based planner through `HostPlanner` and influences it only through the
//! join-size estimation callback, `JoinEstimator`.
//!
//! ```text
//! explorer ──plan(query, &mut estimator)──▶ host planner
//!                                             │ for every join considered:
//!          estimator.estimate_join(..) ◀──────┘   rows = estimate_join(natural, outer, inner)
//! ```
//!
//! The host calls `estimate_join` synchronously, once per join it sizes, in the order
//! it encounters them. That ordering is what makes positional replay meaningful.

use crate::catalog::Catalog;
use crate::plan::{AccessPath, PlannedStatement};

/// One join-size estimation request from the host.
#[derive(Debug, Clone, Copy)]
pub struct JoinEstimate<'a> {
    /// The host's own row estimate for the join result.
    pub natural_rows: f64,
    /// Cheapest access path of the outer input.
    pub outer: &'a AccessPath,
    /// Cheapest access path of the inner input.
    pub inner: &'a AccessPath,
}

/// The join-size estimation hook installed into the host planner.
pub trait JoinEstimator {
    /// Return the row estimate the host should use for this join.
    fn estimate_join(&mut self, catalog: &dyn Catalog, join: &JoinEstimate<'_>) -> f64;
}

/// Estimator that keeps every natural estimate. Used when exploration is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalEstimates;

impl JoinEstimator for NaturalEstimates {
    fn estimate_join(&mut self, _catalog: &dyn Catalog, join: &JoinEstimate<'_>) -> f64 {
        join.natural_rows
    }
}

/// The host query engine, as seen by the explorer.
pub trait HostPlanner {
    /// The host's parsed query. Each planning pass receives it by reference, so the
    /// host must not depend on mutations from an earlier pass.
    type Query;
    type Error: std::error::Error + Send + Sync + 'static;

    /// The host's standard planning entry point. Must call `estimator` once for every
    /// join whose size it estimates.
    fn plan(
        &mut self,
        query: &Self::Query,
        estimator: &mut dyn JoinEstimator,
    ) -> Result<PlannedStatement, Self::Error>;

    /// Relation and index names for the identifiers in plans and access paths.
    fn catalog(&self) -> &dyn Catalog;

    /// Execute `plan` under instrumentation and return its measured execution time in
    /// milliseconds. Only called in verbose debugging mode. Hosts without an
    /// instrumentation facility keep the default.
    fn measure_execution(
        &mut self,
        _query: &Self::Query,
        _plan: &PlannedStatement,
    ) -> Result<Option<f64>, Self::Error> {
        Ok(None)
    }
}
