//! # lero-core: Learned-Cost Plan Exploration Core
//!
//! This crate holds the host-facing half of the plan exploration engine: the shapes
//! exchanged with the host planner and the pieces that run while the host is planning.
//!
//! ## Module Overview
//!
//! - **`plan`**: Finalized plan trees (`PlannedStatement`, `PlanNode`, `PlanOp`) and the
//!   pre-finalization access paths (`AccessPath`) the host hands to the estimation hook.
//! - **`catalog`**: Relation and index name lookup by the host's internal identifier.
//! - **`host`**: The `HostPlanner` and `JoinEstimator` traits, the seam between this
//!   engine and the host's cost-based enumeration.
//! - **`cardinality`**: `CardinalityOverrideState`, the per-query recorder/replayer of
//!   join cardinalities that is plugged into the host as its `JoinEstimator`.
//! - **`attribution`**: Walks an access path and lists the base tables feeding it.
//! - **`serialize`**: Converts a finalized plan into the EXPLAIN-style document sent to
//!   the scoring service.
//! - **`instrument`**: Helpers for reading measured execution time out of EXPLAIN output.

pub mod attribution;
pub mod cardinality;
pub mod catalog;
pub mod host;
pub mod instrument;
pub mod plan;
pub mod serialize;
