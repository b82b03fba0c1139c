//! # lero-explorer: Learned-Cost Guided Plan Exploration
//!
//! This crate ties the pieces together. For one query it plans repeatedly, each time
//! injecting a different set of join cardinalities into the host planner, scores every
//! resulting plan with the external scoring service, and keeps the best one.
//!
//! ```text
//! round 0   plan (record natural cardinalities) -> init -> predict
//! round k   join_card -> plan (replay vector)   -> predict
//! ...       until the service says finish or the round cap is hit
//! exit      remove_state
//! ```
//!
//! ## Module Overview
//!
//! - **`config`**: Feature flags, scoring-service address and limits.
//! - **`explorer`**: `CandidateExplorer`, the round loop.
//! - **`hook`**: `LeroPlanner`, the drop-in replacement for the host's planning entry
//!   point.
//! - **`error`**: `ExploreError`, everything that aborts an exploration.

pub mod config;
pub mod error;
pub mod explorer;
pub mod hook;

pub use config::LeroConfig;
pub use error::ExploreError;
pub use explorer::{CandidateExplorer, CandidatePlan, MAX_ROUNDS};
pub use hook::LeroPlanner;
