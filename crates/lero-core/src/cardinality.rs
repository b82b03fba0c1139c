//! # Join-Cardinality Override State
//!
//! `CardinalityOverrideState` is the per-query session object behind the join-size
//! estimation hook. It runs in one of two modes:
//!
//! - **Recording** (round 0): every natural estimate is kept as-is and appended to the
//!   recorded sequence, together with the base tables feeding the join. The recorded
//!   vectors become the baseline sent to the scoring service.
//! - **Replaying** (rounds 1..N): the state holds a vector fetched from the scoring
//!   service. The k-th join the host sizes in the pass receives entry k of that
//!   vector. Once the vector is exhausted the natural estimate is used unchanged.
//!
//! ## Invariants
//!
//! - `recorded().len() == table_attributions().len()`, index for index.
//! - The recorded sequence never grows past `capacity`. A join that would exceed it
//!   is not recorded and marks the state as overflowed; the explorer treats that as
//!   fatal after the pass.
//! - The replay cursor counts the calls of the current pass and is reset by
//!   `begin_replay`.
//!
//! ## Replay Drift
//!
//! Replay assumes the host sizes joins in the same order and number as in the recording
//! pass. `replay_drift` reports two separate mismatches:
//!
//! - the pass made a different number of calls than the recording pass (the host
//!   planned differently, so positions may no longer line up), and
//! - the fetched vector is shorter or longer than the pass. Surplus calls fall back to
//!   natural estimates and surplus entries are ignored.
//!
//! The cursor advances on every call, so it is bounded by the calls of the pass, not
//! by the vector length.

use crate::attribution::{attribute_join, SkippedPath};
use crate::catalog::Catalog;
use crate::host::{JoinEstimate, JoinEstimator};
use tracing::trace;

/// Default limit on recorded join cardinalities per query.
pub const DEFAULT_CARDINALITY_CAPACITY: usize = 25_000;

/// Which half of the protocol the state is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverrideMode {
    Recording,
    Replaying,
}

/// Counts of a replay pass that disagree with the recording pass or with the vector
/// it replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayDrift {
    /// Joins sized by the recording pass.
    pub recorded: usize,
    /// Entries in the fetched vector.
    pub fetched: usize,
    /// Join-estimation calls observed during the pass.
    pub calls: usize,
}

impl ReplayDrift {
    /// The host sized a different number of joins than in the recording pass.
    pub fn call_count_changed(&self) -> bool {
        self.calls != self.recorded
    }

    /// The fetched vector did not cover the pass exactly. Surplus calls kept their
    /// natural estimates; surplus entries were ignored.
    pub fn vector_mismatch(&self) -> bool {
        self.calls != self.fetched
    }
}

#[derive(Debug, Clone)]
pub struct CardinalityOverrideState {
    mode: OverrideMode,
    capacity: usize,
    recorded: Vec<f64>,
    attributions: Vec<Vec<String>>,
    skipped: Vec<SkippedPath>,
    overflowed: bool,
    replay: Vec<f64>,
    cursor: usize,
}

impl Default for CardinalityOverrideState {
    fn default() -> Self {
        Self::new(DEFAULT_CARDINALITY_CAPACITY)
    }
}

impl CardinalityOverrideState {
    /// Fresh state in recording mode.
    pub fn new(capacity: usize) -> Self {
        Self {
            mode: OverrideMode::Recording,
            capacity,
            recorded: Vec::new(),
            attributions: Vec::new(),
            skipped: Vec::new(),
            overflowed: false,
            replay: Vec::new(),
            cursor: 0,
        }
    }

    /// Reset for the recording round, discarding anything recorded or fetched before.
    pub fn begin_recording(&mut self) {
        self.mode = OverrideMode::Recording;
        self.recorded.clear();
        self.attributions.clear();
        self.skipped.clear();
        self.overflowed = false;
        self.replay.clear();
        self.cursor = 0;
    }

    /// Switch to replay mode with a freshly fetched vector and a zeroed cursor.
    pub fn begin_replay(&mut self, cardinalities: Vec<f64>) {
        self.mode = OverrideMode::Replaying;
        self.replay = cardinalities;
        self.cursor = 0;
    }

    /// Release everything held for the query.
    pub fn clear(&mut self) {
        self.begin_recording();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Natural cardinalities captured by the recording round, in join-encounter order.
    pub fn recorded(&self) -> &[f64] {
        &self.recorded
    }

    /// Base tables attributed to each recorded join, parallel to `recorded()`.
    pub fn table_attributions(&self) -> &[Vec<String>] {
        &self.attributions
    }

    /// Access-path branches the recording round could not attribute.
    pub fn skipped(&self) -> &[SkippedPath] {
        &self.skipped
    }

    /// Whether the recording round saw more joins than `capacity`.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Number of join-estimation calls in the current replay pass.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Compare the current replay pass against the recording pass and its vector.
    pub fn replay_drift(&self) -> Option<ReplayDrift> {
        if self.mode != OverrideMode::Replaying {
            return None;
        }
        let drift = ReplayDrift {
            recorded: self.recorded.len(),
            fetched: self.replay.len(),
            calls: self.cursor,
        };
        if !drift.call_count_changed() && !drift.vector_mismatch() {
            return None;
        }
        Some(drift)
    }

    fn record(&mut self, catalog: &dyn Catalog, join: &JoinEstimate<'_>) -> f64 {
        let rows = join.natural_rows;
        if self.recorded.len() >= self.capacity {
            self.overflowed = true;
            return rows;
        }

        let attribution = attribute_join(join.outer, join.inner, catalog);
        trace!(
            join = self.recorded.len(),
            rows,
            tables = ?attribution.tables,
            "Recorded join cardinality"
        );
        self.recorded.push(rows);
        self.attributions.push(attribution.tables);
        self.skipped.extend(attribution.skipped);
        rows
    }

    fn replay(&mut self, join: &JoinEstimate<'_>) -> f64 {
        let rows = self.replay.get(self.cursor).copied().unwrap_or(join.natural_rows);
        trace!(
            join = self.cursor,
            natural = join.natural_rows,
            rows,
            "Replayed join cardinality"
        );
        self.cursor += 1;
        rows
    }
}

impl JoinEstimator for CardinalityOverrideState {
    fn estimate_join(&mut self, catalog: &dyn Catalog, join: &JoinEstimate<'_>) -> f64 {
        match self.mode {
            OverrideMode::Recording => self.record(catalog, join),
            OverrideMode::Replaying => self.replay(join),
        }
    }
}
