//! # Candidate Exploration
//!
//! `CandidateExplorer` runs the round loop for one query at a time. Each round is one
//! call into the host planner with a `CardinalityOverrideState` lent as the join
//! estimator, followed by one `predict` exchange.
//!
//! ## Rounds
//!
//! - **Round 0 (recording)**: the host plans with its natural estimates. Every join
//!   estimate is recorded together with the base tables feeding it, and the baseline is
//!   registered with the service through `init`.
//! - **Round k (replay)**: the explorer fetches a vector through `join_card` and the
//!   host plans again with the vector substituted positionally. Joins past the end of
//!   the vector keep their natural estimate.
//!
//! Every round's plan is serialized and scored. The lowest score wins; on ties the
//! earliest round is kept. The loop ends when a reply carries `finish` or after
//! `LeroConfig::round_cap` rounds.
//!
//! ## Failure Handling
//!
//! Any failure of `init`, `join_card` or `predict` aborts the exploration and no
//! candidate is returned. `remove_state` is sent only after a normal loop exit; a
//! rejected or undecodable reply to it is logged and ignored, while a connection
//! failure is still reported.

use crate::config::LeroConfig;
use crate::error::ExploreError;
use lero_client::{ScoringService, SessionId};
use lero_core::cardinality::CardinalityOverrideState;
use lero_core::host::HostPlanner;
use lero_core::plan::PlannedStatement;
use lero_core::serialize::serialize_plan;
use tracing::{debug, info, info_span, warn};

/// Hard upper bound on rounds per query.
pub const MAX_ROUNDS: u32 = 1024;

/// One planning pass and its score.
#[derive(Debug, Clone)]
pub struct CandidatePlan {
    pub round: u32,
    pub plan: PlannedStatement,
    /// Predicted cost from the scoring service; lower is better.
    pub score: f64,
    /// Measured execution time in milliseconds, only in verbose mode.
    pub measured_ms: Option<f64>,
}

pub struct CandidateExplorer<P, S> {
    planner: P,
    scoring: S,
    config: LeroConfig,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl<P: HostPlanner, S: ScoringService> CandidateExplorer<P, S> {
    pub fn new(planner: P, scoring: S, config: LeroConfig) -> Self {
        Self {
            planner,
            scoring,
            config,
        }
    }

    pub fn config(&self) -> &LeroConfig {
        &self.config
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut P {
        &mut self.planner
    }

    pub fn scoring(&self) -> &S {
        &self.scoring
    }

    // -----------------------------------------------------------------------
    // Round loop
    // -----------------------------------------------------------------------

    /// Explore candidate plans for `query` and return the best-scored one.
    pub fn explore(&mut self, query: &P::Query) -> Result<CandidatePlan, ExploreError> {
        let session = SessionId::generate();
        let span = info_span!("explore", session = %session);
        let _guard = span.enter();

        let mut state = CardinalityOverrideState::new(self.config.cardinality_capacity);
        let result = self.run_rounds(query, &session, &mut state);
        state.clear();
        result
    }

    fn run_rounds(
        &mut self,
        query: &P::Query,
        session: &SessionId,
        state: &mut CardinalityOverrideState,
    ) -> Result<CandidatePlan, ExploreError> {
        let cap = self.config.round_cap();

        let plan = self.record(query, session, state, cap)?;
        let (mut best, mut finish) = self.score(query, session, 0, plan)?;
        let mut rounds = vec![(best.score, best.measured_ms)];

        let mut round = 1;
        while !finish && round < cap {
            let plan = self.replay(query, session, state, round)?;
            let (candidate, done) = self.score(query, session, round, plan)?;
            rounds.push((candidate.score, candidate.measured_ms));
            // Strict comparison keeps the earliest of equal scores.
            if candidate.score < best.score {
                best = candidate;
            }
            finish = done;
            round += 1;
        }
        if finish {
            debug!(rounds = rounds.len(), "Scoring service finished exploration");
        }

        for (round, (score, measured_ms)) in rounds.iter().enumerate() {
            debug!(round, score, measured_ms = ?measured_ms, "Round summary");
        }

        self.release(session)?;

        info!(
            round = best.round,
            score = best.score,
            rounds = rounds.len(),
            "Selected candidate plan"
        );
        Ok(best)
    }

    fn record(
        &mut self,
        query: &P::Query,
        session: &SessionId,
        state: &mut CardinalityOverrideState,
        cap: u32,
    ) -> Result<PlannedStatement, ExploreError> {
        state.begin_recording();
        let plan = self.planner.plan(query, state).map_err(ExploreError::host)?;
        if state.overflowed() {
            return Err(ExploreError::CardinalityOverflow {
                capacity: state.capacity(),
            });
        }
        for skipped in state.skipped() {
            warn!(path = %skipped, "Join input not attributed to base tables");
        }

        self.scoring
            .init(session, state.recorded(), state.table_attributions(), cap)?;
        debug!(joins = state.recorded().len(), max_rounds = cap, "Recorded baseline cardinalities");
        Ok(plan)
    }

    fn replay(
        &mut self,
        query: &P::Query,
        session: &SessionId,
        state: &mut CardinalityOverrideState,
        round: u32,
    ) -> Result<PlannedStatement, ExploreError> {
        let cardinalities = self.scoring.join_cardinalities(session)?;
        state.begin_replay(cardinalities);
        let plan = self.planner.plan(query, state).map_err(ExploreError::host)?;
        if let Some(drift) = state.replay_drift() {
            if drift.call_count_changed() {
                warn!(
                    round,
                    recorded = drift.recorded,
                    calls = drift.calls,
                    "Replay join count differs from recording round"
                );
            }
            if drift.vector_mismatch() {
                debug!(
                    round,
                    fetched = drift.fetched,
                    calls = drift.calls,
                    "Fetched cardinalities do not cover the replay pass"
                );
            }
        }
        Ok(plan)
    }

    fn score(
        &mut self,
        query: &P::Query,
        session: &SessionId,
        round: u32,
        plan: PlannedStatement,
    ) -> Result<(CandidatePlan, bool), ExploreError> {
        let measured_ms = if self.config.verbose {
            self.planner
                .measure_execution(query, &plan)
                .map_err(ExploreError::host)?
        } else {
            None
        };

        let serialized = serialize_plan(&plan, self.planner.catalog())?;
        for node in &serialized.unhandled {
            warn!(round, node, "Plan node serialized without type-specific fields");
        }

        let prediction = self
            .scoring
            .predict(session, measured_ms.unwrap_or(0.0), serialized.document)?;
        debug!(round, score = prediction.score, finish = prediction.finish, "Scored candidate");

        let candidate = CandidatePlan {
            round,
            plan,
            score: prediction.score,
            measured_ms,
        };
        Ok((candidate, prediction.finish))
    }

    fn release(&mut self, session: &SessionId) -> Result<(), ExploreError> {
        match self.scoring.remove_state(session) {
            Ok(()) => Ok(()),
            Err(err) if err.is_protocol() => {
                warn!(error = %err, "Scoring service did not release session state");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
