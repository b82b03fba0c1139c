//! # Planner Hook
//!
//! `LeroPlanner` stands in for the host's planning entry point. With `enabled` off it
//! forwards straight to the host planner with natural estimates; with it on, every
//! call runs a full exploration and returns the winning plan.

use crate::config::LeroConfig;
use crate::error::ExploreError;
use crate::explorer::CandidateExplorer;
use lero_client::{ScoringClient, ScoringService};
use lero_core::host::{HostPlanner, NaturalEstimates};
use lero_core::plan::PlannedStatement;
use tracing::debug;

pub struct LeroPlanner<P, S> {
    explorer: CandidateExplorer<P, S>,
}

impl<P: HostPlanner> LeroPlanner<P, ScoringClient> {
    /// Hook talking to the scoring service at `config.server_host:config.server_port`.
    pub fn from_config(planner: P, config: LeroConfig) -> Self {
        let client = ScoringClient::new(config.server_host.clone(), config.server_port)
            .with_timeout(config.io_timeout());
        Self::new(planner, client, config)
    }
}

impl<P: HostPlanner, S: ScoringService> LeroPlanner<P, S> {
    pub fn new(planner: P, scoring: S, config: LeroConfig) -> Self {
        Self {
            explorer: CandidateExplorer::new(planner, scoring, config),
        }
    }

    pub fn explorer(&self) -> &CandidateExplorer<P, S> {
        &self.explorer
    }

    pub fn plan(&mut self, query: &P::Query) -> Result<PlannedStatement, ExploreError> {
        if !self.explorer.config().enabled {
            debug!("Exploration disabled, planning with natural estimates");
            return self
                .explorer
                .planner_mut()
                .plan(query, &mut NaturalEstimates)
                .map_err(ExploreError::host);
        }
        Ok(self.explorer.explore(query)?.plan)
    }
}
