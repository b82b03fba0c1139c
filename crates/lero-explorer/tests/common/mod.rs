//! Shared fixtures: a fake host planner and a scripted in-memory scoring service.
#![allow(dead_code)]

use lero_client::{ClientError, Operation, Prediction, ScoringService, SessionId};
use lero_core::catalog::{Catalog, InMemoryCatalog};
use lero_core::host::{HostPlanner, JoinEstimate, JoinEstimator};
use lero_core::plan::{
    AccessPath, JoinKind, PlanNode, PlanOp, PlannedStatement, RangeTableEntry, RelId, ScanKind,
};
use lero_core::serialize::PlanDocument;
use std::{fmt, io};

// ---------------------------------------------------------------------------
// Fake host planner
// ---------------------------------------------------------------------------

/// A query over base tables, given as `(name, rows)`, joined left-deep in order.
#[derive(Debug, Clone)]
pub struct FakeQuery {
    pub tables: Vec<(&'static str, f64)>,
}

impl FakeQuery {
    pub fn new(tables: &[(&'static str, f64)]) -> Self {
        Self {
            tables: tables.to_vec(),
        }
    }
}

#[derive(Debug)]
pub struct FakePlannerError;

impl fmt::Display for FakePlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("fake planner failure")
    }
}

impl std::error::Error for FakePlannerError {}

/// Joins the query's tables left-deep. Each join's natural estimate is
/// `outer_rows * inner_rows / 100`; joins estimated above 1000 rows become hash
/// joins, smaller ones nested loops.
#[derive(Debug, Default)]
pub struct FakePlanner {
    catalog: InMemoryCatalog,
    /// Estimates returned by the estimator, one list per planning pass.
    pub observed: Vec<Vec<f64>>,
    /// Value reported by `measure_execution`.
    pub measured_ms: Option<f64>,
}

impl FakePlanner {
    pub fn new(query: &FakeQuery) -> Self {
        let mut catalog = InMemoryCatalog::new();
        for (i, (name, _)) in query.tables.iter().enumerate() {
            catalog.add_relation(rel_id(i), *name);
        }
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn passes(&self) -> usize {
        self.observed.len()
    }
}

fn rel_id(i: usize) -> RelId {
    RelId(16384 + i as u32)
}

fn scan_node(i: usize, rows: f64) -> PlanNode {
    PlanNode::new(PlanOp::SeqScan { scan: i }, rows, 32, 0.0, rows * 0.01)
}

impl HostPlanner for FakePlanner {
    type Query = FakeQuery;
    type Error = FakePlannerError;

    fn plan(
        &mut self,
        query: &FakeQuery,
        estimator: &mut dyn JoinEstimator,
    ) -> Result<PlannedStatement, FakePlannerError> {
        let (_, first_rows) = *query.tables.first().ok_or(FakePlannerError)?;
        let mut observed = Vec::new();
        let mut path = AccessPath::scan(ScanKind::Seq, rel_id(0));
        let mut node = scan_node(0, first_rows);

        for (i, (_, rows)) in query.tables.iter().enumerate().skip(1) {
            let inner_path = AccessPath::scan(ScanKind::Seq, rel_id(i));
            let inner = scan_node(i, *rows);
            let natural = node.rows * rows / 100.0;
            let estimate = estimator.estimate_join(
                &self.catalog,
                &JoinEstimate {
                    natural_rows: natural,
                    outer: &path,
                    inner: &inner_path,
                },
            );
            observed.push(estimate);

            let cost = node.total_cost + inner.total_cost + estimate * 0.01;
            let (kind, op) = if estimate > 1000.0 {
                let hash = PlanNode::new(
                    PlanOp::Hash {
                        input: Box::new(inner.clone()),
                    },
                    inner.rows,
                    inner.width,
                    inner.total_cost,
                    inner.total_cost,
                );
                let op = PlanOp::HashJoin {
                    outer: Box::new(node),
                    inner: Box::new(hash),
                };
                (JoinKind::Hash, op)
            } else {
                let op = PlanOp::NestedLoop {
                    outer: Box::new(node),
                    inner: Box::new(inner),
                };
                (JoinKind::NestedLoop, op)
            };
            node = PlanNode::new(op, estimate, 64, 0.0, cost);
            path = AccessPath::join(kind, path, inner_path);
        }

        self.observed.push(observed);
        let range_table = query
            .tables
            .iter()
            .enumerate()
            .map(|(i, (name, _))| RangeTableEntry::new(rel_id(i), &name[..1]))
            .collect();
        Ok(PlannedStatement::new(node, range_table))
    }

    fn catalog(&self) -> &dyn Catalog {
        &self.catalog
    }

    fn measure_execution(
        &mut self,
        _query: &FakeQuery,
        _plan: &PlannedStatement,
    ) -> Result<Option<f64>, FakePlannerError> {
        Ok(self.measured_ms)
    }
}

// ---------------------------------------------------------------------------
// Scripted scoring service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Init {
        cardinalities: Vec<f64>,
        tables: Vec<Vec<String>>,
        max_rounds: u32,
    },
    JoinCard,
    Predict {
        execution_time: f64,
        plan: PlanDocument,
    },
    RemoveState,
}

/// How a scripted operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Error-tagged reply.
    Rejected,
    /// Reply that does not decode.
    Malformed,
    /// The service cannot be reached.
    Unreachable,
}

impl Failure {
    fn into_error(self, op: Operation) -> ClientError {
        match self {
            Failure::Rejected => ClientError::Rejected { op },
            Failure::Malformed => ClientError::Malformed {
                op,
                source: serde_json::from_str::<u8>("{}").unwrap_err(),
            },
            Failure::Unreachable => ClientError::Connect {
                addr: "127.0.0.1:14567".to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            },
        }
    }
}

/// Replies from a script and records every call.
#[derive(Debug, Default)]
pub struct ScriptedScoring {
    pub calls: Vec<Call>,
    pub sessions: Vec<SessionId>,
    /// Vector returned by every `join_card`.
    pub join_card: Vec<f64>,
    /// Score of the n-th prediction. Predictions past the end score `1000 + n`.
    pub scores: Vec<f64>,
    /// Zero-based prediction that carries `finish`.
    pub finish_at: Option<usize>,
    pub failure: Option<(Operation, Failure)>,
    pub predictions: usize,
}

impl ScriptedScoring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_join_card(mut self, join_card: &[f64]) -> Self {
        self.join_card = join_card.to_vec();
        self
    }

    pub fn with_scores(mut self, scores: &[f64]) -> Self {
        self.scores = scores.to_vec();
        self
    }

    pub fn finishing_at(mut self, prediction: usize) -> Self {
        self.finish_at = Some(prediction);
        self
    }

    pub fn rejecting(self, op: Operation) -> Self {
        self.failing(op, Failure::Rejected)
    }

    pub fn failing(mut self, op: Operation, failure: Failure) -> Self {
        self.failure = Some((op, failure));
        self
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| matches(c)).count()
    }

    pub fn predicted_plans(&self) -> Vec<&PlanDocument> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Predict { plan, .. } => Some(plan),
                _ => None,
            })
            .collect()
    }

    fn check(&mut self, op: Operation, session: &SessionId) -> Result<(), ClientError> {
        self.sessions.push(session.clone());
        match self.failure {
            Some((failing, failure)) if failing == op => Err(failure.into_error(op)),
            _ => Ok(()),
        }
    }
}

impl ScoringService for ScriptedScoring {
    fn init(
        &mut self,
        session: &SessionId,
        cardinalities: &[f64],
        tables: &[Vec<String>],
        max_rounds: u32,
    ) -> Result<(), ClientError> {
        self.calls.push(Call::Init {
            cardinalities: cardinalities.to_vec(),
            tables: tables.to_vec(),
            max_rounds,
        });
        self.check(Operation::Init, session)
    }

    fn join_cardinalities(&mut self, session: &SessionId) -> Result<Vec<f64>, ClientError> {
        self.calls.push(Call::JoinCard);
        self.check(Operation::JoinCard, session)?;
        Ok(self.join_card.clone())
    }

    fn predict(
        &mut self,
        session: &SessionId,
        execution_time: f64,
        plan: PlanDocument,
    ) -> Result<Prediction, ClientError> {
        self.calls.push(Call::Predict { execution_time, plan });
        self.check(Operation::Predict, session)?;
        let n = self.predictions;
        self.predictions += 1;
        Ok(Prediction {
            score: self.scores.get(n).copied().unwrap_or(1000.0 + n as f64),
            finish: self.finish_at == Some(n),
        })
    }

    fn remove_state(&mut self, session: &SessionId) -> Result<(), ClientError> {
        self.calls.push(Call::RemoveState);
        self.check(Operation::RemoveState, session)
    }
}
