//! # lero-mock-server: Local Scoring Service
//!
//! A stand-in for the learned-cost scoring service, for development and end-to-end
//! tests. It speaks the same protocol as the real service but scores plans with a fixed
//! rule instead of a model.
//!
//! ## Behaviour
//!
//! - **`init`** stores the session's baseline cardinalities and table attributions.
//! - **`join_card`** returns the baseline with one join level scaled. A join's level is
//!   the number of tables attributed to it. Successive calls cycle through the levels
//!   present in the baseline, and after each full cycle move on to the next scale
//!   factor.
//! - **`guided_optimization`** scores the plan by its measured execution time when one
//!   is given, otherwise by the root node's `Total Cost`. The reply carries `finish`
//!   once every level/factor combination has been scored (or `MockConfig::candidates`
//!   plans, if set), or once `max_samples - 1` plans have been scored.
//! - **`remove_state`** drops the session.
//!
//! Unknown sessions and undecodable requests get `{"msg_type":"error"}`.
//!
//! ## Concurrency
//!
//! Connections are served concurrently on tokio tasks. All sessions live in one
//! `MockScoringState` behind a mutex, held only while a single request is handled.

use lero_client::protocol::{self, AckReply, JoinCardReply, PredictReply, Request};
use lero_client::SessionId;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Scoring behaviour knobs.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Factors applied to the selected join level, in order.
    pub factors: Vec<f64>,
    /// Number of plans to score before asking the client to finish. `None` scores one
    /// plan per level/factor combination plus the baseline.
    pub candidates: Option<u32>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            factors: vec![0.1, 10.0, 0.01, 100.0],
            candidates: None,
        }
    }
}

#[derive(Debug)]
struct Session {
    baseline: Vec<f64>,
    tables: Vec<Vec<String>>,
    levels: Vec<usize>,
    max_samples: u32,
    fetched: usize,
    scored: u32,
}

/// Reasons a request is answered with an error reply.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Ack(AckReply),
    JoinCard(JoinCardReply),
    Predict(PredictReply),
}

#[derive(Debug, Default)]
pub struct MockScoringState {
    config: MockConfig,
    sessions: HashMap<SessionId, Session>,
}

impl MockScoringState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    /// Number of sessions currently held.
    pub fn sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Decode one request body and produce the encoded reply.
    pub fn handle_body(&mut self, body: &[u8]) -> Vec<u8> {
        let reply = protocol::decode_request(body)
            .map_err(MockError::from)
            .and_then(|request| self.handle(request))
            .unwrap_or_else(|err| {
                warn!(error = %err, "Rejecting request");
                Reply::Ack(AckReply::error())
            });
        serde_json::to_vec(&reply).unwrap_or_default()
    }

    pub fn handle(&mut self, request: Request) -> Result<Reply, MockError> {
        match request {
            Request::Init {
                query_id,
                rows_array,
                table_array,
                max_samples,
            } => {
                let levels: BTreeSet<usize> = table_array.iter().map(Vec::len).collect();
                debug!(
                    session = %query_id,
                    joins = rows_array.len(),
                    max_samples,
                    "Session registered"
                );
                self.sessions.insert(
                    query_id,
                    Session {
                        baseline: rows_array,
                        tables: table_array,
                        levels: levels.into_iter().collect(),
                        max_samples,
                        fetched: 0,
                        scored: 0,
                    },
                );
                Ok(Reply::Ack(AckReply::new("init")))
            }
            Request::JoinCard { query_id } => {
                let factors = &self.config.factors;
                let session = self
                    .sessions
                    .get_mut(&query_id)
                    .ok_or(MockError::UnknownSession(query_id))?;
                let join_card = session.next_vector(factors);
                Ok(Reply::JoinCard(JoinCardReply {
                    msg_type: "join_card".to_string(),
                    join_card,
                }))
            }
            Request::Predict {
                query_id,
                execution_time,
                plan,
            } => {
                let candidates = self.config.candidates;
                let combinations = self.config.factors.len();
                let session = self
                    .sessions
                    .get_mut(&query_id)
                    .ok_or(MockError::UnknownSession(query_id))?;
                session.scored += 1;

                let latency = if execution_time > 0.0 {
                    execution_time
                } else {
                    plan.total_cost
                };
                let target =
                    candidates.unwrap_or((1 + session.levels.len() * combinations) as u32);
                let finish = session.scored >= target
                    || session.scored >= session.max_samples.saturating_sub(1);
                debug!(scored = session.scored, latency, finish, "Scored plan");
                Ok(Reply::Predict(PredictReply {
                    msg_type: "guided_optimization".to_string(),
                    finish: i64::from(finish),
                    latency,
                }))
            }
            Request::RemoveState { query_id } => {
                let session = self
                    .sessions
                    .remove(&query_id)
                    .ok_or(MockError::UnknownSession(query_id))?;
                debug!(scored = session.scored, "Session removed");
                Ok(Reply::Ack(AckReply::new("remove_state")))
            }
        }
    }
}

impl Session {
    fn next_vector(&mut self, factors: &[f64]) -> Vec<f64> {
        let call = self.fetched;
        self.fetched += 1;
        if self.levels.is_empty() || factors.is_empty() {
            return self.baseline.clone();
        }

        let level = self.levels[call % self.levels.len()];
        let factor = factors[(call / self.levels.len()) % factors.len()];
        self.baseline
            .iter()
            .zip(&self.tables)
            .map(|(rows, tables)| if tables.len() == level { rows * factor } else { *rows })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Server loop
// ---------------------------------------------------------------------------

/// Accept connections forever, one request per connection.
pub async fn serve(listener: TcpListener, state: Arc<Mutex<MockScoringState>>) -> io::Result<()> {
    info!(addr = %listener.local_addr()?, "Mock scoring service listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, state).await {
                warn!(%peer, error = %err, "Connection failed");
            }
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    state: Arc<Mutex<MockScoringState>>,
) -> io::Result<()> {
    let mut body = Vec::new();
    stream.read_to_end(&mut body).await?;
    let reply = {
        let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.handle_body(&body)
    };
    stream.write_all(&reply).await?;
    stream.shutdown().await
}
