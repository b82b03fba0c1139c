//! # Scoring Service Client
//!
//! `ScoringService` is the seam between the explorer and the scoring service: one
//! method per protocol operation. `ScoringClient` implements it over TCP with one
//! connection per request; tests and embedders can substitute any other
//! implementation.
//!
//! ## Error Classification
//!
//! `ClientError` distinguishes the two failure families the explorer reacts to
//! differently:
//!
//! - **Connection errors** (`is_connection`): the exchange itself failed. Always fatal.
//! - **Protocol errors** (`is_protocol`): the service answered, but with an
//!   error-tagged, empty or undecodable reply. Fatal for every operation except
//!   `remove_state`. `is_rejected` narrows this to error-tagged and empty replies.
//!
//! Encoding failures are neither and are always fatal.

use crate::protocol::{self, AckReply, JoinCardReply, PredictReply, ReplyError, Request};
use crate::session::SessionId;
use lero_core::serialize::PlanDocument;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;
use tracing::{debug, trace};

/// The protocol operations, for error reporting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Init,
    JoinCard,
    Predict,
    RemoveState,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Init => "init",
            Operation::JoinCard => "join_card",
            Operation::Predict => "predict",
            Operation::RemoveState => "remove_state",
        };
        f.write_str(name)
    }
}

impl From<&Request> for Operation {
    fn from(request: &Request) -> Self {
        match request {
            Request::Init { .. } => Operation::Init,
            Request::JoinCard { .. } => Operation::JoinCard,
            Request::Predict { .. } => Operation::Predict,
            Request::RemoveState { .. } => Operation::RemoveState,
        }
    }
}

/// Errors from a single protocol exchange.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("unable to connect to scoring service at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("{op}: connection to scoring service failed: {source}")]
    Io {
        op: Operation,
        #[source]
        source: io::Error,
    },
    #[error("{op}: scoring service replied with an error")]
    Rejected { op: Operation },
    #[error("{op}: malformed reply from scoring service: {source}")]
    Malformed {
        op: Operation,
        #[source]
        source: serde_json::Error,
    },
    #[error("{op}: failed to encode request: {source}")]
    Encode {
        op: Operation,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn is_connection(&self) -> bool {
        matches!(self, ClientError::Connect { .. } | ClientError::Io { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ClientError::Rejected { .. })
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, ClientError::Rejected { .. } | ClientError::Malformed { .. })
    }

    fn from_reply(op: Operation, err: ReplyError) -> Self {
        match err {
            ReplyError::Rejected => ClientError::Rejected { op },
            ReplyError::Malformed(source) => ClientError::Malformed { op, source },
        }
    }
}

/// Score of one candidate plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted cost; lower is better.
    pub score: f64,
    /// The service asks to stop exploring after this round.
    pub finish: bool,
}

/// The scoring service operations used by the explorer.
pub trait ScoringService {
    /// Register a session with the recording round's baseline.
    fn init(
        &mut self,
        session: &SessionId,
        cardinalities: &[f64],
        tables: &[Vec<String>],
        max_rounds: u32,
    ) -> Result<(), ClientError>;

    /// Fetch the cardinality vector to replay in the next round.
    fn join_cardinalities(&mut self, session: &SessionId) -> Result<Vec<f64>, ClientError>;

    /// Score a serialized candidate plan.
    fn predict(
        &mut self,
        session: &SessionId,
        execution_time: f64,
        plan: PlanDocument,
    ) -> Result<Prediction, ClientError>;

    /// Release the session's state on the service.
    fn remove_state(&mut self, session: &SessionId) -> Result<(), ClientError>;
}

/// TCP client, one connection per request.
#[derive(Debug, Clone)]
pub struct ScoringClient {
    host: String,
    port: u16,
    timeout: Option<Duration>,
}

impl ScoringClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: None,
        }
    }

    /// Bound every read and write. Without a timeout an unresponsive service blocks
    /// the caller indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Send one request and return the raw reply body.
    pub fn exchange(&self, request: &Request) -> Result<Vec<u8>, ClientError> {
        let op = Operation::from(request);
        let body = protocol::encode_request(request)
            .map_err(|source| ClientError::Encode { op, source })?;

        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).map_err(|source| {
            ClientError::Connect {
                addr: self.addr(),
                source,
            }
        })?;
        let io_err = |source: io::Error| ClientError::Io { op, source };
        stream.set_read_timeout(self.timeout).map_err(io_err)?;
        stream.set_write_timeout(self.timeout).map_err(io_err)?;

        trace!(%op, bytes = body.len(), "Sending request");
        stream.write_all(&body).map_err(io_err)?;
        stream.shutdown(Shutdown::Write).map_err(io_err)?;

        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).map_err(io_err)?;
        trace!(%op, bytes = reply.len(), "Received reply");
        Ok(reply)
    }

    fn call<T: serde::de::DeserializeOwned>(&self, request: &Request) -> Result<T, ClientError> {
        let op = Operation::from(request);
        let reply = self.exchange(request)?;
        protocol::decode_reply(&reply).map_err(|err| ClientError::from_reply(op, err))
    }
}

impl ScoringService for ScoringClient {
    fn init(
        &mut self,
        session: &SessionId,
        cardinalities: &[f64],
        tables: &[Vec<String>],
        max_rounds: u32,
    ) -> Result<(), ClientError> {
        let request = Request::Init {
            query_id: session.clone(),
            rows_array: cardinalities.to_vec(),
            table_array: tables.to_vec(),
            max_samples: max_rounds,
        };
        let ack: AckReply = self.call(&request)?;
        debug!(reply = %ack.msg_type, joins = cardinalities.len(), "Session initialised");
        Ok(())
    }

    fn join_cardinalities(&mut self, session: &SessionId) -> Result<Vec<f64>, ClientError> {
        let reply: JoinCardReply = self.call(&Request::JoinCard {
            query_id: session.clone(),
        })?;
        Ok(reply.join_card)
    }

    fn predict(
        &mut self,
        session: &SessionId,
        execution_time: f64,
        plan: PlanDocument,
    ) -> Result<Prediction, ClientError> {
        let reply: PredictReply = self.call(&Request::Predict {
            query_id: session.clone(),
            execution_time,
            plan,
        })?;
        Ok(Prediction {
            score: reply.latency,
            finish: reply.finish != 0,
        })
    }

    fn remove_state(&mut self, session: &SessionId) -> Result<(), ClientError> {
        let _: AckReply = self.call(&Request::RemoveState {
            query_id: session.clone(),
        })?;
        Ok(())
    }
}
