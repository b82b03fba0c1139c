//! # Protocol Messages and Framing
//!
//! Requests are a single JSON object tagged by `msg_type`; the session identifier travels
//! as `query_id`. Replies are JSON objects tagged the same way, where a `msg_type` of
//! `"error"` means the service rejected the request.
//!
//! | operation    | `msg_type`            | request payload                                   | reply payload          |
//! |--------------|-----------------------|---------------------------------------------------|------------------------|
//! | init         | `init`                | `rows_array`, `table_array`, `max_samples`        | -                      |
//! | join_card    | `join_card`           | -                                                 | `join_card`            |
//! | predict      | `guided_optimization` | `Execution Time`, `Plan`                          | `finish`, `latency`    |
//! | remove_state | `remove_state`        | -                                                 | -                      |
//!
//! ## Framing
//!
//! The request body is followed by the `*LERO_END*` marker before the client half-closes
//! the connection. The half-close is the real delimiter; the marker lets services that
//! scan for it stop reading early. Replies carry no marker.

use crate::session::SessionId;
use bytes::{BufMut, Bytes, BytesMut};
use lero_core::serialize::PlanDocument;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Marker appended after every request body.
pub const END_OF_MESSAGE: &str = "*LERO_END*";

/// `msg_type` of a rejection reply.
pub const MSG_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg_type")]
pub enum Request {
    /// Baseline cardinalities from the recording round.
    #[serde(rename = "init")]
    Init {
        query_id: SessionId,
        rows_array: Vec<f64>,
        table_array: Vec<Vec<String>>,
        max_samples: u32,
    },
    /// Ask for the next cardinality vector to replay.
    #[serde(rename = "join_card")]
    JoinCard { query_id: SessionId },
    /// Ask for the predicted score of a candidate plan.
    #[serde(rename = "guided_optimization")]
    Predict {
        query_id: SessionId,
        /// Measured execution time in milliseconds, 0 when not measured.
        #[serde(rename = "Execution Time")]
        execution_time: f64,
        #[serde(rename = "Plan")]
        plan: PlanDocument,
    },
    /// Drop all service-side state of the session.
    #[serde(rename = "remove_state")]
    RemoveState { query_id: SessionId },
}

impl Request {
    pub fn query_id(&self) -> &SessionId {
        match self {
            Request::Init { query_id, .. }
            | Request::JoinCard { query_id }
            | Request::Predict { query_id, .. }
            | Request::RemoveState { query_id } => query_id,
        }
    }
}

/// Acknowledgement for `init` and `remove_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckReply {
    pub msg_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinCardReply {
    pub msg_type: String,
    #[serde(default)]
    pub join_card: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictReply {
    pub msg_type: String,
    /// 1 when the service wants exploration to stop after this round.
    #[serde(default)]
    pub finish: i64,
    /// Predicted score; lower is better.
    pub latency: f64,
}

impl AckReply {
    pub fn new(msg_type: impl Into<String>) -> Self {
        Self {
            msg_type: msg_type.into(),
        }
    }

    pub fn error() -> Self {
        Self::new(MSG_ERROR)
    }
}

#[derive(Deserialize)]
struct Envelope {
    msg_type: String,
}

/// Failure to turn a reply body into a typed reply.
#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("scoring service rejected the request")]
    Rejected,
    #[error("malformed reply: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encode a request body, including the end-of-message marker.
pub fn encode_request(request: &Request) -> Result<Bytes, serde_json::Error> {
    let mut buf = BytesMut::with_capacity(1024);
    {
        let mut writer = (&mut buf).writer();
        serde_json::to_writer_pretty(&mut writer, request)?;
    }
    buf.put_slice(END_OF_MESSAGE.as_bytes());
    Ok(buf.freeze())
}

/// Decode a request body as received by a service, tolerating the end-of-message
/// marker and surrounding whitespace.
pub fn decode_request(body: &[u8]) -> Result<Request, serde_json::Error> {
    serde_json::from_slice(strip_end_marker(body))
}

/// Decode a reply body. An empty body counts as a rejection.
pub fn decode_reply<T: DeserializeOwned>(body: &[u8]) -> Result<T, ReplyError> {
    let body = body.trim_ascii();
    if body.is_empty() {
        return Err(ReplyError::Rejected);
    }
    let envelope: Envelope = serde_json::from_slice(body)?;
    if envelope.msg_type == MSG_ERROR {
        return Err(ReplyError::Rejected);
    }
    Ok(serde_json::from_slice(body)?)
}

fn strip_end_marker(body: &[u8]) -> &[u8] {
    let body = body.trim_ascii();
    body.strip_suffix(END_OF_MESSAGE.as_bytes())
        .unwrap_or(body)
        .trim_ascii()
}
