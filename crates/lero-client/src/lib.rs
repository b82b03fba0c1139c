//! # lero-client: Scoring Service Protocol
//!
//! This crate speaks the request/response protocol of the external learned-cost scoring
//! service.
//!
//! ## Wire Protocol
//!
//! Every request opens its own TCP connection:
//!
//! ```text
//! client                                   scoring service
//!   | connect                                    |
//!   | JSON request body + "*LERO_END*"  ------>  |
//!   | shutdown(write)                            |
//!   |  <------  JSON response body, then close   |
//! ```
//!
//! ## Module Overview
//!
//! - **`protocol`**: Request and reply schemas plus the framing codec.
//! - **`session`**: The per-query session identifier carried by every request.
//! - **`client`**: The `ScoringService` trait and its TCP implementation.

pub mod client;
pub mod protocol;
pub mod session;

pub use client::{ClientError, Operation, Prediction, ScoringClient, ScoringService};
pub use session::SessionId;
