//! Standalone mock scoring service.
//!
//! Listens on `LERO_MOCK_ADDR` (default `127.0.0.1:14567`, the port the explorer
//! connects to by default). `LERO_MOCK_CANDIDATES` fixes the number of plans scored per
//! session. Logging is controlled by `RUST_LOG` (defaults to `lero=debug`).

use lero_mock_server::{serve, MockConfig, MockScoringState};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lero=debug".parse()?))
        .init();

    let addr = std::env::var("LERO_MOCK_ADDR").unwrap_or_else(|_| "127.0.0.1:14567".to_string());
    let mut config = MockConfig::default();
    if let Ok(candidates) = std::env::var("LERO_MOCK_CANDIDATES") {
        config.candidates = Some(candidates.trim().parse()?);
    }

    let state = Arc::new(Mutex::new(MockScoringState::new(config)));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve(listener, state).await?;
    Ok(())
}
