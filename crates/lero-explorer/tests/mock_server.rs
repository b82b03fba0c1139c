//! End-to-end exploration over TCP against the mock scoring service.

mod common;

use common::{FakePlanner, FakeQuery};
use lero_client::ScoringClient;
use lero_explorer::{CandidateExplorer, LeroConfig, LeroPlanner};
use lero_mock_server::{serve, MockConfig, MockScoringState};
use std::sync::{Arc, Mutex};

/// Start the mock service on an ephemeral port in a background runtime.
fn start_mock(config: MockConfig) -> (u16, Arc<Mutex<MockScoringState>>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let listener = runtime.block_on(tokio::net::TcpListener::bind("127.0.0.1:0")).unwrap();
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(Mutex::new(MockScoringState::new(config)));
    let shared = Arc::clone(&state);
    std::thread::spawn(move || runtime.block_on(serve(listener, shared)));
    (port, state)
}

fn config(port: u16) -> LeroConfig {
    LeroConfig {
        enabled: true,
        server_host: "127.0.0.1".to_string(),
        server_port: port,
        io_timeout_ms: Some(5_000),
        ..LeroConfig::default()
    }
}

#[test]
fn test_explore_against_mock_service() {
    let (port, state) = start_mock(MockConfig::default());
    let query = FakeQuery::new(&[("a", 100.0), ("b", 50.0)]);
    let config = config(port);
    let client = ScoringClient::new(config.server_host.clone(), config.server_port)
        .with_timeout(config.io_timeout());
    let mut explorer = CandidateExplorer::new(FakePlanner::new(&query), client, config);

    let best = explorer.explore(&query).unwrap();

    // One level, four factors: the baseline plus four replays.
    assert_eq!(explorer.planner().passes(), 5);
    // The mock scores by total cost, which falls with the join estimate. The third
    // factor (0.01) gives the smallest estimate.
    assert_eq!(best.round, 3);
    assert!(best.plan.root.rows < 1.0);
    assert_eq!(best.score, best.plan.root.total_cost);
    assert_eq!(state.lock().unwrap().sessions(), 0);
}

#[test]
fn test_hook_against_mock_service() {
    let (port, state) = start_mock(MockConfig {
        factors: vec![100.0],
        candidates: Some(2),
    });
    let query = FakeQuery::new(&[("a", 100.0), ("b", 50.0), ("c", 400.0)]);
    let mut hook = LeroPlanner::from_config(FakePlanner::new(&query), config(port));

    let plan = hook.plan(&query).unwrap();

    // Scaling up only makes plans more expensive, so the baseline wins.
    assert_eq!(plan.root.rows, 200.0);
    assert_eq!(hook.explorer().planner().passes(), 2);
    assert_eq!(state.lock().unwrap().sessions(), 0);
}

#[test]
fn test_unreachable_service_fails_exploration() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let query = FakeQuery::new(&[("a", 100.0), ("b", 50.0)]);
    let mut hook = LeroPlanner::from_config(FakePlanner::new(&query), config(port));

    let err = hook.plan(&query).unwrap_err();
    assert!(matches!(err, lero_explorer::ExploreError::Scoring(ref e) if e.is_connection()));
}
