//! HTTP handlers for scenario triggers
//!
//! Each trigger runs one scenario on a blocking thread and answers with plain
//! text: the rendered output on success, a fixed error line otherwise. The
//! failure detail is logged by the dispatcher, never sent to the caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::scenario::{DispatchError, ErrorKind};
use crate::server::ServerState;

/// Body sent for any failed run
pub const ERROR_BODY: &str = "error\n";

/// Body sent for a name with no registered scenario
pub const UNKNOWN_BODY: &str = "unknown scenario\n";

/// Error type for trigger handlers
#[derive(Debug)]
pub enum TriggerError {
    /// The dispatcher rejected or failed the run
    Dispatch(DispatchError),
    /// The blocking task panicked or was cancelled
    Join(tokio::task::JoinError),
}

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        match self {
            TriggerError::Dispatch(e) if e.kind() == ErrorKind::UnknownScenario => {
                tracing::debug!("{}", e);
                (StatusCode::NOT_FOUND, UNKNOWN_BODY).into_response()
            }
            TriggerError::Dispatch(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY).into_response()
            }
            TriggerError::Join(e) => {
                tracing::error!("Scenario task did not complete: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY).into_response()
            }
        }
    }
}

/// Run the scenario named in the path
pub async fn scenario_handler(
    State(state): State<ServerState>,
    Path(name): Path<String>,
) -> Result<String, TriggerError> {
    let dispatcher = state.dispatcher.clone();
    let output = tokio::task::spawn_blocking(move || dispatcher.execute(&name))
        .await
        .map_err(TriggerError::Join)?
        .map_err(TriggerError::Dispatch)?;

    Ok(output.render())
}

/// List registered scenario names, one per line
pub async fn scenarios_handler(State(state): State<ServerState>) -> String {
    state
        .dispatcher
        .scenario_names()
        .iter()
        .map(|name| format!("{}\n", name))
        .collect()
}

/// Health check handler
pub async fn health_handler() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{SessionSettings, Store, TxMode};
    use crate::scenario::{Dispatcher, SequencerSettings};
    use std::sync::Arc;
    use std::time::Duration;

    fn create_test_state_with(
        busy_timeout_ms: u64,
        sequencer: SequencerSettings,
    ) -> (tempfile::TempDir, ServerState) {
        let dir = tempfile::tempdir().unwrap();
        let settings = SessionSettings::with_busy_timeout(Duration::from_millis(busy_timeout_ms));
        let store = Store::bootstrap(dir.path().join("http.sqlite3"), settings).unwrap();
        let dispatcher = Dispatcher::new(Arc::new(store), sequencer);
        (dir, ServerState::new(dispatcher))
    }

    fn create_test_state(busy_timeout_ms: u64) -> (tempfile::TempDir, ServerState) {
        create_test_state_with(busy_timeout_ms, SequencerSettings::default())
    }

    async fn trigger(state: &ServerState, name: &str) -> (StatusCode, String) {
        let response = scenario_handler(State(state.clone()), Path(name.to_string()))
            .await
            .into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, state) = create_test_state(5000);

        assert_eq!(trigger(&state, "write").await, (StatusCode::OK, "ok\n".into()));
        assert_eq!(
            trigger(&state, "read").await,
            (StatusCode::OK, "name: name\n".into())
        );

        for _ in 0..9 {
            trigger(&state, "write").await;
        }
        let (status, body) = trigger(&state, "read").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.lines().count(), 10);
        assert!(body.lines().all(|line| line == "name: name"));
    }

    #[tokio::test]
    async fn test_every_scenario_answers() {
        let (_dir, state) = create_test_state(5000);

        for name in state.dispatcher.scenario_names() {
            let (status, _) = trigger(&state, name).await;
            assert_eq!(status, StatusCode::OK, "scenario {}", name);
        }
    }

    #[tokio::test]
    async fn test_unknown_scenario_is_not_found() {
        let (_dir, state) = create_test_state(5000);

        assert_eq!(
            trigger(&state, "vacuum").await,
            (StatusCode::NOT_FOUND, UNKNOWN_BODY.into())
        );
    }

    #[tokio::test]
    async fn test_failure_renders_generic_error() {
        let (_dir, state) = create_test_state(50);
        let _holder = state
            .dispatcher
            .store()
            .begin(TxMode::Immediate)
            .unwrap();

        assert_eq!(
            trigger(&state, "write_read").await,
            (StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY.into())
        );
        // No partial output and nothing persisted
        assert_eq!(state.dispatcher.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_are_serialized() {
        let sequencer = SequencerSettings {
            read_limit: 1000,
            ..Default::default()
        };
        let (_dir, state) = create_test_state_with(5000, sequencer);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move { trigger(&state, "write_read_transaction").await })
            })
            .collect();

        let mut seen = Vec::new();
        for task in tasks {
            let (status, body) = task.await.unwrap();
            assert_eq!(status, StatusCode::OK);
            seen.push(body.lines().count());
        }

        // Each run holds the writer lock from its write to its commit, so every
        // run observes a distinct prefix of the table.
        seen.sort_unstable();
        assert_eq!(seen, (1..=8).collect::<Vec<_>>());
        assert_eq!(state.dispatcher.store().count().unwrap(), 8);
    }

    #[tokio::test]
    async fn test_scenarios_listing() {
        let (_dir, state) = create_test_state(5000);

        let body = scenarios_handler(State(state)).await;
        assert_eq!(body.lines().count(), 8);
        assert!(body.starts_with("read\n"));
        assert_eq!(health_handler().await, "OK");
    }
}
