//! HTTP trigger server for txprobe
//!
//! One route per scenario name, each answering in plain text. A load
//! generator hitting these routes concurrently is what makes SQLite's
//! writer serialization observable.
//!
//! # Routes
//!
//! - `/{scenario}` and `/{scenario}/` - run the named scenario (any method)
//! - `/scenarios` - registered scenario names
//! - `/health` - liveness check
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use txprobe::database::{SessionSettings, Store};
//! use txprobe::scenario::{Dispatcher, SequencerSettings};
//! use txprobe::server::{start_server, ServerConfig};
//!
//! let store = Store::bootstrap("./db.sqlite3", SessionSettings::default())?;
//! let dispatcher = Dispatcher::new(Arc::new(store), SequencerSettings::default());
//! start_server(dispatcher, ServerConfig::default()).await?;
//! ```

pub mod handler;

pub use handler::{health_handler, scenario_handler, scenarios_handler, TriggerError};

use axum::{routing::any, routing::get, Router as AxumRouter};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ProbeConfig;
use crate::scenario::Dispatcher;

// =============================================================================
// Server Configuration
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub address: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the listener settings from the probe configuration
    pub fn from_probe_config(config: &ProbeConfig) -> Self {
        Self {
            address: config.address.clone(),
            port: config.port,
        }
    }

    /// Set the address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Get the full bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// =============================================================================
// Server State
// =============================================================================

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    /// Dispatcher owning the shared store
    pub dispatcher: Arc<Dispatcher>,
}

impl ServerState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

// =============================================================================
// Axum Router Creation
// =============================================================================

/// Create the Axum router for the trigger server
pub fn create_axum_router(state: ServerState) -> AxumRouter {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    AxumRouter::new()
        .route("/health", get(health_handler))
        .route("/scenarios", get(scenarios_handler))
        .route("/:scenario", any(scenario_handler))
        .route("/:scenario/", any(scenario_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Server Startup
// =============================================================================

/// Start the trigger server and serve until the listener fails
pub async fn start_server(dispatcher: Dispatcher, config: ServerConfig) -> anyhow::Result<()> {
    let app = create_axum_router(ServerState::new(dispatcher));

    let bind_address = config.bind_address();
    tracing::info!("Starting trigger server on {}", bind_address);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{SessionSettings, Store};
    use crate::scenario::SequencerSettings;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Serve the real router on an ephemeral port
    async fn spawn_test_server() -> (tempfile::TempDir, std::net::SocketAddr) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            Store::bootstrap(dir.path().join("router.sqlite3"), SessionSettings::default())
                .unwrap();
        let dispatcher = Dispatcher::new(Arc::new(store), SequencerSettings::default());
        let app = create_axum_router(ServerState::new(dispatcher));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (dir, addr)
    }

    async fn request(addr: std::net::SocketAddr, method: &str, path: &str) -> (u16, String) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let head = format!(
            "{} {} HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            method, path
        );
        stream.write_all(head.as_bytes()).await.unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let raw = String::from_utf8(raw).unwrap();

        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
        (status, body.to_string())
    }

    #[tokio::test]
    async fn test_router_routes() {
        let (_dir, addr) = spawn_test_server().await;

        assert_eq!(request(addr, "GET", "/health").await, (200, "OK".into()));

        let (status, body) = request(addr, "GET", "/scenarios").await;
        assert_eq!(status, 200);
        let names: Vec<_> = body.lines().collect();
        assert_eq!(names.len(), 8);
        assert_eq!(names[0], "read");
        assert_eq!(names[7], "read_write_transaction_immediate");

        // With and without the trailing slash, any method
        assert_eq!(request(addr, "GET", "/write/").await, (200, "ok\n".into()));
        assert_eq!(request(addr, "POST", "/write").await, (200, "ok\n".into()));
        assert_eq!(
            request(addr, "GET", "/read").await,
            (200, "name: name\nname: name\n".into())
        );
        assert_eq!(
            request(addr, "PUT", "/read/").await,
            (200, "name: name\nname: name\n".into())
        );

        assert_eq!(
            request(addr, "GET", "/vacuum").await,
            (404, "unknown scenario\n".into())
        );
        let (status, _) = request(addr, "GET", "/read/extra").await;
        assert_eq!(status, 404);
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address, "0.0.0.0");
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_server_config_builder() {
        let config = ServerConfig::new().with_address("127.0.0.1").with_port(9000);

        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_server_config_from_probe_config() {
        let probe = ProbeConfig {
            port: 8123,
            ..Default::default()
        };
        assert_eq!(
            ServerConfig::from_probe_config(&probe).bind_address(),
            "0.0.0.0:8123"
        );
    }
}
