//! Server configuration.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::server::error::Error;
use crate::server::listener::ListenAddr;

/// HTTP server configuration.
///
/// Durations are stored in milliseconds so the configuration reads naturally
/// as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The addresses to listen on. All of them must bind for the server to start.
    pub listeners: Vec<ListenAddr>,
    /// The size of each read from a connection.
    pub read_buffer_size: usize,
    /// Requests larger than this are rejected as malformed.
    pub max_request_size: usize,
    /// Connections accepted per ready listener in one loop iteration.
    pub accept_batch: usize,
    /// Longest wait for readiness while connections are in flight.
    pub busy_wait_ms: u64,
    /// Deadline for a whole connection, from accept to close.
    pub task_timeout_ms: Option<u64>,
    /// How long shutdown waits for in-flight connections.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listeners: vec![ListenAddr::new(8080)],
            read_buffer_size: 8192,
            max_request_size: 1024 * 1024,
            accept_batch: 16,
            busy_wait_ms: 10,
            task_timeout_ms: None,
            shutdown_timeout_ms: 30_000,
        }
    }
}

impl ServerConfig {
    /// The default configuration listening on `listeners`.
    pub fn listening_on(listeners: impl IntoIterator<Item = ListenAddr>) -> Self {
        Self {
            listeners: listeners.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn busy_wait(&self) -> Duration {
        Duration::from_millis(self.busy_wait_ms)
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
