//! # Coordination Client
//!
//! Purpose: the name-directory contract the endpoint resolver and server
//! dispatcher depend on, modeled after the original framework's ZooKeeper
//! client (`connect` / `create` / `get_data`, durable service nodes with
//! ephemeral method children).
//!
//! A production deployment backs [`CoordinationClient`] with ZooKeeper,
//! etcd, or similar — that implementation is out of scope here. This crate
//! ships [`LocalCoordinationClient`], a process-local, `Arc`-shareable table
//! good enough to run the framework end to end and to exercise it in tests
//! without an external service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// A node in the coordination directory.
#[derive(Debug, Clone)]
pub struct CoordinationNode {
    pub data: Vec<u8>,
    pub ephemeral: bool,
}

#[derive(Debug, Error, Clone)]
pub enum CoordError {
    #[error("coordination client not connected")]
    NotConnected,
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("coordination service initialization failed: {0}")]
    ConnectFailed(String),
}

/// The name-directory contract: connect once, create durable/ephemeral
/// nodes, and read a node's value back.
pub trait CoordinationClient: Send + Sync {
    fn connect(&self) -> Result<(), CoordError>;

    /// Creates `path` with `data` if it does not already exist. Matches the
    /// original's `ZooKeeperClient::Create`, which is a no-op when the node
    /// is already present.
    fn create(&self, path: &str, data: &[u8], ephemeral: bool) -> Result<(), CoordError>;

    /// Reads the value stored at `path`.
    fn get_data(&self, path: &str) -> Result<Vec<u8>, CoordError>;
}

#[derive(Default)]
struct Directory {
    nodes: HashMap<String, CoordinationNode>,
    connected: bool,
}

/// A process-local, `Arc`-shared coordination directory.
///
/// Cloning shares the same backing table, so a provider that publishes
/// endpoints and a client/proxy that resolves them can be wired to the same
/// instance within a process or a test, the way a real deployment shares one
/// ZooKeeper ensemble.
#[derive(Clone, Default)]
pub struct LocalCoordinationClient {
    inner: Arc<Mutex<Directory>>,
}

impl LocalCoordinationClient {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CoordinationClient for LocalCoordinationClient {
    fn connect(&self) -> Result<(), CoordError> {
        let mut dir = self.inner.lock().expect("coordination mutex poisoned");
        dir.connected = true;
        Ok(())
    }

    fn create(&self, path: &str, data: &[u8], ephemeral: bool) -> Result<(), CoordError> {
        let mut dir = self.inner.lock().expect("coordination mutex poisoned");
        if !dir.connected {
            return Err(CoordError::NotConnected);
        }
        dir.nodes.entry(path.to_string()).or_insert(CoordinationNode {
            data: data.to_vec(),
            ephemeral,
        });
        Ok(())
    }

    fn get_data(&self, path: &str) -> Result<Vec<u8>, CoordError> {
        let dir = self.inner.lock().expect("coordination mutex poisoned");
        if !dir.connected {
            return Err(CoordError::NotConnected);
        }
        dir.nodes
            .get(path)
            .map(|node| node.data.clone())
            .ok_or_else(|| CoordError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get_round_trips() {
        let client = LocalCoordinationClient::new();
        client.connect().unwrap();
        client.create("/UserService/Login", b"127.0.0.1:9000", true).unwrap();
        assert_eq!(client.get_data("/UserService/Login").unwrap(), b"127.0.0.1:9000");
    }

    #[test]
    fn get_missing_node_fails() {
        let client = LocalCoordinationClient::new();
        client.connect().unwrap();
        assert!(matches!(
            client.get_data("/Missing/Method"),
            Err(CoordError::NotFound(_))
        ));
    }

    #[test]
    fn create_is_idempotent() {
        let client = LocalCoordinationClient::new();
        client.connect().unwrap();
        client.create("/svc", b"first", false).unwrap();
        client.create("/svc", b"second", false).unwrap();
        assert_eq!(client.get_data("/svc").unwrap(), b"first");
    }

    #[test]
    fn requires_connect_before_use() {
        let client = LocalCoordinationClient::new();
        assert!(matches!(
            client.create("/svc", b"data", false),
            Err(CoordError::NotConnected)
        ));
    }

    #[test]
    fn shared_clone_sees_same_directory() {
        let client = LocalCoordinationClient::new();
        client.connect().unwrap();
        let clone = client.clone();
        clone.create("/svc/method", b"127.0.0.1:1", true).unwrap();
        assert_eq!(client.get_data("/svc/method").unwrap(), b"127.0.0.1:1");
    }
}
