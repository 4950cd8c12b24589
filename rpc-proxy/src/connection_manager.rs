//! # Connection Manager
//!
//! Purpose: track every connection the proxy currently has open, so a
//! message pushed to a `client_id` (e.g. via the pub/sub collaborator) can
//! be routed to the live connection that owns it.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no connection bound to client {0:?}")]
    UnknownClient(String),
    #[error("connection {0} is no longer accepting writes")]
    Closed(Uuid),
}

/// A handle to an accepted connection's outbound channel. The frontend's
/// writer task owns the receiving half and serializes every send onto the
/// socket.
#[derive(Clone)]
struct ConnectionHandle {
    sender: mpsc::UnboundedSender<Vec<u8>>,
}

#[derive(Default)]
struct Inner {
    by_uuid: HashMap<Uuid, ConnectionHandle>,
    client_to_uuid: HashMap<String, Uuid>,
}

/// Maps `uuid <-> connection` and `client_id <-> uuid`.
#[derive(Default)]
pub struct ConnectionManager {
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly accepted connection and returns its assigned id.
    pub fn register(&self, sender: mpsc::UnboundedSender<Vec<u8>>) -> Uuid {
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().expect("connection manager mutex poisoned");
        inner.by_uuid.insert(id, ConnectionHandle { sender });
        id
    }

    /// Associates `client_id` with an already-registered connection `id`.
    pub fn bind_client(&self, client_id: &str, id: Uuid) {
        let mut inner = self.inner.lock().expect("connection manager mutex poisoned");
        inner.client_to_uuid.insert(client_id.to_string(), id);
    }

    /// Removes a connection and purges any `client_id` mapping pointing at it.
    pub fn remove(&self, id: Uuid) {
        let mut inner = self.inner.lock().expect("connection manager mutex poisoned");
        inner.by_uuid.remove(&id);
        inner.client_to_uuid.retain(|_, mapped| *mapped != id);
    }

    /// Removes a connection by `client_id`, purging both mappings.
    pub fn remove_by_client(&self, client_id: &str) {
        let mut inner = self.inner.lock().expect("connection manager mutex poisoned");
        if let Some(id) = inner.client_to_uuid.remove(client_id) {
            inner.by_uuid.remove(&id);
        }
    }

    /// Pushes `payload` to the connection bound to `client_id`.
    pub fn push_to_client(&self, client_id: &str, payload: Vec<u8>) -> Result<(), ProxyError> {
        let inner = self.inner.lock().expect("connection manager mutex poisoned");
        let id = *inner
            .client_to_uuid
            .get(client_id)
            .ok_or_else(|| ProxyError::UnknownClient(client_id.to_string()))?;
        let handle = inner.by_uuid.get(&id).ok_or(ProxyError::Closed(id))?;
        handle.sender.send(payload).map_err(|_| ProxyError::Closed(id))
    }

    pub fn connection_count(&self) -> usize {
        self.inner.lock().expect("connection manager mutex poisoned").by_uuid.len()
    }
}
