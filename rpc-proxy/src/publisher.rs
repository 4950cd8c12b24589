//! # Publisher
//!
//! Purpose: model the Redis pub/sub collaborator the original framework
//! uses to push messages at clients from outside the handling request's own
//! connection. The proxy only needs the `publish` contract; the in-process
//! [`LoopbackPublisher`] is enough to exercise the push path end to end
//! without a real message broker.

use std::sync::Arc;

use crate::connection_manager::{ConnectionManager, ProxyError};

pub trait Publisher: Send + Sync {
    fn publish(&self, client_id: &str, payload: Vec<u8>) -> Result<(), ProxyError>;
}

/// Delivers directly through the local [`ConnectionManager`] instead of a
/// broker round trip. Correct only within a single proxy process — the
/// scenario this framework's in-process tests and single-node deployments
/// run in.
pub struct LoopbackPublisher {
    connections: Arc<ConnectionManager>,
}

impl LoopbackPublisher {
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        LoopbackPublisher { connections }
    }
}

impl Publisher for LoopbackPublisher {
    fn publish(&self, client_id: &str, payload: Vec<u8>) -> Result<(), ProxyError> {
        self.connections.push_to_client(client_id, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn loopback_publish_reaches_bound_connection() {
        let connections = Arc::new(ConnectionManager::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = connections.register(tx);
        connections.bind_client("client-1", id);

        let publisher = LoopbackPublisher::new(Arc::clone(&connections));
        publisher.publish("client-1", b"push".to_vec()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), b"push");
    }
}
