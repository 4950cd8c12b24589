//! # Message Handler Registry
//!
//! Purpose: route an inbound `RequestHeader.message_id` to the handler that
//! knows how to decode its `content` and act on it — typically by building
//! a typed request and calling into the client channel.
//!
//! Handlers run synchronously and are dispatched from `spawn_blocking`, so
//! they are free to make blocking calls (the client channel is
//! synchronous/thread-blocking by design; see `rpc-client`).

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

/// Receives the decoded `content` bytes and the uuid of the connection the
/// request arrived on.
pub type MessageHandler = Arc<dyn Fn(Vec<u8>, Uuid) + Send + Sync>;

#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<u32, MessageHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, message_id: u32, handler: MessageHandler) {
        self.handlers.insert(message_id, handler);
    }

    pub fn lookup(&self, message_id: u32) -> Option<MessageHandler> {
        self.handlers.get(&message_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn registered_handler_is_invoked_with_content_and_connection() {
        let mut registry = HandlerRegistry::new();
        let seen_len = Arc::new(AtomicU32::new(0));
        let seen_len_clone = Arc::clone(&seen_len);
        registry.register(
            7,
            Arc::new(move |content, _conn_id| {
                seen_len_clone.store(content.len() as u32, Ordering::SeqCst);
            }),
        );

        let handler = registry.lookup(7).unwrap();
        handler(vec![1, 2, 3], Uuid::new_v4());
        assert_eq!(seen_len.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unregistered_message_id_is_none() {
        let registry = HandlerRegistry::new();
        assert!(registry.lookup(99).is_none());
    }
}
