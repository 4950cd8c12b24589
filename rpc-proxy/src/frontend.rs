//! # Proxy Frontend
//!
//! Purpose: the inbound TCP acceptor external clients connect to. Each
//! connection is framed identically to the core wire format (§4.1); the
//! payload is a `RequestHeader { message_id, content }` routed through the
//! [`HandlerRegistry`]. A per-connection writer task owns the socket's
//! write half so a pushed message (via [`crate::publisher::Publisher`])
//! and a handler's own reply never interleave.

use std::sync::Arc;

use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use uuid::Uuid;

use rpc_common::codec::{self, asyncio};
use rpc_common::RequestHeader;

use crate::connection_manager::ConnectionManager;
use crate::handler::HandlerRegistry;

/// Accepts connections on `listener` forever, dispatching each through
/// `handlers` and tracking it in `connections`.
pub async fn serve(
    listener: TcpListener,
    handlers: Arc<HandlerRegistry>,
    connections: Arc<ConnectionManager>,
) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let handlers = Arc::clone(&handlers);
        let connections = Arc::clone(&connections);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, handlers, Arc::clone(&connections)).await {
                tracing::warn!(%peer, %err, "proxy connection ended with error");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    handlers: Arc<HandlerRegistry>,
    connections: Arc<ConnectionManager>,
) -> Result<(), rpc_common::RpcError> {
    let (read_half, write_half) = tokio::io::split(stream);
    let (tx, rx) = mpsc::unbounded_channel();
    let conn_id = connections.register(tx);

    let writer = tokio::spawn(run_writer(write_half, rx));

    let result = read_loop(read_half, &handlers, conn_id).await;

    connections.remove(conn_id);
    writer.abort();
    result
}

async fn read_loop(
    mut read_half: ReadHalf<TcpStream>,
    handlers: &HandlerRegistry,
    conn_id: Uuid,
) -> Result<(), rpc_common::RpcError> {
    loop {
        let frame = match asyncio::read_frame(&mut read_half).await {
            Ok(frame) => frame,
            Err(_) => return Ok(()), // peer closed or sent a malformed frame; end quietly
        };
        let header: RequestHeader = codec::decode_payload(&frame)?;

        match handlers.lookup(header.message_id) {
            Some(handler) => {
                let content = header.content;
                tokio::task::spawn_blocking(move || handler(content, conn_id));
            }
            None => {
                tracing::warn!(message_id = header.message_id, %conn_id, "dropping unregistered message");
            }
        }
    }
}

async fn run_writer(mut write_half: WriteHalf<TcpStream>, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(payload) = rx.recv().await {
        if let Ok(frame) = codec::build_frame(&payload) {
            if write_half.write_all(&frame).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn routes_registered_message_id_to_handler() {
        let mut registry = HandlerRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        registry.register(
            1,
            Arc::new(move |_content, _conn_id| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let handlers = Arc::new(registry);
        let connections = Arc::new(ConnectionManager::new());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handlers_clone = Arc::clone(&handlers);
        let connections_clone = Arc::clone(&connections);
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let _ = handle_connection(stream, handlers_clone, connections_clone).await;
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let header = RequestHeader::new(1, b"payload".to_vec());
        let payload = codec::encode_payload(&header).unwrap();
        asyncio::write_frame(&mut client, &payload).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pushed_message_is_delivered_to_client() {
        let connections = Arc::new(ConnectionManager::new());
        let mut registry = HandlerRegistry::new();
        let bind_connections = Arc::clone(&connections);
        registry.register(
            1,
            Arc::new(move |_content, conn_id| {
                bind_connections.bind_client("client-1", conn_id);
            }),
        );
        let handlers = Arc::new(registry);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handlers_clone = Arc::clone(&handlers);
        let connections_clone = Arc::clone(&connections);
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let _ = handle_connection(stream, handlers_clone, connections_clone).await;
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let header = RequestHeader::new(1, vec![]);
        let payload = codec::encode_payload(&header).unwrap();
        asyncio::write_frame(&mut client, &payload).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let publisher = crate::publisher::LoopbackPublisher::new(Arc::clone(&connections));
        use crate::publisher::Publisher;
        publisher.publish("client-1", b"pushed".to_vec()).unwrap();

        let frame = asyncio::read_frame(&mut client).await.unwrap();
        assert_eq!(frame, b"pushed");
    }
}
