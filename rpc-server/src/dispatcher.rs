//! # Server Dispatcher
//!
//! Purpose: the Tokio-based mirror of the client's framed codec — accept a
//! connection, read one framed `RpcHeader`, look the method up in the
//! [`ServiceRegistry`], invoke it, and write back an unframed response
//! before closing the connection.
//!
//! Each accepted connection serves exactly one call. This is a deliberate
//! simplification carried over from the original protocol (see §6/§7 of
//! the design notes on the asymmetric wire format); it keeps the
//! request/response shape identical to what the client channel expects.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use rpc_common::codec::asyncio;
use rpc_common::codec::{self, decode_payload};
use rpc_common::RpcHeader;

use crate::registry::ServiceRegistry;

/// Accepts connections on `listener` forever, dispatching each one through
/// `registry`. Returns only on a listener-level I/O error.
pub async fn serve(listener: TcpListener, registry: Arc<ServiceRegistry>) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &registry).await {
                tracing::warn!(%peer, %err, "connection ended with error");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, registry: &ServiceRegistry) -> Result<(), rpc_common::RpcError> {
    let frame = asyncio::read_frame(&mut stream).await?;
    let header: RpcHeader = decode_payload(&frame)?;

    let Some(handler) = registry.lookup(&header.service_name, &header.method_name) else {
        tracing::warn!(
            service = %header.service_name,
            method = %header.method_name,
            "dropping request for unregistered method"
        );
        return Ok(());
    };

    match handler(&header.params) {
        Ok(response_bytes) => {
            asyncio::write_response_raw(&mut stream, &response_bytes).await?;
        }
        Err(err) => {
            tracing::warn!(
                service = %header.service_name,
                method = %header.method_name,
                %err,
                "handler failed; dropping connection without a reply"
            );
        }
    }

    // Short-lived connection policy: one call per connection, server closes.
    use tokio::io::AsyncWriteExt;
    let _ = stream.shutdown().await;
    Ok(())
}

/// Parses a length-prefixed `RpcHeader` frame the same way
/// [`handle_connection`] does, exposed for callers that want to decode a
/// captured frame (e.g. tests, the proxy's forwarding path).
pub fn parse_header(frame: &[u8]) -> Result<RpcHeader, rpc_common::RpcError> {
    codec::decode_payload(frame)
}
