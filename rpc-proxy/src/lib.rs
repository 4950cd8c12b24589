// rpc-proxy - Inbound TCP gateway: frames client connections identically to
// the core wire format, routes by message id, and tracks live connections
// so a pub/sub-style push can reach the right socket.

pub mod connection_manager;
pub mod frontend;
pub mod handler;
pub mod publisher;

pub use connection_manager::{ConnectionManager, ProxyError};
pub use frontend::serve;
pub use handler::{HandlerRegistry, MessageHandler};
pub use publisher::{LoopbackPublisher, Publisher};
