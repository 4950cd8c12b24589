// rpc-common - Shared wire contract and error types for the RPC framework
//
// This crate carries nothing that depends on the choice of transport runtime
// (synchronous-threaded client vs. Tokio-based server/proxy) so it can sit
// underneath both.

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod wire;

pub use endpoint::Endpoint;
pub use error::{ErrorKind, RpcError, RpcResult};
pub use wire::{RequestHeader, RpcHeader};
