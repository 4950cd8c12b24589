// rpc-client - Synchronous-threaded call pipeline: pool, resolver, breaker,
// channel, controller. Mirrors the original framework's thread-per-call
// client design rather than the Tokio runtime used on the server/proxy side.

pub mod breaker;
pub mod channel;
pub mod controller;
pub mod pool;
pub mod resolver;

pub use breaker::{Breaker, BreakerConfig, BreakerRegistry, BreakerState};
pub use channel::{ClientChannel, MethodDescriptor};
pub use controller::{CallController, ServerConnectionHandle};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use resolver::EndpointResolver;
