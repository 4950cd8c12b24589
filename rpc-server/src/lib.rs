// rpc-server - Tokio-based receive/dispatch mirror of the client's framed
// codec, plus coordination-service publication at startup.

pub mod dispatcher;
pub mod publish;
pub mod registry;

pub use dispatcher::serve;
pub use publish::{publish_services, PublishError};
pub use registry::{typed_handler, MethodHandler, ServiceRegistry};
