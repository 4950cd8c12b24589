//! # Startup Publication
//!
//! Purpose: register this provider's services in the coordination
//! directory so resolvers can find them, per the `/service_name` durable /
//! `/service_name/method_name` ephemeral layout documented for the wire
//! interfaces.
//!
//! A configured `allow_list` service that the registry does not actually
//! implement is a startup-time configuration error, not a runtime one: the
//! process is meant to fail fast rather than silently publish nothing for
//! an operator-expected service.

use rpc_coord::CoordinationClient;

use crate::registry::ServiceRegistry;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("configured service {0:?} is not implemented by this provider")]
    UnimplementedService(String),
    #[error("coordination client error: {0}")]
    Coord(#[from] rpc_coord::CoordError),
}

/// Publishes every service named in `allow_list` (and its methods) to
/// `coord`, binding them to `host:port`.
pub fn publish_services(
    registry: &ServiceRegistry,
    coord: &impl CoordinationClient,
    allow_list: &[String],
    host: &str,
    port: u16,
) -> Result<(), PublishError> {
    coord.connect()?;
    let endpoint = format!("{host}:{port}");

    for service in allow_list {
        if !registry.has_service(service) {
            return Err(PublishError::UnimplementedService(service.clone()));
        }
        coord.create(&format!("/{service}"), &[], false)?;
        for method in registry.methods_of(service) {
            let path = format!("/{service}/{method}");
            coord.create(&path, endpoint.as_bytes(), true)?;
            tracing::info!(%path, %endpoint, "published method");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::typed_handler;
    use rpc_coord::LocalCoordinationClient;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Req;
    #[derive(Serialize, Deserialize)]
    struct Resp;

    fn registry_with(service: &str, method: &str) -> ServiceRegistry {
        let mut registry = ServiceRegistry::new();
        registry.register_method(service, method, typed_handler(|_: Req| Resp));
        registry
    }

    #[test]
    fn publishes_configured_service_methods() {
        let registry = registry_with("UserService", "Login");
        let coord = LocalCoordinationClient::new();
        publish_services(&registry, &coord, &["UserService".to_string()], "127.0.0.1", 9000).unwrap();
        assert_eq!(coord.get_data("/UserService/Login").unwrap(), b"127.0.0.1:9000");
    }

    #[test]
    fn unimplemented_configured_service_is_fatal() {
        let registry = registry_with("UserService", "Login");
        let coord = LocalCoordinationClient::new();
        let err = publish_services(&registry, &coord, &["OrderService".to_string()], "127.0.0.1", 9000).unwrap_err();
        assert!(matches!(err, PublishError::UnimplementedService(_)));
    }
}
