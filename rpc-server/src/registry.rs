//! # Service Registry
//!
//! Purpose: replace the generated abstract service base classes the
//! original framework relies on with a plain lookup table: `service name ->
//! (method name -> handler)`. Registering a method is calling a function;
//! dispatching a call is a lookup and an invoke, no vtable required.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use rpc_common::codec;
use rpc_common::RpcError;

/// A type-erased method handler: raw request bytes in, raw response bytes
/// (or a failure) out. [`typed_handler`] builds one from an ordinary
/// `Fn(Req) -> Resp` closure.
pub type MethodHandler = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>, RpcError> + Send + Sync>;

/// Wraps a typed closure into a [`MethodHandler`] that decodes the request,
/// calls `f`, and encodes the response.
pub fn typed_handler<Req, Resp, F>(f: F) -> MethodHandler
where
    Req: DeserializeOwned,
    Resp: Serialize,
    F: Fn(Req) -> Resp + Send + Sync + 'static,
{
    Arc::new(move |params: &[u8]| -> Result<Vec<u8>, RpcError> {
        let request: Req = codec::decode_payload(params)?;
        let response = f(request);
        codec::encode_payload(&response)
    })
}

/// `service-name -> (method-name -> handler)`, built once at startup and
/// shared read-only across every connection.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<String, HashMap<String, MethodHandler>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_method(&mut self, service: &str, method: &str, handler: MethodHandler) {
        self.services
            .entry(service.to_string())
            .or_default()
            .insert(method.to_string(), handler);
    }

    pub fn has_service(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn methods_of(&self, service: &str) -> impl Iterator<Item = &str> {
        self.services
            .get(service)
            .into_iter()
            .flat_map(|methods| methods.keys().map(String::as_str))
    }

    pub fn lookup(&self, service: &str, method: &str) -> Option<MethodHandler> {
        self.services.get(service)?.get(method).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Req {
        n: i32,
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Resp {
        doubled: i32,
    }

    #[test]
    fn registers_and_dispatches_typed_handler() {
        let mut registry = ServiceRegistry::new();
        registry.register_method(
            "MathService",
            "Double",
            typed_handler(|req: Req| Resp { doubled: req.n * 2 }),
        );

        let handler = registry.lookup("MathService", "Double").unwrap();
        let params = codec::encode_payload(&Req { n: 21 }).unwrap();
        let raw = handler(&params).unwrap();
        let resp: Resp = codec::decode_payload(&raw).unwrap();
        assert_eq!(resp, Resp { doubled: 42 });
    }

    #[test]
    fn unregistered_method_is_none() {
        let registry = ServiceRegistry::new();
        assert!(registry.lookup("MathService", "Double").is_none());
    }

    #[test]
    fn tracks_service_and_method_names() {
        let mut registry = ServiceRegistry::new();
        registry.register_method("UserService", "Login", typed_handler(|req: Req| Resp { doubled: req.n }));
        registry.register_method("UserService", "Register", typed_handler(|req: Req| Resp { doubled: req.n }));
        assert!(registry.has_service("UserService"));
        let mut methods: Vec<&str> = registry.methods_of("UserService").collect();
        methods.sort();
        assert_eq!(methods, vec!["Login", "Register"]);
    }
}
