//! # Client Channel
//!
//! Purpose: the call pipeline wiring the breaker, resolver, pool, and
//! framed codec together into a single `call_method` entry point.
//!
//! Every failure path here is trapped and reported through the
//! [`CallController`] rather than propagated as a `Result` error to the
//! caller — see the module-level error handling policy in
//! `rpc-common::error` and DESIGN.md.

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use rpc_common::codec;
use rpc_common::{ErrorKind, RpcError, RpcHeader};
use rpc_coord::CoordinationClient;

use crate::breaker::BreakerRegistry;
use crate::controller::CallController;
use crate::pool::{ConnectionPool, PoolConfig};
use crate::resolver::EndpointResolver;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(2000);

/// Identifies the service/method pair a call targets.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub service_name: String,
    pub method_name: String,
}

impl MethodDescriptor {
    pub fn new(service_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        MethodDescriptor {
            service_name: service_name.into(),
            method_name: method_name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.service_name, self.method_name)
    }
}

/// The client-side call pipeline: breaker gate, endpoint resolution, pooled
/// connection, framed write/read, breaker update.
pub struct ClientChannel<C: CoordinationClient> {
    pool: ConnectionPool,
    resolver: EndpointResolver<C>,
    breakers: BreakerRegistry,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl<C: CoordinationClient> ClientChannel<C> {
    pub fn new(coord: C) -> Self {
        ClientChannel {
            pool: ConnectionPool::new(PoolConfig::default()),
            resolver: EndpointResolver::new(coord),
            breakers: BreakerRegistry::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_pool_config(coord: C, pool_config: PoolConfig) -> Self {
        ClientChannel {
            pool: ConnectionPool::new(pool_config),
            resolver: EndpointResolver::new(coord),
            breakers: BreakerRegistry::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Invokes `method` with `request`, writing the result into `response`
    /// and reporting failure through `controller`. `completion` runs exactly
    /// once, regardless of outcome or cancellation state.
    pub fn call_method<Req, Resp>(
        &self,
        method: &MethodDescriptor,
        controller: &CallController,
        request: &Req,
        response: &mut Resp,
        completion: Option<Box<dyn FnOnce() + Send>>,
    ) where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let result = self.try_call(method, request, response);
        if let Err(err) = result {
            controller.set_failed(err.display_text());
        }
        if let Some(completion) = completion {
            completion();
        }
    }

    fn try_call<Req, Resp>(&self, method: &MethodDescriptor, request: &Req, response: &mut Resp) -> Result<(), RpcError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let breaker = self.breakers.get(&method.service_name);

        if !breaker.allow_request() {
            return Err(RpcError::service_unavailable(method.service_name.clone()));
        }

        let run = || -> Result<Resp, RpcError> {
            let params = codec::encode_payload(request)?;
            let header = RpcHeader::new(method.service_name.clone(), method.method_name.clone(), params);
            let payload = codec::encode_payload(&header)?;

            let endpoint = self
                .resolver
                .resolve(&method.service_name, &method.method_name)
                .map_err(|e| RpcError::new(ErrorKind::ServiceUnavailable, e.message))?;

            let mut conn = self.pool.get(&endpoint, self.connect_timeout)?;

            if let Err(e) = codec::write_frame(&mut conn, &payload) {
                conn.discard();
                return Err(e);
            }

            let raw = match codec::read_response_raw(&mut conn) {
                Ok(raw) => raw,
                Err(e) => {
                    conn.discard();
                    return Err(e);
                }
            };

            codec::decode_payload(&raw)
        };

        match run() {
            Ok(parsed) => {
                *response = parsed;
                breaker.record_success();
                Ok(())
            }
            Err(err) => {
                breaker.record_failure(err.kind);
                Err(err)
            }
        }
    }
}
