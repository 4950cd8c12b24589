//! # Endpoint
//!
//! A resolved `(host, port)` pair. Immutable after construction so it can be
//! freely cloned into cache entries and hashed for pool sharding.

use std::fmt;
use std::hash::Hash;

use crate::error::RpcError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Endpoint {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Parses `"host:port"`, the format the coordination service stores
    /// method nodes in.
    pub fn parse(value: &str) -> Result<Self, RpcError> {
        let idx = value
            .rfind(':')
            .ok_or_else(|| RpcError::service_unavailable(format!("invalid node data: {value}")))?;
        let (host, port_str) = value.split_at(idx);
        let port_str = &port_str[1..];
        if host.is_empty() {
            return Err(RpcError::service_unavailable(format!(
                "invalid node data: {value}"
            )));
        }
        let port: u16 = port_str
            .parse()
            .map_err(|_| RpcError::service_unavailable(format!("invalid node data: {value}")))?;
        Ok(Endpoint::new(host, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
