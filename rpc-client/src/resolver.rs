//! # Endpoint Resolver
//!
//! Purpose: turn a `(service, method)` pair into a reachable [`Endpoint`],
//! consulting the coordination service on a cache miss and caching the
//! result for a fixed TTL.
//!
//! The cache is intentionally coarse: one mutex, no per-key locking, no
//! explicit invalidation. Two callers racing on the same cold key both hit
//! the coordination client and the last writer's entry wins; both still get
//! a valid endpoint, so the race is harmless.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rpc_common::{Endpoint, RpcError};
use rpc_coord::CoordinationClient;

const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct CachedEndpoint {
    endpoint: Endpoint,
    expires_at: Instant,
}

/// Resolves `service/method` names to endpoints via a coordination client,
/// caching results for [`CACHE_TTL`].
pub struct EndpointResolver<C: CoordinationClient> {
    coord: C,
    cache: Mutex<HashMap<String, CachedEndpoint>>,
}

impl<C: CoordinationClient> EndpointResolver<C> {
    pub fn new(coord: C) -> Self {
        EndpointResolver {
            coord,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, service: &str, method: &str) -> Result<Endpoint, RpcError> {
        let key = format!("{service}:{method}");

        {
            let cache = self.cache.lock().expect("resolver cache poisoned");
            if let Some(entry) = cache.get(&key) {
                if entry.expires_at > Instant::now() {
                    return Ok(entry.endpoint.clone());
                }
            }
        }

        let path = format!("/{service}/{method}");
        let raw = self
            .coord
            .get_data(&path)
            .map_err(|e| RpcError::service_unavailable(format!("{service} unresolvable: {e}")))?;
        let value = String::from_utf8(raw)
            .map_err(|_| RpcError::service_unavailable(format!("{service} node data is not UTF-8")))?;
        if value.is_empty() || !value.contains(':') {
            return Err(RpcError::service_unavailable(format!(
                "{service} node data malformed: {value:?}"
            )));
        }
        let endpoint = Endpoint::parse(&value)?;

        let mut cache = self.cache.lock().expect("resolver cache poisoned");
        cache.insert(
            key,
            CachedEndpoint {
                endpoint: endpoint.clone(),
                expires_at: Instant::now() + CACHE_TTL,
            },
        );
        Ok(endpoint)
    }
}
