//! Public data types of the registry: service instances and the domain
//! events watchers consume.

use serde::Deserialize;
use serde::Serialize;

/// One advertised endpoint of a service.
///
/// Identity is `(service_name, host_addr, port)`; the registration key in
/// the store is a deterministic function of it. `payload` is opaque
/// instance metadata carried alongside the identity, encoded and decoded
/// by the configured [`InstanceCodec`](crate::InstanceCodec).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub service_name: String,
    pub host_addr: String,
    pub port: u16,

    /// Opaque serialized instance metadata
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl ServiceInstance {
    pub fn new(
        service_name: impl Into<String>,
        host_addr: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            host_addr: host_addr.into(),
            port,
            payload: Vec::new(),
        }
    }

    pub fn with_payload(
        mut self,
        payload: Vec<u8>,
    ) -> Self {
        self.payload = payload;
        self
    }

    /// Identity rendered as `service/host:port`, used in logs and errors.
    pub fn identity(&self) -> String {
        format!("{}/{}:{}", self.service_name, self.host_addr, self.port)
    }
}

/// Domain event delivered to a watch session's output sink.
///
/// Events are delivered in the order the store observed the underlying
/// mutations. Duplicates are possible: a re-registration before lease
/// expiry surfaces as another `Added` for a still-live identity, so
/// consumers must dedupe by identity rather than treat a repeat as an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// An instance appeared (or re-registered) under the watched service
    Added(ServiceInstance),

    /// An instance was deregistered or its lease expired
    Removed(ServiceInstance),

    /// The session failed; terminal, no further events follow
    Error,
}
