//! Service Registry Error Hierarchy
//!
//! Defines error types for the registry layer, categorized by where the
//! failure lives: the backing coordination store, payload encoding, or
//! the registry's own bookkeeping.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failures reported by the backing coordination store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Instance payload encode/decode failures
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Registry bookkeeping and caller-contract violations
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration loading/validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors surfaced by a [`CoordStore`](crate::CoordStore) implementation.
///
/// The registry core distinguishes two conditions specially:
/// [`StoreError::NotFound`] (legitimate empty state on reads) and
/// [`StoreError::ClusterUnavailable`] (clean end of a watch). Everything
/// else is treated uniformly as a store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Key or prefix absent. Carries the store index at which the
    /// absence was observed, so an empty snapshot still yields a resume
    /// point for the subsequent watch.
    #[error("key not found: {key}")]
    NotFound {
        key: String,
        index: crate::StoreIndex,
    },

    /// The store cluster is unreachable; an active watch ends cleanly
    /// when its stream yields this
    #[error("store cluster unavailable")]
    ClusterUnavailable,

    /// Request exceeded its deadline
    #[error("store request timed out after {0:?}")]
    Timeout(Duration),

    /// Transport failure other than full cluster loss
    #[error("store transport error: {0}")]
    Transport(String),

    /// The store answered with something outside its contract
    #[error("invalid store response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_cluster_unavailable(&self) -> bool {
        matches!(self, StoreError::ClusterUnavailable)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode instance payload: {0}")]
    Encode(String),

    #[error("failed to decode instance payload: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Deregistration of an identity this process never registered
    #[error("service instance not registered: {0}")]
    NotRegistered(String),

    /// Service names become key path segments and must not be empty or
    /// contain '/'
    #[error("invalid service name: {0:?}")]
    InvalidServiceName(String),

    /// Host addresses become part of the key leaf and must not be empty
    /// or contain '/'
    #[error("invalid host address: {0:?}")]
    InvalidHostAddr(String),
}
