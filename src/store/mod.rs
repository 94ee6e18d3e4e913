//! Coordination-store client surface consumed by the registry.
//!
//! The registry is a client-side layer: it never implements the store
//! itself. Everything it needs from the store (hierarchical keys with
//! TTL, a monotonic modification index, and resumable prefix watches)
//! is expressed through the [`CoordStore`] trait, so any etcd-shaped
//! backend can be plugged in and unit tests can run against mocks and
//! in-memory doubles.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::StoreError;

/// Monotonically increasing watermark identifying a point in the store's
/// mutation history. Opaque to the registry; only used to resume a watch
/// right after a snapshot.
pub type StoreIndex = u64;

/// Live stream of raw mutation events under a watched key.
pub type WatchStream = BoxStream<'static, std::result::Result<RawEvent, StoreError>>;

/// Mutation kind reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    /// Key created or overwritten (including lease renewals)
    Set,
    /// Key explicitly deleted
    Delete,
    /// Key removed by TTL expiry
    Expire,
    /// Any other store-specific action; ignored by the registry
    Other(String),
}

/// One raw mutation observed by a watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub action: EventAction,
    pub key: String,
    /// Value after the mutation; absent for deletes and expiries
    pub value: Option<Vec<u8>>,
    /// Store index at which the mutation was committed
    pub index: StoreIndex,
}

/// Node tree returned by a recursive read. Mirrors the hierarchical
/// shape of the store: directories carry children, leaves carry values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTree {
    pub key: String,
    /// Present on leaves only
    pub value: Option<Vec<u8>>,
    pub dir: bool,
    pub nodes: Vec<NodeTree>,
}

impl NodeTree {
    pub fn leaf(
        key: impl Into<String>,
        value: Vec<u8>,
    ) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
            dir: false,
            nodes: Vec::new(),
        }
    }

    pub fn dir(
        key: impl Into<String>,
        nodes: Vec<NodeTree>,
    ) -> Self {
        Self {
            key: key.into(),
            value: None,
            dir: true,
            nodes,
        }
    }

    /// Walk the tree depth-first and collect every leaf, preserving the
    /// store's node order.
    pub fn leaves(&self) -> Vec<&NodeTree> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(
        &'a self,
        out: &mut Vec<&'a NodeTree>,
    ) {
        if self.dir {
            for node in &self.nodes {
                node.collect_leaves(out);
            }
        } else {
            out.push(self);
        }
    }
}

/// Result of a read: the store-wide index at read time plus the node
/// tree under the requested key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResponse {
    pub index: StoreIndex,
    pub node: NodeTree,
}

/// Client surface of a hierarchical, watchable, TTL-capable
/// coordination store.
///
/// Contract notes for implementors:
/// - `get` must return [`StoreError::NotFound`] for absent keys; callers
///   distinguish it from real failures.
/// - `watch` must yield every mutation whose index is `>= from_index`,
///   in commit order, and must unblock promptly once `cancel` fires.
///   Transport teardown is reported as a final
///   [`StoreError::ClusterUnavailable`] item (or by ending the stream).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoordStore: Send + Sync + 'static {
    /// Read `key`; with `recursive` the whole subtree is returned, with
    /// `sorted` children follow the store's node order.
    async fn get(
        &self,
        key: &str,
        recursive: bool,
        sorted: bool,
    ) -> std::result::Result<GetResponse, StoreError>;

    /// Write `value` at `key`, with a lease when `ttl` is given.
    async fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> std::result::Result<(), StoreError>;

    /// Remove `key`.
    async fn delete(
        &self,
        key: &str,
    ) -> std::result::Result<(), StoreError>;

    /// Open a mutation stream under `key` starting at `from_index`.
    async fn watch(
        &self,
        key: &str,
        recursive: bool,
        from_index: StoreIndex,
        cancel: CancellationToken,
    ) -> std::result::Result<WatchStream, StoreError>;
}
