use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::CoordStore;
use crate::EventAction;
use crate::GetResponse;
use crate::NodeTree;
use crate::RawEvent;
use crate::StoreError;
use crate::StoreIndex;
use crate::WatchStream;

struct Entry {
    value: Vec<u8>,
    /// Bumped on every set; a pending expiry only fires if its
    /// generation still matches, so a renewal defuses the old timer
    generation: u64,
}

struct Watcher {
    key: String,
    recursive: bool,
    tx: mpsc::UnboundedSender<std::result::Result<RawEvent, StoreError>>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    history: Vec<RawEvent>,
    index: StoreIndex,
    next_generation: u64,
    watchers: Vec<Watcher>,
    down: bool,
}

impl Inner {
    /// Commit one mutation: bump the index, append to history, fan out
    /// to matching live watchers.
    fn record(
        &mut self,
        action: EventAction,
        key: &str,
        value: Option<Vec<u8>>,
    ) {
        self.index += 1;
        let event = RawEvent {
            action,
            key: key.to_string(),
            value,
            index: self.index,
        };
        self.history.push(event.clone());
        self.watchers.retain(|watcher| {
            if !key_matches(&watcher.key, watcher.recursive, &event.key) {
                return true;
            }
            watcher.tx.send(Ok(event.clone())).is_ok()
        });
    }
}

fn key_matches(
    watch_key: &str,
    recursive: bool,
    event_key: &str,
) -> bool {
    if recursive {
        event_key.starts_with(watch_key)
    } else {
        event_key == watch_key
    }
}

/// In-memory coordination store with etcd-v2-shaped semantics: flat
/// entries addressed by hierarchical keys, a monotonic mutation index,
/// TTL expiry on tokio's clock, and index-resumable prefix watches.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_index(&self) -> StoreIndex {
        self.inner.lock().index
    }

    pub fn value_of(
        &self,
        key: &str,
    ) -> Option<Vec<u8>> {
        self.inner.lock().entries.get(key).map(|e| e.value.clone())
    }

    /// Number of `Set` mutations recorded for `key`; lets tests count
    /// renewal writes.
    pub fn set_events_for(
        &self,
        key: &str,
    ) -> usize {
        self.inner
            .lock()
            .history
            .iter()
            .filter(|e| e.action == EventAction::Set && e.key == key)
            .count()
    }

    /// Simulate the cluster becoming unreachable: every live watch
    /// stream receives a terminal `ClusterUnavailable` and all later
    /// calls fail with the same.
    pub fn make_unavailable(&self) {
        let mut inner = self.inner.lock();
        inner.down = true;
        for watcher in inner.watchers.drain(..) {
            let _ = watcher.tx.send(Err(StoreError::ClusterUnavailable));
        }
    }
}

#[async_trait]
impl CoordStore for MemoryStore {
    async fn get(
        &self,
        key: &str,
        _recursive: bool,
        sorted: bool,
    ) -> std::result::Result<GetResponse, StoreError> {
        let inner = self.inner.lock();
        if inner.down {
            return Err(StoreError::ClusterUnavailable);
        }

        if let Some(entry) = inner.entries.get(key) {
            return Ok(GetResponse {
                index: inner.index,
                node: NodeTree::leaf(key, entry.value.clone()),
            });
        }

        let prefix = if key.ends_with('/') {
            key.to_string()
        } else {
            format!("{key}/")
        };
        let mut children: Vec<(&String, &Entry)> = inner
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix.as_str()))
            .collect();
        if children.is_empty() {
            return Err(StoreError::NotFound {
                key: key.to_string(),
                index: inner.index,
            });
        }
        if sorted {
            children.sort_by(|a, b| a.0.cmp(b.0));
        }

        let nodes = children
            .into_iter()
            .map(|(k, e)| NodeTree::leaf(k.clone(), e.value.clone()))
            .collect();
        Ok(GetResponse {
            index: inner.index,
            node: NodeTree::dir(key, nodes),
        })
    }

    async fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> std::result::Result<(), StoreError> {
        let generation;
        {
            let mut inner = self.inner.lock();
            if inner.down {
                return Err(StoreError::ClusterUnavailable);
            }
            inner.next_generation += 1;
            generation = inner.next_generation;
            inner.entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_vec(),
                    generation,
                },
            );
            inner.record(EventAction::Set, key, Some(value.to_vec()));
        }

        if let Some(ttl) = ttl {
            let store = Arc::clone(&self.inner);
            let key = key.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                let mut inner = store.lock();
                let still_same_lease = matches!(
                    inner.entries.get(&key),
                    Some(entry) if entry.generation == generation
                );
                if still_same_lease {
                    inner.entries.remove(&key);
                    inner.record(EventAction::Expire, &key, None);
                }
            });
        }

        Ok(())
    }

    async fn delete(
        &self,
        key: &str,
    ) -> std::result::Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.down {
            return Err(StoreError::ClusterUnavailable);
        }
        if inner.entries.remove(key).is_none() {
            return Err(StoreError::NotFound {
                key: key.to_string(),
                index: inner.index,
            });
        }
        inner.record(EventAction::Delete, key, None);
        Ok(())
    }

    async fn watch(
        &self,
        key: &str,
        recursive: bool,
        from_index: StoreIndex,
        cancel: CancellationToken,
    ) -> std::result::Result<WatchStream, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut inner = self.inner.lock();
            if inner.down {
                return Err(StoreError::ClusterUnavailable);
            }
            // Replay history from the resume point so a snapshot/watch
            // handoff never loses a mutation committed in between.
            for event in inner
                .history
                .iter()
                .filter(|e| e.index >= from_index && key_matches(key, recursive, &e.key))
            {
                let _ = tx.send(Ok(event.clone()));
            }
            inner.watchers.push(Watcher {
                key: key.to_string(),
                recursive,
                tx,
            });
        }

        Ok(UnboundedReceiverStream::new(rx)
            .take_until(cancel.cancelled_owned())
            .boxed())
    }
}
