//! Watch loop.
//!
//! One task per watch session drives the whole pipeline: snapshot the
//! prefix, emit one `Added` per existing instance, then consume the
//! store's mutation stream from the snapshot's resume index and forward
//! translated events to the output sink in arrival order. Running the
//! pipeline on a single task is what makes the ordering guarantee
//! structural: events cannot overtake each other.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::snapshot::load_snapshot;
use super::translate::translate;
use crate::CoordStore;
use crate::InstanceCodec;
use crate::ServiceEvent;

/// Lifecycle of a watch session.
///
/// `Stopped` and `Failed` are terminal. `Failed` is reached on snapshot
/// or stream errors and is preceded by exactly one [`ServiceEvent::Error`]
/// on the sink; `Stopped` (cancellation, dropped sink, or the store
/// reporting cluster-unavailable) emits nothing, since it indicates
/// shutdown rather than a session failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Initializing,
    Streaming,
    Stopping,
    Stopped,
    Failed,
}

pub(crate) struct WatchSession {
    store: Arc<dyn CoordStore>,
    codec: Arc<dyn InstanceCodec>,
    namespace: String,
    prefix: String,
    events: mpsc::Sender<ServiceEvent>,
    cancel: CancellationToken,
}

impl WatchSession {
    pub(crate) fn new(
        store: Arc<dyn CoordStore>,
        codec: Arc<dyn InstanceCodec>,
        namespace: String,
        prefix: String,
        events: mpsc::Sender<ServiceEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            codec,
            namespace,
            prefix,
            events,
            cancel,
        }
    }

    /// Run the session to completion, returning its terminal state.
    ///
    /// The output sink is never closed here; the caller owns its
    /// lifecycle.
    pub(crate) async fn run(self) -> SessionState {
        self.enter(SessionState::Initializing);

        let snapshot = tokio::select! {
            () = self.cancel.cancelled() => {
                return self.stop();
            }
            snapshot = load_snapshot(&self.store, &self.codec, &self.prefix) => snapshot,
        };

        let (resume_index, existing) = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("unable to watch service prefix {}: {e}", self.prefix);
                let _ = self.events.send(ServiceEvent::Error).await;
                self.enter(SessionState::Failed);
                return SessionState::Failed;
            }
        };

        for instance in existing {
            info!("sending service add event: {}", instance.identity());
            tokio::select! {
                () = self.cancel.cancelled() => {
                    return self.stop();
                }
                sent = self.events.send(ServiceEvent::Added(instance)) => {
                    if sent.is_err() {
                        return self.sink_dropped();
                    }
                }
            }
        }

        let mut stream = match self
            .store
            .watch(&self.prefix, true, resume_index, self.cancel.clone())
            .await
        {
            Ok(stream) => stream,
            Err(e) if e.is_cluster_unavailable() => {
                info!("stopping watch on key {}", self.prefix);
                self.enter(SessionState::Stopped);
                return SessionState::Stopped;
            }
            Err(e) => {
                error!("error opening watch on {}: {e}", self.prefix);
                let _ = self.events.send(ServiceEvent::Error).await;
                self.enter(SessionState::Failed);
                return SessionState::Failed;
            }
        };

        self.enter(SessionState::Streaming);
        info!("watching for service: {} at index {resume_index}", self.prefix);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    return self.stop();
                }

                item = stream.next() => match item {
                    Some(Ok(raw)) => {
                        let Some(event) = translate(&self.namespace, self.codec.as_ref(), &raw)
                        else {
                            continue;
                        };
                        tokio::select! {
                            () = self.cancel.cancelled() => {
                                return self.stop();
                            }
                            sent = self.events.send(event) => {
                                if sent.is_err() {
                                    return self.sink_dropped();
                                }
                            }
                        }
                    }

                    // Expected shutdown path: the backing store went away.
                    Some(Err(e)) if e.is_cluster_unavailable() => {
                        info!("stopping watch on key {}", self.prefix);
                        self.enter(SessionState::Stopped);
                        return SessionState::Stopped;
                    }

                    Some(Err(e)) => {
                        error!("error {e} during watch on {}, watch ends", self.prefix);
                        let _ = self.events.send(ServiceEvent::Error).await;
                        self.enter(SessionState::Failed);
                        return SessionState::Failed;
                    }

                    None => {
                        info!("watch stream on {} ended", self.prefix);
                        self.enter(SessionState::Stopped);
                        return SessionState::Stopped;
                    }
                }
            }
        }
    }

    fn stop(&self) -> SessionState {
        self.enter(SessionState::Stopping);
        info!("stopping watch on {}", self.prefix);
        self.cancel.cancel();
        self.enter(SessionState::Stopped);
        SessionState::Stopped
    }

    fn sink_dropped(&self) -> SessionState {
        debug!("event sink for {} dropped, stopping watch", self.prefix);
        self.cancel.cancel();
        self.enter(SessionState::Stopped);
        SessionState::Stopped
    }

    fn enter(
        &self,
        state: SessionState,
    ) {
        debug!("watch session {} -> {state:?}", self.prefix);
    }
}
