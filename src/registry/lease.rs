//! Lease renewal loop.
//!
//! Every active registration owns one background renewal task that
//! re-writes its key with a fresh TTL at `ttl / 3` cadence until its
//! cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::CoordStore;

pub(crate) struct LeaseRenewer {
    store: Arc<dyn CoordStore>,
    key: String,
    value: Vec<u8>,
    ttl: Duration,
    renew_interval: Duration,
    cancel: CancellationToken,
}

impl LeaseRenewer {
    pub(crate) fn new(
        store: Arc<dyn CoordStore>,
        key: String,
        value: Vec<u8>,
        ttl: Duration,
        renew_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            key,
            value,
            ttl,
            renew_interval,
            cancel,
        }
    }

    /// Drive the renewal loop until the cancellation token fires.
    ///
    /// A failed renewal is retried once immediately: the key may already
    /// have expired, and a plain set recreates it within the remaining
    /// TTL window. If the retry also fails the cycle is skipped with a
    /// diagnostic and the next tick tries again. Store failures never
    /// escalate past this task.
    pub(crate) async fn run(self) {
        // First renewal is due one full interval out, not immediately.
        let mut interval =
            tokio::time::interval_at(Instant::now() + self.renew_interval, self.renew_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("stop refreshing key: {}", self.key);
                    return;
                }

                _ = interval.tick() => {
                    debug!("refreshing key: {}", self.key);
                    self.renew_once().await;
                }
            }
        }
    }

    async fn renew_once(&self) {
        if let Err(e) = self
            .store
            .set(&self.key, &self.value, Some(self.ttl))
            .await
        {
            warn!("error renewing key {}: {e}, retrying once", self.key);

            if let Err(e) = self
                .store
                .set(&self.key, &self.value, Some(self.ttl))
                .await
            {
                error!(
                    "error renewing key {} after retry: {e}, deferring to next cycle",
                    self.key
                );
            }
        }
    }
}
