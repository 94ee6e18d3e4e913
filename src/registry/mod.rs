//! Service registry facade.
//!
//! Provides the four public operations of the registration-lease-and-
//! watch subsystem:
//! - [`Registry::register_service`] - advertise an instance under a TTL
//!   lease with background renewal
//! - [`Registry::deregister_service`] - withdraw an instance and stop
//!   its renewal loop
//! - [`Registry::get_service`] - point-in-time list of live instances
//! - [`Registry::watch_service`] - ordered add/remove event stream with
//!   snapshot-then-watch initialization
//!
//! # Basic Usage
//! ```rust,ignore
//! use berth::{Registry, RegistryConfig, ServiceInstance};
//!
//! let registry = Registry::new(store, RegistryConfig::default());
//!
//! let web = ServiceInstance::new("web", "10.0.0.5", 8080);
//! registry.register_service(&web).await?;
//!
//! let live = registry.get_service("web").await?;
//! println!("live instances: {live:?}");
//! ```

mod lease;
mod snapshot;
mod translate;
mod watcher;


use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use self::lease::LeaseRenewer;
use self::snapshot::load_snapshot;
use self::watcher::WatchSession;
use crate::keys;
use crate::CoordStore;
use crate::InstanceCodec;
use crate::JsonCodec;
use crate::RegistryConfig;
use crate::RegistryError;
use crate::Result;
use crate::ServiceEvent;
use crate::ServiceInstance;

/// Bookkeeping for one live registration owned by this process.
struct Registration {
    /// Stops the renewal loop; observed within one renewal interval
    cancel: CancellationToken,
    /// The renewal task, awaited on teardown so no renewal write can
    /// race a deregistration delete
    renewer: JoinHandle<()>,
}

/// Client-side service registry over a watchable coordination store.
///
/// Each `Registry` owns its own identity-to-registration table, so
/// independent registries (one per process, several in tests) never
/// share mutable state. Cheap to share behind an [`Arc`]; all methods
/// take `&self`.
pub struct Registry {
    store: Arc<dyn CoordStore>,
    codec: Arc<dyn InstanceCodec>,
    config: RegistryConfig,
    registrations: Mutex<HashMap<String, Registration>>,
}

impl Registry {
    /// Create a registry using the default JSON payload codec.
    pub fn new(
        store: Arc<dyn CoordStore>,
        config: RegistryConfig,
    ) -> Self {
        Self::with_codec(store, Arc::new(JsonCodec), config)
    }

    /// Create a registry with an explicit payload codec.
    pub fn with_codec(
        store: Arc<dyn CoordStore>,
        codec: Arc<dyn InstanceCodec>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            store,
            codec,
            config,
            registrations: Mutex::new(HashMap::new()),
        }
    }

    /// Register a service instance under a TTL lease.
    ///
    /// Writes the registration key and starts a background renewal loop
    /// that keeps the lease alive until
    /// [`deregister_service`](Registry::deregister_service) is called or
    /// this process dies (at which point the lease expires and watchers
    /// observe a `Removed` event).
    ///
    /// Re-registering an identity that is already registered replaces
    /// the old registration: its renewal loop is stopped first, and a
    /// failure to delete the stale key does not block the new
    /// registration.
    ///
    /// # Errors
    /// Payload encoding failures and initial store-write failures are
    /// returned synchronously; nothing is registered in that case.
    pub async fn register_service(
        &self,
        instance: &ServiceInstance,
    ) -> Result<()> {
        validate_segment(&instance.service_name)
            .map_err(|_| RegistryError::InvalidServiceName(instance.service_name.clone()))?;
        validate_segment(&instance.host_addr)
            .map_err(|_| RegistryError::InvalidHostAddr(instance.host_addr.clone()))?;

        let key = keys::service_key(
            &self.config.namespace,
            &instance.service_name,
            &instance.host_addr,
            instance.port,
        );

        info!("registering service key: {key}, value: {}", instance.identity());

        // Encode before touching any existing registration, so an encode
        // failure registers nothing and replaces nothing.
        let value = self.codec.encode(instance)?;

        // Replace semantics: deregister a previous registration of the
        // same identity first. Best effort; a stale entry's delete
        // failure must not block re-registration, the old key would
        // expire via TTL anyway.
        let previous = self.registrations.lock().remove(&key);
        if let Some(previous) = previous {
            info!("replacing existing registration for {key}");
            if let Err(e) = self.teardown(previous, &key).await {
                warn!("error deregistering stale entry {key}: {e}");
            }
        }

        self.store
            .set(&key, &value, Some(self.config.service_ttl()))
            .await
            .map_err(|e| {
                error!("error setting key {key}: {e}");
                e
            })?;

        let cancel = CancellationToken::new();
        let renewer = LeaseRenewer::new(
            Arc::clone(&self.store),
            key.clone(),
            value,
            self.config.service_ttl(),
            self.config.renew_interval(),
            cancel.clone(),
        );
        let handle = tokio::spawn(renewer.run());

        // The table is unlocked across the awaits above, so a concurrent
        // registration of the same identity may have slipped in. The
        // newest write wins; the displaced loop must be stopped or it
        // would keep renewing the key after a later deregistration.
        let displaced = self.registrations.lock().insert(
            key.clone(),
            Registration {
                cancel,
                renewer: handle,
            },
        );
        if let Some(displaced) = displaced {
            warn!("concurrent registration for {key}, stopping the displaced renewal loop");
            displaced.cancel.cancel();
            let _ = displaced.renewer.await;
        }

        Ok(())
    }

    /// Withdraw a service instance registered by this process.
    ///
    /// Stops the renewal loop, forgets the registration, and deletes the
    /// key from the store. Local bookkeeping is cleaned up even when the
    /// remote delete fails; the error is still reported and the key is
    /// left to expire via its TTL.
    ///
    /// # Errors
    /// [`RegistryError::NotRegistered`] if this identity was never
    /// registered here.
    pub async fn deregister_service(
        &self,
        instance: &ServiceInstance,
    ) -> Result<()> {
        let key = keys::service_key(
            &self.config.namespace,
            &instance.service_name,
            &instance.host_addr,
            instance.port,
        );

        let Some(registration) = self.registrations.lock().remove(&key) else {
            error!("could not find registration for {key}");
            return Err(RegistryError::NotRegistered(instance.identity()).into());
        };

        self.teardown(registration, &key).await
    }

    /// Point-in-time list of the live instances of a service.
    ///
    /// A service nobody has registered yet yields an empty list, not an
    /// error.
    pub async fn get_service(
        &self,
        name: &str,
    ) -> Result<Vec<ServiceInstance>> {
        validate_segment(name).map_err(|_| RegistryError::InvalidServiceName(name.to_string()))?;

        let prefix = keys::service_prefix(&self.config.namespace, name);
        let (_resume_index, instances) =
            load_snapshot(&self.store, &self.codec, &prefix).await?;
        Ok(instances)
    }

    /// Subscribe to the live add/remove stream of a service.
    ///
    /// Emits one [`ServiceEvent::Added`] per already-registered instance
    /// (snapshot), then incremental events in the order the store
    /// observed them, all on `events`. The session ends when `cancel`
    /// fires, when the sink's receiver is dropped, or when the store
    /// becomes unavailable; a failed session emits one terminal
    /// [`ServiceEvent::Error`] first. Sessions are not restartable:
    /// call again for a fresh snapshot-then-watch.
    ///
    /// The sink is never closed by the registry; the caller owns it.
    ///
    /// # Errors
    /// Only synchronous setup failures (an invalid service name) are
    /// returned here; everything later arrives on `events`.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime; the session runs as
    /// a spawned task.
    pub fn watch_service(
        &self,
        name: &str,
        events: mpsc::Sender<ServiceEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        validate_segment(name).map_err(|_| RegistryError::InvalidServiceName(name.to_string()))?;

        let session = WatchSession::new(
            Arc::clone(&self.store),
            Arc::clone(&self.codec),
            self.config.namespace.clone(),
            keys::service_prefix(&self.config.namespace, name),
            events,
            cancel,
        );
        tokio::spawn(async move {
            session.run().await;
        });

        Ok(())
    }

    /// Registration table introspection for unit tests.
    #[cfg(test)]
    pub(crate) fn registered_keys(&self) -> Vec<String> {
        self.registrations.lock().keys().cloned().collect()
    }

    async fn teardown(
        &self,
        registration: Registration,
        key: &str,
    ) -> Result<()> {
        registration.cancel.cancel();
        // The loop observes cancellation at its next suspension point;
        // awaiting it guarantees no renewal write lands after the delete.
        let _ = registration.renewer.await;

        self.store.delete(key).await.map_err(|e| {
            error!("error deleting key {key}: {e}");
            e
        })?;

        Ok(())
    }
}

fn validate_segment(segment: &str) -> std::result::Result<(), ()> {
    if segment.is_empty() || segment.contains('/') {
        return Err(());
    }
    Ok(())
}
