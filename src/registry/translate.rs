//! Event translator.
//!
//! Converts raw store mutations into the registry's Added/Removed
//! vocabulary. Anything that cannot be translated is skipped with a
//! diagnostic; a malformed event must never take down the watch loop.

use tracing::debug;
use tracing::warn;

use crate::keys;
use crate::EventAction;
use crate::InstanceCodec;
use crate::RawEvent;
use crate::ServiceEvent;
use crate::ServiceInstance;

/// Translate one raw mutation into a domain event.
///
/// Returns `None` for keys that do not parse as registration keys, for
/// set events whose payload fails to decode, and for actions the
/// registry does not care about.
///
/// A `Set` on an already-live key (re-registration before expiry) is
/// surfaced again as `Added`, not suppressed: from the watcher's point
/// of view it means "still alive".
pub(crate) fn translate(
    namespace: &str,
    codec: &dyn InstanceCodec,
    raw: &RawEvent,
) -> Option<ServiceEvent> {
    let Some(parsed) = keys::parse_service_key(namespace, &raw.key) else {
        warn!("received event for key {:?}, could not parse service key", raw.key);
        return None;
    };

    let identity = ServiceInstance::new(parsed.service_name, parsed.host_addr, parsed.port);

    match &raw.action {
        EventAction::Set => {
            // The key is authoritative for identity; the value only
            // contributes the opaque payload.
            let instance = match raw.value.as_deref() {
                Some(bytes) => match codec.decode(bytes) {
                    Ok(record) => identity.with_payload(record.payload),
                    Err(e) => {
                        warn!("skipping event for key {:?}, undecodable payload: {e}", raw.key);
                        return None;
                    }
                },
                None => identity,
            };
            Some(ServiceEvent::Added(instance))
        }

        EventAction::Delete | EventAction::Expire => Some(ServiceEvent::Removed(identity)),

        EventAction::Other(action) => {
            debug!("ignoring {action:?} event for key {:?}", raw.key);
            None
        }
    }
}
