//! Snapshot loader.
//!
//! Turns a recursive prefix read into the list of currently registered
//! instances plus the index from which a watch must resume to observe
//! every later mutation with no gap.

use std::sync::Arc;

use tracing::debug;
use tracing::error;

use crate::CoordStore;
use crate::Error;
use crate::InstanceCodec;
use crate::Result;
use crate::ServiceInstance;
use crate::StoreIndex;

/// Read every instance currently registered under `prefix`.
///
/// Returns the decoded instances in the store's node order together
/// with `resume_index`, the index immediately following the read. A
/// watch opened at `resume_index` observes exactly the mutations that
/// happened after this snapshot.
///
/// An absent prefix is legitimate empty state, not an error. A payload
/// that fails to decode is fatal for the whole snapshot: a corrupt
/// entry means the writer contract was violated, and skipping it would
/// silently hide a live instance.
pub(crate) async fn load_snapshot(
    store: &Arc<dyn CoordStore>,
    codec: &Arc<dyn InstanceCodec>,
    prefix: &str,
) -> Result<(StoreIndex, Vec<ServiceInstance>)> {
    let response = match store.get(prefix, true, true).await {
        Ok(response) => response,
        Err(crate::StoreError::NotFound { index, .. }) => {
            debug!("no entries under {prefix} yet");
            return Ok((index + 1, Vec::new()));
        }
        Err(e) => {
            error!("error reading prefix {prefix}: {e}");
            return Err(e.into());
        }
    };

    let mut instances = Vec::new();
    for leaf in response.node.leaves() {
        let bytes = leaf.value.as_deref().unwrap_or_default();
        let instance = codec.decode(bytes).map_err(|e| {
            error!("error decoding entry {}: {e}", leaf.key);
            Error::Codec(e)
        })?;
        instances.push(instance);
    }

    debug!(
        "snapshot of {prefix}: {} instances at index {}",
        instances.len(),
        response.index
    );
    Ok((response.index + 1, instances))
}
