//! Pluggable payload codec.
//!
//! The registry treats the bytes stored at a registration key as an
//! encoded [`ServiceInstance`] record; the format is a strategy, not a
//! protocol concern. [`JsonCodec`] is the default (human-readable store
//! values), [`BincodeCodec`] is available where compactness matters.

use crate::CodecError;
use crate::ServiceInstance;

/// Encodes and decodes the instance record written to the store.
pub trait InstanceCodec: Send + Sync + 'static {
    fn encode(
        &self,
        instance: &ServiceInstance,
    ) -> std::result::Result<Vec<u8>, CodecError>;

    fn decode(
        &self,
        bytes: &[u8],
    ) -> std::result::Result<ServiceInstance, CodecError>;
}

/// JSON instance codec, the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl InstanceCodec for JsonCodec {
    fn encode(
        &self,
        instance: &ServiceInstance,
    ) -> std::result::Result<Vec<u8>, CodecError> {
        serde_json::to_vec(instance).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(
        &self,
        bytes: &[u8],
    ) -> std::result::Result<ServiceInstance, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Compact binary instance codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl InstanceCodec for BincodeCodec {
    fn encode(
        &self,
        instance: &ServiceInstance,
    ) -> std::result::Result<Vec<u8>, CodecError> {
        bincode::serialize(instance).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(
        &self,
        bytes: &[u8],
    ) -> std::result::Result<ServiceInstance, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
