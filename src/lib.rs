//! berth: a lease-backed service registry over a watchable
//! coordination store.
//!
//! Distributed processes use it to advertise "I am instance X of
//! service S, reachable at host:port" with automatic liveness (the
//! registration expires if the process dies), to enumerate the live
//! instances of a service, and to subscribe to an ordered stream of
//! instance-joined / instance-left events without polling.
//!
//! The store itself is an external collaborator behind the
//! [`CoordStore`] trait; berth is purely the client-side layer:
//! TTL-backed registration with background renewal, snapshot-then-watch
//! initialization, and translation of raw store mutations into
//! [`ServiceEvent`]s.

mod codec;
mod config;
mod errors;
mod instance;
mod keys;
mod registry;
mod store;

pub use codec::*;
pub use config::*;
pub use errors::*;
pub use instance::*;
pub use registry::*;
pub use store::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod codec_test;
