//! Device identity for a PeerShare client.
//!
//! On startup the client reads its previously stored device id, registers
//! with the server under a default display name, persists whatever id the
//! server hands back, and publishes the result exactly once to every
//! subscriber. All failures degrade to "no identity" instead of erroring.

pub mod agent;
pub mod identity;
pub mod store;

pub use agent::{ClientInfo, default_name};
pub use identity::{DeviceIdentity, ReadyCallback};
pub use store::{FileIdStore, IdStore, MemoryIdStore, StoreError, UnsupportedIdStore};
