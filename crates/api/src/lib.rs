//! Client for the PeerShare device API.
//!
//! The pages never talk HTTP directly. They hold a [`DeviceApi`], which the
//! binary backs with [`HttpDeviceApi`] and tests back with in-memory mocks.

pub mod client;
pub mod error;

pub use client::{ApiFuture, DeviceApi, HttpDeviceApi};
pub use error::ApiError;
