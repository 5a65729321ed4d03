//! Shared wire types and HTTP client for the Dormpay payment backend.
//!
//! The `objects` module defines the JSON shapes exchanged with the backend;
//! the `client` module (behind the `client` cargo feature) provides a typed
//! `reqwest` client over them. Consumers that only need the shared types do
//! not pull in an HTTP stack.

#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod objects;
