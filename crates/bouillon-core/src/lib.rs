//! Core abstractions for Bouillon: the in-memory nested store and the
//! dot-path resolution it is addressed through.
//! Persistence and encryption live in `bouillon-storage`; this crate has no I/O.

pub mod path;
pub mod store;

pub use path::KeyPath;
pub use store::{InvalidPathError, Store};

/// Values held in the store. Objects keep insertion order.
pub use serde_json::{Map, Value};
