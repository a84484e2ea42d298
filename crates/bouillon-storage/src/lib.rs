//! Persistence for Bouillon stores: JSON encoding, optional AES-256-CBC
//! sealing, and crash-safe whole-file replacement.

pub mod atomic_file;
pub mod codec;
pub mod options;
pub mod persistent_store;

pub use options::Options;
pub use persistent_store::{Bouillon, BouillonError};
