use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::path::{self, KeyPath};

/// Errors produced when a dotted `set` cannot find a place for its value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidPathError {
    /// Some segment before the final key does not exist.
    #[error("creation of only one new key per set operation is supported: {path}")]
    MissingParent { path: String },
    /// The parent exists but cannot hold the final key (scalar, or index out of range).
    #[error("value at the parent of {path} cannot hold that key")]
    NotAContainer { path: String },
}

/// In-memory nested key-value mapping addressed by dot paths.
///
/// Mutations are only visible on disk after an explicit write by the owner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store {
    entries: Map<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`; dotted keys walk nested objects and arrays.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let path = KeyPath::parse(key);
        if path.is_top_level() {
            return self.entries.get(key);
        }
        path::resolve(&path, &self.entries)
    }

    /// Typed variant of [`Store::get`]; `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.get(key).map(|value| T::deserialize(value)).transpose()
    }

    /// Assign `value` at `key`, overwriting whatever was there.
    ///
    /// A dotted key only ever creates its final segment: every parent must
    /// already exist, otherwise the store is left untouched and
    /// [`InvalidPathError::MissingParent`] is returned.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), InvalidPathError> {
        let value = value.into();
        let path = KeyPath::parse(key);
        if path.is_top_level() {
            self.entries.insert(key.to_string(), value);
            return Ok(());
        }

        let (_, last) = path.split_last();
        let Some(parent) = path::resolve_parent_for_write(&path, &mut self.entries) else {
            debug!(path = key, "set rejected: parent chain missing");
            return Err(InvalidPathError::MissingParent {
                path: key.to_string(),
            });
        };

        match parent {
            Value::Object(map) => {
                map.insert(last.to_string(), value);
                Ok(())
            }
            other => match path::child_mut(other, last) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(InvalidPathError::NotAContainer {
                    path: key.to_string(),
                }),
            },
        }
    }

    /// Remove the value at `key`, returning it. Sibling order is preserved.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let path = KeyPath::parse(key);
        if path.is_top_level() {
            return self.entries.shift_remove(key);
        }

        let (_, last) = path.split_last();
        match path::resolve_parent_for_write(&path, &mut self.entries)? {
            Value::Object(map) => map.shift_remove(last),
            Value::Array(items) => {
                let idx = path::parse_index(last).filter(|idx| *idx < items.len())?;
                Some(items.remove(idx))
            }
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Swap in a freshly loaded mapping.
    pub fn replace(&mut self, entries: Map<String, Value>) {
        self.entries = entries;
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Map<String, Value>> for Store {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}
