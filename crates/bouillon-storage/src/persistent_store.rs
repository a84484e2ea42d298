use std::{
    io,
    path::{Path, PathBuf},
};

use bouillon_core::{InvalidPathError, Store, Value};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    atomic_file::{self, PersistError},
    codec::{CodecError, StoreCodec},
    options::Options,
};

/// Errors surfaced by [`Bouillon`]. Nothing is retried or swallowed internally.
#[derive(Debug, Error)]
pub enum BouillonError {
    #[error(transparent)]
    InvalidPath(#[from] InvalidPathError),
    /// Bad options, e.g. an encryption key of the wrong size.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<CodecError> for BouillonError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidKeyLength { .. } => Self::Configuration(err.to_string()),
            CodecError::Decryption { reason } => Self::Decryption(reason),
            CodecError::Serialization(inner) => Self::Serialization(inner),
        }
    }
}

impl From<PersistError> for BouillonError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::NotFound { path } => Self::NotFound { path },
            PersistError::Io { path, source } => Self::Io { path, source },
            PersistError::Task { reason } => Self::Task(reason),
        }
    }
}

/// Persistent key-value store: a nested in-memory [`Store`] flushed to
/// `<directory>/<name>.txt` on demand.
///
/// Changes live only in memory until [`Bouillon::write`] or
/// [`Bouillon::write_sync`] is called.
#[derive(Debug)]
pub struct Bouillon {
    options: Options,
    path: PathBuf,
    codec: StoreCodec,
    store: Store,
}

impl Bouillon {
    /// Build an empty store. The encryption key is validated here, not at first write.
    pub fn new(options: Options) -> Result<Self, BouillonError> {
        let codec = StoreCodec::new(options.key()?);
        let directory = match &options.directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|source| BouillonError::Io {
                path: PathBuf::from("."),
                source,
            })?,
        };
        let path = directory.join(options.file_name());
        debug!(path = %path.display(), encrypted = codec.is_encrypted(), "store configured");

        Ok(Self {
            options,
            path,
            codec,
            store: Store::new(),
        })
    }

    /// Build a store and load the existing file, if there is one.
    pub fn open(options: Options) -> Result<Self, BouillonError> {
        let mut bouillon = Self::new(options)?;
        match bouillon.read_sync().map(|_| ()) {
            Ok(()) | Err(BouillonError::NotFound { .. }) => Ok(bouillon),
            Err(err) => Err(err),
        }
    }

    /// Read-only view of everything held in memory.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn file_path(&self) -> &Path {
        &self.path
    }

    pub fn autosave(&self) -> bool {
        self.options.autosave
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, BouillonError> {
        Ok(self.store.get_as(key)?)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), BouillonError> {
        Ok(self.store.set(key, value)?)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.store.remove(key)
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Encode the store and atomically replace the data file.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn write(&self) -> Result<(), BouillonError> {
        let bytes = self.codec.encode(self.store.as_map())?;
        atomic_file::write(self.path.clone(), bytes).await?;
        Ok(())
    }

    /// Blocking variant of [`Bouillon::write`] with the same guarantees.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn write_sync(&self) -> Result<(), BouillonError> {
        let bytes = self.codec.encode(self.store.as_map())?;
        atomic_file::write_sync(&self.path, &bytes)?;
        Ok(())
    }

    /// Load the data file and replace the in-memory store with its content.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub async fn read(&mut self) -> Result<&Store, BouillonError> {
        let bytes = atomic_file::read(&self.path).await?;
        self.load(&bytes)
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn read_sync(&mut self) -> Result<&Store, BouillonError> {
        let bytes = atomic_file::read_sync(&self.path)?;
        self.load(&bytes)
    }

    fn load(&mut self, bytes: &[u8]) -> Result<&Store, BouillonError> {
        let entries = self.codec.decode(bytes)?;
        debug!(keys = entries.len(), "store loaded");
        self.store.replace(entries);
        Ok(&self.store)
    }
}
