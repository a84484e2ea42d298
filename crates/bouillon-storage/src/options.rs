use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::{CodecError, EncryptionKey};

pub const DEFAULT_NAME: &str = "bouillon";
const FILE_EXTENSION: &str = "txt";

/// Construction options for a [`crate::Bouillon`] store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Base name of the data file; the file is `<name>.txt`.
    pub name: String,
    /// Folder holding the data file. `None` means the working directory at construction.
    pub directory: Option<PathBuf>,
    /// Carried for callers that flush after each change; the store never writes on its own.
    pub autosave: bool,
    /// 32-byte AES-256 key as text. `None` or empty stores plain JSON.
    pub encryption_key: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            directory: None,
            autosave: false,
            encryption_key: None,
        }
    }
}

impl Options {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    pub fn file_name(&self) -> String {
        format!("{}.{FILE_EXTENSION}", self.name)
    }

    /// Parse the configured key, rejecting anything that is not exactly 32 bytes.
    pub fn key(&self) -> Result<Option<EncryptionKey>, CodecError> {
        self.encryption_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .map(EncryptionKey::try_from)
            .transpose()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .field("autosave", &self.autosave)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
