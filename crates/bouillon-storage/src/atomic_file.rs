//! Crash-safe whole-file replacement.
//!
//! A write is staged into a temp file beside the destination, synced, then
//! renamed over it. Readers of the destination only ever see the old or the
//! new content. A staged write that is dropped, or a commit that fails,
//! removes its temp file and leaves the destination untouched.
//!
//! Rewrites keep the permissions of the file they replace, and a symlinked
//! destination is written through to its target.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("no file at {}", path.display())]
    NotFound { path: PathBuf },
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The blocking pool task panicked or was shut down.
    #[error("background write task failed: {reason}")]
    Task { reason: String },
}

/// Temp file holding the full new content, not yet renamed into place.
#[derive(Debug)]
pub struct StagedWrite {
    tmp: NamedTempFile,
    dest: PathBuf,
}

impl StagedWrite {
    /// Create, fill and sync a temp file in the destination's directory.
    pub fn stage(dest: impl Into<PathBuf>, bytes: &[u8]) -> Result<Self, PersistError> {
        let dest = follow_symlink(dest.into());
        let dir = parent_dir(&dest);
        fs::create_dir_all(&dir).map_err(|source| io_err(&dir, source))?;

        let prefix = format!(
            ".{}.",
            dest.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        let mut tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|source| io_err(&dir, source))?;

        if let Ok(meta) = fs::metadata(&dest) {
            if meta.is_file() {
                tmp.as_file()
                    .set_permissions(meta.permissions())
                    .map_err(|source| io_err(tmp.path(), source))?;
            }
        }
        fill(&mut tmp, bytes).map_err(|source| io_err(tmp.path(), source))?;

        debug!(tmp = %tmp.path().display(), len = bytes.len(), "staged write");
        Ok(Self { tmp, dest })
    }

    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    pub fn destination(&self) -> &Path {
        &self.dest
    }

    /// Atomically rename the temp file over the destination.
    pub fn commit(self) -> Result<(), PersistError> {
        let Self { tmp, dest } = self;
        // On failure the returned error owns the temp file and deletes it on drop.
        tmp.persist(&dest).map_err(|err| io_err(&dest, err.error))?;
        sync_dir(&parent_dir(&dest));
        Ok(())
    }
}

fn fill(tmp: &mut NamedTempFile, bytes: &[u8]) -> io::Result<()> {
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()
}

/// Blocking write with the full atomicity contract.
#[instrument(skip_all, fields(path = %path.display(), len = bytes.len()))]
pub fn write_sync(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    StagedWrite::stage(path, bytes)?.commit()
}

/// Non-blocking write; the file work runs on tokio's blocking pool.
///
/// Dropping the future before the rename leaves the destination untouched;
/// a temp file staged in the meantime is removed when its task result is dropped.
#[instrument(skip_all, fields(path = %path.display(), len = bytes.len()))]
pub async fn write(path: PathBuf, bytes: Vec<u8>) -> Result<(), PersistError> {
    let staged = run_blocking(move || StagedWrite::stage(path, &bytes)).await?;
    run_blocking(move || staged.commit()).await
}

pub fn read_sync(path: &Path) -> Result<Vec<u8>, PersistError> {
    fs::read(path).map_err(|source| read_err(path, source))
}

pub async fn read(path: &Path) -> Result<Vec<u8>, PersistError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| read_err(path, source))
}

async fn run_blocking<T, F>(task: F) -> Result<T, PersistError>
where
    F: FnOnce() -> Result<T, PersistError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| PersistError::Task {
            reason: err.to_string(),
        })?
}

fn follow_symlink(path: PathBuf) -> PathBuf {
    match fs::symlink_metadata(&path) {
        // A dangling link is replaced like any other path.
        Ok(meta) if meta.file_type().is_symlink() => fs::canonicalize(&path).unwrap_or(path),
        _ => path,
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    // Persists the rename itself; the data is already synced.
    if let Err(err) = fs::File::open(dir).and_then(|handle| handle.sync_all()) {
        debug!(dir = %dir.display(), %err, "directory sync skipped");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

fn io_err(path: &Path, source: io::Error) -> PersistError {
    PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_err(path: &Path, source: io::Error) -> PersistError {
    if source.kind() == io::ErrorKind::NotFound {
        PersistError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        io_err(path, source)
    }
}
