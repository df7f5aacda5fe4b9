//! Durable JSON persistence with backup-before-overwrite.
//!
//! A save moves the current generation aside to `<file>.temp`, writes the new
//! generation, reads it back and checks the entry count, then drops the temp
//! copy. A failed save puts the temp copy back. A load that finds a leftover
//! temp copy restores it first, so readers only ever see a complete
//! generation.
//!
//! Corrupt files are moved to `<file>.backup` (or a timestamped
//! `<file>.backup.<time>` when that name is taken) and replaced by an empty
//! mapping: availability wins over the lost data, but the bytes are kept.
//!
//! File I/O is blocking. Async callers go through [`DurableFile::persist`],
//! which runs the save on the blocking thread pool.

use crate::error::StoreError;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Anything persisted through this module must be able to report how many
/// top-level entries it holds, so a reloaded file can be checked against
/// what was written.
pub trait Entries {
    fn entry_count(&self) -> usize;
}

impl<K, V> Entries for BTreeMap<K, V> {
    fn entry_count(&self) -> usize {
        self.len()
    }
}

impl<K, V, S> Entries for HashMap<K, V, S> {
    fn entry_count(&self) -> usize {
        self.len()
    }
}

/// Location of the previous generation while a save is in progress.
pub fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, ".temp")
}

/// Location the first corrupt file is moved to.
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".backup")
}

/// `<path>.backup`, or a timestamped sibling when an earlier corruption
/// already left a backup there.
fn unused_backup_path(path: &Path) -> PathBuf {
    let backup = backup_path(path);
    if !backup.exists() {
        return backup;
    }

    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let stamped = with_suffix(path, &format!(".backup.{}", stamp));
    let mut candidate = stamped.clone();
    let mut n = 1;
    while candidate.exists() {
        candidate = with_suffix(&stamped, &format!(".{}", n));
        n += 1;
    }
    candidate
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Load the mapping stored at `path`.
///
/// Never fails: a missing file, an unreadable file and a corrupt file all
/// produce an empty mapping. Only the corrupt case touches the filesystem
/// (the file is renamed aside, never over an earlier backup).
pub fn load<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    restore_interrupted_save(path);

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("{} does not exist yet, starting empty", path.display());
            return T::default();
        }
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            return T::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            let backup = unused_backup_path(path);
            error!(
                "{} is corrupt ({}), moving it to {} and starting empty",
                path.display(),
                e,
                backup.display()
            );
            if let Err(rename_err) = fs::rename(path, &backup) {
                error!(
                    "Failed to move corrupt {} aside: {}",
                    path.display(),
                    rename_err
                );
            }
            T::default()
        }
    }
}

/// A leftover `<path>.temp` means a save died between moving the previous
/// generation aside and removing it. Whatever sits at `path` is untrusted.
fn restore_interrupted_save(path: &Path) {
    let temp = temp_path(path);
    if !temp.exists() {
        return;
    }

    warn!(
        "Found interrupted save for {}, restoring previous generation",
        path.display()
    );
    if let Err(e) = fs::rename(&temp, path) {
        error!(
            "Failed to restore {} from {}: {}",
            path.display(),
            temp.display(),
            e
        );
    }
}

/// Persist `value` at `path`, keeping the previous generation recoverable
/// until the new one has been written and verified.
pub fn save<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize + DeserializeOwned + Entries,
{
    let content =
        serde_json::to_vec_pretty(value).map_err(|e| StoreError::serialization(path, e))?;
    let expected = value.entry_count();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
    }

    let temp = temp_path(path);
    let backed_up = match fs::rename(path, &temp) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if let Err(err) = write_and_verify::<T>(path, &content, expected) {
        roll_back(path, &temp, backed_up);
        return Err(err);
    }

    // Also clears a stale temp copy when there was nothing to back up.
    match fs::remove_file(&temp) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(StoreError::io(&temp, e)),
    }

    debug!("Saved {} entries to {}", expected, path.display());
    Ok(())
}

fn write_and_verify<T>(path: &Path, content: &[u8], expected: usize) -> Result<(), StoreError>
where
    T: DeserializeOwned + Entries,
{
    let mut file = fs::File::create(path).map_err(|e| StoreError::io(path, e))?;
    file.write_all(content).map_err(|e| StoreError::io(path, e))?;
    file.sync_all().map_err(|e| StoreError::io(path, e))?;
    drop(file);

    let written = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    let reloaded: T =
        serde_json::from_slice(&written).map_err(|e| StoreError::serialization(path, e))?;

    let found = reloaded.entry_count();
    if found != expected {
        return Err(StoreError::Verification {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }

    Ok(())
}

fn roll_back(path: &Path, temp: &Path, backed_up: bool) {
    if backed_up {
        match fs::rename(temp, path) {
            Ok(()) => warn!("Restored previous generation of {}", path.display()),
            Err(e) => error!(
                "Failed to restore {} from {}: {}",
                path.display(),
                temp.display(),
                e
            ),
        }
    } else {
        match fs::remove_file(path) {
            Ok(()) => warn!("Removed unverified first generation of {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => error!("Failed to remove unverified {}: {}", path.display(), e),
        }
    }
}

/// A point-in-time copy of a store's contents.
///
/// Generations follow the order in which snapshots were taken, so a save
/// that finishes late can never replace a newer generation on disk.
#[derive(Debug)]
pub struct Snapshot<T> {
    generation: u64,
    value: T,
}

#[derive(Debug)]
struct FileState {
    path: PathBuf,
    /// Generation currently on disk. Held for the whole load or save.
    written: Mutex<u64>,
    generations: AtomicU64,
}

/// A persisted file with all loads and saves serialized through one lock.
///
/// Cloning is cheap and clones share the lock.
#[derive(Debug, Clone)]
pub struct DurableFile {
    state: Arc<FileState>,
}

impl DurableFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            state: Arc::new(FileState {
                path: path.into(),
                written: Mutex::new(0),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.state.path
    }

    /// Blocking load; see [`load`].
    pub fn load<T>(&self) -> T
    where
        T: DeserializeOwned + Default,
    {
        let _guard = self.state.written.lock().unwrap_or_else(PoisonError::into_inner);
        load(self.path())
    }

    /// Copy `value` for saving. Call it while holding the lock that guards
    /// `value`, so generations match the order of the changes.
    pub fn snapshot<T: Clone>(&self, value: &T) -> Snapshot<T> {
        Snapshot {
            generation: self.state.generations.fetch_add(1, Ordering::SeqCst) + 1,
            value: value.clone(),
        }
    }

    /// Blocking save. A snapshot older than the generation on disk is
    /// skipped, since the newer one already contains its changes.
    pub fn save<T>(&self, snapshot: &Snapshot<T>) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Entries,
    {
        let mut written = self.state.written.lock().unwrap_or_else(PoisonError::into_inner);
        if snapshot.generation <= *written {
            debug!(
                "Skipping generation {} of {}, generation {} is already saved",
                snapshot.generation,
                self.path().display(),
                *written
            );
            return Ok(());
        }
        save(self.path(), &snapshot.value)?;
        *written = snapshot.generation;
        Ok(())
    }

    /// [`DurableFile::save`] on the blocking thread pool.
    pub async fn persist<T>(&self, snapshot: Snapshot<T>) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Entries + Send + 'static,
    {
        let file = self.clone();
        tokio::task::spawn_blocking(move || file.save(&snapshot)).await?
    }

    /// [`DurableFile::load`] on the blocking thread pool.
    pub async fn load_async<T>(&self) -> T
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        let file = self.clone();
        match tokio::task::spawn_blocking(move || file.load()).await {
            Ok(value) => value,
            Err(e) => {
                error!("Loading {} did not complete: {}", self.path().display(), e);
                T::default()
            }
        }
    }
}
