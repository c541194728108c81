// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue store for pending mutations.
//!
//! The store keeps the authoritative FIFO list in memory and mirrors it to a
//! JSONL file. Every mutating call rewrites the file atomically before it
//! returns, so a crash right after `enqueue` never loses the write and a
//! reader never sees a partially written list.
//!
//! The queue file is owned by exactly one process: opening the store takes
//! an exclusive lock on a sibling `.lock` file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use tally_core::{
    jsonl, ClockSource, MutationId, MutationPatch, MutationPayload, QueuedMutation, SystemClock,
};

use crate::error::{Error, Result};

/// Durable, ordered collection of pending mutations.
pub struct QueueStore {
    /// Path to the queue file.
    path: PathBuf,
    /// In-memory mirror of the file, in enqueue order.
    items: Vec<QueuedMutation>,
    /// False until `load` succeeds. Writes are refused while false so an
    /// unreadable file is never overwritten.
    loaded: bool,
    /// Why the last `load` failed, repeated by writes until a load succeeds.
    load_error: Option<String>,
    /// Bumped after every successful mutation.
    revision: u64,
    clock: Arc<dyn ClockSource>,
    /// Held for the lifetime of the store.
    _lock: File,
}

impl std::fmt::Debug for QueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStore")
            .field("path", &self.path)
            .field("items", &self.items.len())
            .field("loaded", &self.loaded)
            .field("load_error", &self.load_error)
            .field("revision", &self.revision)
            .finish()
    }
}

impl QueueStore {
    /// Opens the store at `path` using the system clock.
    ///
    /// The queue is not read until [`load`](Self::load) is called.
    pub fn open(path: &Path) -> Result<Self> {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    /// Opens the store at `path` with a custom clock (for testing).
    pub fn with_clock(path: &Path, clock: Arc<dyn ClockSource>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock = acquire_lock(&lock_path(path)).map_err(|e| {
            if e.kind() == fs2::lock_contended_error().kind() {
                Error::QueueLocked(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        Ok(QueueStore {
            path: path.to_path_buf(),
            items: Vec::new(),
            loaded: false,
            load_error: None,
            revision: 0,
            clock,
            _lock: lock,
        })
    }

    /// Returns the path to the queue file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted queue into memory.
    ///
    /// A missing file loads as an empty queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file is unreadable or corrupt. The
    /// file is left untouched and the store stays unloaded; call
    /// [`reset`](Self::reset) to start over or fix the file and load again.
    pub fn load(&mut self) -> Result<&[QueuedMutation]> {
        match jsonl::read_all::<QueuedMutation>(&self.path) {
            Ok(items) => {
                self.items = items;
                self.loaded = true;
                self.load_error = None;
                self.revision += 1;
                Ok(&self.items)
            }
            Err(e) => {
                self.items.clear();
                self.loaded = false;
                let err = Error::from(e);
                self.load_error = Some(match &err {
                    Error::Storage(msg) => msg.clone(),
                    other => other.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Returns true once the queue has been read successfully.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Fails with [`Error::Storage`] unless the queue has been loaded.
    ///
    /// After a failed load the error repeats that failure.
    pub fn ensure_loaded(&self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        Err(Error::Storage(match &self.load_error {
            Some(reason) => reason.clone(),
            None => format!("queue at {} has not been loaded", self.path.display()),
        }))
    }

    /// Appends a new mutation and persists the queue before returning.
    pub fn enqueue(&mut self, payload: MutationPayload) -> Result<QueuedMutation> {
        self.ensure_loaded()?;

        let created_at = self.clock.now();
        let id = MutationId::generate(&payload, &created_at, |candidate| {
            self.items.iter().any(|m| m.id.as_str() == candidate)
        });
        let mutation = QueuedMutation::new(id, payload, created_at);

        self.items.push(mutation.clone());
        if let Err(e) = self.persist() {
            self.items.pop();
            return Err(e);
        }

        tracing::debug!(id = %mutation.id, kind = %mutation.payload.kind, "enqueued mutation");
        Ok(mutation)
    }

    /// Applies `patch` to the record with `id` and persists the queue.
    pub fn update(&mut self, id: &MutationId, patch: &MutationPatch) -> Result<QueuedMutation> {
        self.ensure_loaded()?;

        let index = self.index_of(id)?;
        let previous = self.items[index].clone();
        self.items[index].apply(patch);

        if let Err(e) = self.persist() {
            self.items[index] = previous;
            return Err(e);
        }

        Ok(self.items[index].clone())
    }

    /// Removes the record with `id` and persists the queue.
    pub fn remove(&mut self, id: &MutationId) -> Result<QueuedMutation> {
        self.ensure_loaded()?;

        let index = self.index_of(id)?;
        let removed = self.items.remove(index);

        if let Err(e) = self.persist() {
            self.items.insert(index, removed);
            return Err(e);
        }

        Ok(removed)
    }

    /// Returns the current ordered snapshot.
    pub fn list(&self) -> &[QueuedMutation] {
        &self.items
    }

    /// Returns the record with `id`, if present.
    pub fn get(&self, id: &MutationId) -> Option<&QueuedMutation> {
        self.items.iter().find(|m| &m.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Change counter; differs after every successful load or mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Moves an unreadable queue file aside and starts with an empty queue.
    ///
    /// Returns the path the old file was moved to, if there was one. Nothing
    /// is deleted.
    pub fn reset(&mut self) -> Result<Option<PathBuf>> {
        let moved = if self.path.exists() {
            let stamp = self.clock.now().format("%Y%m%dT%H%M%S%.3fZ");
            let mut aside = self.path.clone().into_os_string();
            aside.push(format!(".corrupt-{}", stamp));
            let aside = PathBuf::from(aside);
            fs::rename(&self.path, &aside)?;
            Some(aside)
        } else {
            None
        };

        self.items.clear();
        self.loaded = true;
        self.load_error = None;
        self.persist()?;

        if let Some(aside) = &moved {
            tracing::warn!(path = %aside.display(), "moved unreadable queue aside");
        }
        Ok(moved)
    }

    fn index_of(&self, id: &MutationId) -> Result<usize> {
        self.items
            .iter()
            .position(|m| &m.id == id)
            .ok_or_else(|| Error::MutationNotFound(id.to_string()))
    }

    fn persist(&mut self) -> Result<()> {
        jsonl::write_all(&self.path, &self.items)?;
        self.revision += 1;
        Ok(())
    }
}

/// Reads the queue at `path` without taking ownership of it.
///
/// Safe while another process owns the queue: writes are atomic renames, so
/// the file is always a complete list.
pub fn read_snapshot(path: &Path) -> Result<Vec<QueuedMutation>> {
    Ok(jsonl::read_all(path)?)
}

/// Returns true if some process currently owns the queue at `path`.
pub fn is_owned(path: &Path) -> bool {
    let lock = lock_path(path);
    if !lock.exists() {
        return false;
    }
    match OpenOptions::new().write(true).open(&lock) {
        Ok(file) => match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                false
            }
            Err(_) => true,
        },
        Err(_) => false,
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut lock = path.to_path_buf().into_os_string();
    lock.push(".lock");
    PathBuf::from(lock)
}

fn acquire_lock(lock_path: &Path) -> std::io::Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    file.try_lock_exclusive()?;
    Ok(file)
}
