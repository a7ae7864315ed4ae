//! Keyed registry bridging compile-time artifacts to runtime instructions.
//!
//! An instruction travels as text and cannot embed objects, so the compiler
//! registers its artifact (a [`WorkloadTree`]) and embeds only the returned
//! key. At run time the instruction looks the key up again.
//!
//! Entries are never removed on lookup: a compression site inside a loop
//! executes its instruction once per iteration and each execution needs the
//! same artifact. Entries live as long as the registry, which is owned by the
//! compiled program and shared by `Arc` with the emitter and the runtime.

use crate::workload::WorkloadTree;
use dashmap::DashMap;
use matcomp_core::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Key of a registry entry. Key 0 means "no registered artifact".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RegistryKey(pub u32);

impl RegistryKey {
    /// The reserved "absent" key.
    pub const NONE: RegistryKey = RegistryKey(0);

    /// Whether this is the reserved "absent" key.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe, append-only map from keys to shared artifacts.
#[derive(Debug)]
pub struct SingletonRegistry<T> {
    entries: DashMap<u32, Arc<T>>,
    next_key: AtomicU32,
}

/// Registry of workload trees.
pub type WorkloadRegistry = SingletonRegistry<WorkloadTree>;

impl<T> SingletonRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_key: AtomicU32::new(1),
        }
    }

    /// Store an artifact under a fresh key.
    ///
    /// Keys are unique across concurrent callers and never 0. The entry is
    /// inserted before the key is returned.
    pub fn register(&self, artifact: impl Into<Arc<T>>) -> Result<RegistryKey> {
        let key = self
            .next_key
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |k| {
                (k != 0).then(|| k.wrapping_add(1))
            })
            .map_err(|_| Error::RegistryExhausted(u32::MAX))?;
        self.entries.insert(key, artifact.into());
        trace!("Registered artifact under key {}", key);
        Ok(RegistryKey(key))
    }

    /// Artifact registered under `key`; `None` for [`RegistryKey::NONE`] or
    /// unknown keys. The entry stays in place.
    pub fn lookup(&self, key: RegistryKey) -> Option<Arc<T>> {
        if key.is_none() {
            return None;
        }
        self.entries.get(&key.0).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether an artifact is registered under `key`.
    pub fn contains(&self, key: RegistryKey) -> bool {
        !key.is_none() && self.entries.contains_key(&key.0)
    }

    /// Number of registered artifacts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for SingletonRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
