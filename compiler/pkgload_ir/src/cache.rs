//! Shared resolution cache.
//!
//! Maps import paths to their resolution state for the lifetime of one
//! top-level session. The same handle is shared by the source engine and the
//! precompiled importer, so a package loaded once is never loaded again.
//!
//! # States
//!
//! ```text
//! absent ──begin()──► in-progress ──finish()──► complete
//!    ▲                     │
//!    └──── guard dropped ──┘        (stub inserted by an export reader)
//!                                    ──insert()──► failed-partial
//! ```
//!
//! The lock is held only for individual reads and writes, never across
//! parsing, checking or recursive imports.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::Package;

/// Resolution state of one import path.
#[derive(Clone, Debug)]
pub enum CacheState {
    /// Never seen, or a previous attempt failed and was cleaned up.
    Absent,
    /// Being resolved on the current call chain.
    InProgress,
    /// Fully type-checked; never mutated again.
    Complete(Arc<Package>),
    /// Present but incomplete; must not be trusted.
    Partial(Arc<Package>),
}

impl CacheState {
    pub fn is_absent(&self) -> bool {
        matches!(self, CacheState::Absent)
    }
}

#[derive(Clone, Debug)]
enum Slot {
    InProgress,
    Complete(Arc<Package>),
    Partial(Arc<Package>),
}

impl Slot {
    fn for_package(package: Arc<Package>) -> Slot {
        if package.is_complete() {
            Slot::Complete(package)
        } else {
            Slot::Partial(package)
        }
    }

    fn state(&self) -> CacheState {
        match self {
            Slot::InProgress => CacheState::InProgress,
            Slot::Complete(pkg) => CacheState::Complete(Arc::clone(pkg)),
            Slot::Partial(pkg) => CacheState::Partial(Arc::clone(pkg)),
        }
    }
}

/// Cheaply clonable handle to a shared path → package map.
#[derive(Clone, Default)]
pub struct PackageCache {
    slots: Arc<Mutex<FxHashMap<String, Slot>>>,
}

impl std::fmt::Debug for PackageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("PackageCache")
            .field("len", &slots.len())
            .finish()
    }
}

impl PackageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `path`.
    pub fn state(&self, path: &str) -> CacheState {
        self.slots
            .lock()
            .get(path)
            .map_or(CacheState::Absent, Slot::state)
    }

    /// The complete package for `path`, if any.
    pub fn get_complete(&self, path: &str) -> Option<Arc<Package>> {
        match self.slots.lock().get(path) {
            Some(Slot::Complete(pkg)) => Some(Arc::clone(pkg)),
            _ => None,
        }
    }

    /// Claim `path` for resolution.
    ///
    /// If the path is absent it is marked in-progress and a guard is
    /// returned; dropping the guard without calling [`Resolving::finish`]
    /// reverts the path to absent. Otherwise the current state is returned.
    pub fn begin(&self, path: &str) -> Result<Resolving<'_>, CacheState> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(path) {
            return Err(slot.state());
        }
        slots.insert(path.to_owned(), Slot::InProgress);
        tracing::trace!(path, "marked in progress");
        Ok(Resolving {
            cache: self,
            path: path.to_owned(),
        })
    }

    /// Store a package, classified by its completeness.
    ///
    /// Replaces any previous entry except a complete one, which is never
    /// overwritten; in that case the stored package is returned instead.
    pub fn insert(&self, package: Arc<Package>) -> Arc<Package> {
        let mut slots = self.slots.lock();
        if let Some(Slot::Complete(existing)) = slots.get(package.path()) {
            return Arc::clone(existing);
        }
        slots.insert(
            package.path().to_owned(),
            Slot::for_package(Arc::clone(&package)),
        );
        package
    }

    /// Insert an incomplete placeholder for `path` unless it is already known.
    pub fn insert_stub(&self, path: &str, name: &str) {
        let mut slots = self.slots.lock();
        if !slots.contains_key(path) {
            tracing::trace!(path, "inserted stub");
            slots.insert(
                path.to_owned(),
                Slot::Partial(Arc::new(Package::new(path, name))),
            );
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.slots.lock().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Paths of all complete packages, sorted.
    pub fn complete_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Complete(_)))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Whether two handles share the same map.
    pub fn same_cache(&self, other: &PackageCache) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }
}

/// An in-progress claim on one import path.
///
/// Reverts the path to absent on drop unless [`Resolving::finish`] stored a
/// package first.
#[must_use = "dropping the guard immediately releases the in-progress marker"]
pub struct Resolving<'a> {
    cache: &'a PackageCache,
    path: String,
}

impl Resolving<'_> {
    /// Replace the in-progress marker with the finished package.
    pub fn finish(self, package: Arc<Package>) -> Arc<Package> {
        debug_assert_eq!(package.path(), self.path);
        self.cache
            .slots
            .lock()
            .insert(self.path.clone(), Slot::for_package(Arc::clone(&package)));
        tracing::trace!(path = %self.path, "stored");
        package
    }
}

impl Drop for Resolving<'_> {
    fn drop(&mut self) {
        let mut slots = self.cache.slots.lock();
        if matches!(slots.get(&self.path), Some(Slot::InProgress)) {
            slots.remove(&self.path);
            tracing::trace!(path = %self.path, "released in-progress marker");
        }
    }
}
