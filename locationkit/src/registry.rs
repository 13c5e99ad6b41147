//! Observer registry: the per-kind collection of registered requests.
//!
//! Keyed by [`RequestId`] for constant-time membership tests and removal.
//! Iteration order is unspecified; reconciliation does not depend on it.
//!
//! The registry only stores requests. Reconciling the hardware after a
//! mutation is the service's job, done while it still holds its state lock.

use std::collections::HashMap;
use std::sync::Arc;

use crate::request::{Request, RequestId};

/// Registered requests of one kind.
#[derive(Debug)]
pub struct ObserverRegistry<R: Request> {
    entries: HashMap<RequestId, Arc<R>>,
}

impl<R: Request> Default for ObserverRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Request> ObserverRegistry<R> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a request.
    ///
    /// Returns false (and changes nothing) if a request with the same
    /// identifier is already present.
    pub fn add(&mut self, request: Arc<R>) -> bool {
        let id = request.id();
        if self.entries.contains_key(&id) {
            return false;
        }
        if R::ENABLE_ON_REGISTER {
            request.enable();
        }
        self.entries.insert(id, request);
        true
    }

    /// Remove a request, returning it if it was present.
    pub fn remove(&mut self, id: RequestId) -> Option<Arc<R>> {
        self.entries.remove(&id)
    }

    /// Returns true if the identifier is registered.
    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Look up a request.
    pub fn get(&self, id: RequestId) -> Option<&Arc<R>> {
        self.entries.get(&id)
    }

    /// Number of registered requests, active or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered requests.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<R>> {
        self.entries.values()
    }

    /// Currently active requests, recomputed on every call.
    pub fn enabled(&self) -> impl Iterator<Item = &Arc<R>> {
        self.entries.values().filter(|request| request.is_active())
    }

    /// Returns true if at least one request is active.
    pub fn has_enabled(&self) -> bool {
        self.enabled().next().is_some()
    }

    /// Owned copy of the active requests, for delivery outside the lock.
    pub fn enabled_snapshot(&self) -> Vec<Arc<R>> {
        self.enabled().cloned().collect()
    }

    /// Owned copy of every registered request.
    pub fn snapshot(&self) -> Vec<Arc<R>> {
        self.entries.values().cloned().collect()
    }

    /// Remove and return every registered request.
    pub fn drain(&mut self) -> Vec<Arc<R>> {
        self.entries.drain().map(|(_, request)| request).collect()
    }
}
