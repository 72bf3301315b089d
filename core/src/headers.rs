//! Headers merged into every outgoing request.
//!
//! # Design
//! [`HeaderBag`] is a plain ordered list with case-insensitive keys.
//! [`HeaderState`] shares one bag between the session manager and every
//! resource client of a single `DreamFactoryClient` (no process-wide state,
//! so two clients never see each other's session). Each operation holds the
//! lock only for its own synchronous body; requests take a
//! [`snapshot`](HeaderState::snapshot) while being built, before the first
//! `.await`, so a concurrent login or logout can never be observed
//! half-applied by a request already in flight.

use std::sync::{Arc, PoisonError, RwLock};

/// Header carrying the session token on authenticated requests.
pub const SESSION_TOKEN_HEADER: &str = "X-DreamFactory-Session-Token";

/// Header naming the calling application.
pub const APPLICATION_NAME_HEADER: &str = "X-DreamFactory-Application-Name";

/// Header carrying the application API key.
pub const API_KEY_HEADER: &str = "X-DreamFactory-Api-Key";

/// Ordered header map with case-insensitive, unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBag {
    entries: Vec<(String, String)>,
}

impl HeaderBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `name`. An existing entry keeps its position.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.position(name) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Remove `name`; absent keys are ignored.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|index| self.entries.remove(index).1)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.entries[index].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned copy of the entries in insertion order.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.entries.clone()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

/// A [`HeaderBag`] shared by everything issued from one client instance.
#[derive(Debug, Clone, Default)]
pub struct HeaderState {
    inner: Arc<RwLock<HeaderBag>>,
}

impl HeaderState {
    pub fn new(bag: HeaderBag) -> Self {
        Self {
            inner: Arc::new(RwLock::new(bag)),
        }
    }

    pub fn set(&self, name: &str, value: impl Into<String>) {
        self.write(|bag| bag.set(name, value));
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.write(|bag| bag.remove(name))
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.read(|bag| bag.get(name).map(str::to_owned))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read(|bag| bag.contains(name))
    }

    /// Point-in-time copy of all headers.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.read(HeaderBag::snapshot)
    }

    // Poisoning is ignored: each critical section is a single Vec operation.
    fn read<T>(&self, f: impl FnOnce(&HeaderBag) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut HeaderBag) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
