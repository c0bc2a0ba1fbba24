//! Email to principal-id cache.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Case-insensitive map from email address to directory id.
///
/// Unbounded and process-lived. Entries are never treated as authoritative:
/// a stale id simply fails at the API.
#[derive(Debug, Default)]
pub struct PrincipalCache {
    entries: RwLock<HashMap<String, String>>,
}

impl PrincipalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &str) -> Option<String> {
        self.entries.read().get(&normalize(address)).cloned()
    }

    pub fn insert(&self, address: &str, id: impl Into<String>) {
        self.entries.write().insert(normalize(address), id.into());
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn normalize(address: &str) -> String {
    address.trim().to_lowercase()
}
