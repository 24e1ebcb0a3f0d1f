//! Per-key writer leases.
//!
//! At most one in-flight request captures a response for a given key.
//! Others for the same key still forward and deliver, but leave
//! population to the lease holder.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use offcache_core::CacheKey;

type Held = Arc<Mutex<HashSet<CacheKey>>>;

/// Registry of keys currently being captured.
#[derive(Debug, Default, Clone)]
pub struct WriterLeases {
    held: Held,
}

impl WriterLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the writer role for `key`, or `None` if another request holds it.
    pub fn try_acquire(&self, key: &CacheKey) -> Option<WriterLease> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if held.insert(key.clone()) {
            Some(WriterLease { key: key.clone(), held: Arc::clone(&self.held) })
        } else {
            None
        }
    }

    pub fn is_held(&self, key: &CacheKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn len(&self) -> usize {
        self.held.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive capture right for one key; released on drop.
#[derive(Debug)]
pub struct WriterLease {
    key: CacheKey,
    held: Held,
}

impl WriterLease {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

impl Drop for WriterLease {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
