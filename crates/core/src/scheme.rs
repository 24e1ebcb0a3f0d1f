//! Set of URL schemes eligible for interception.
//!
//! Readers take a cheap `Arc` snapshot; writers swap in a whole new set, so a
//! concurrent reader sees either the previous set or the new one.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

/// Thread-safe, atomically replaceable scheme set.
#[derive(Debug, Default)]
pub struct SchemeRegistry {
    schemes: RwLock<Arc<BTreeSet<String>>>,
}

impl SchemeRegistry {
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { schemes: RwLock::new(Arc::new(normalize_set(schemes))) }
    }

    /// Snapshot of the current set.
    pub fn supported_schemes(&self) -> Arc<BTreeSet<String>> {
        self.schemes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole set. An empty set disables interception.
    pub fn set_supported_schemes<I, S>(&self, schemes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let next = Arc::new(normalize_set(schemes));
        tracing::debug!(schemes = ?next, "replacing supported schemes");
        *self.schemes.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, scheme: &str) -> bool {
        self.supported_schemes()
            .contains(&scheme.trim().to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.supported_schemes().is_empty()
    }
}

fn normalize_set<I, S>(schemes: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    schemes
        .into_iter()
        .map(|s| s.as_ref().trim().trim_end_matches(':').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
