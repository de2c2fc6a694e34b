use crate::url::NormalizedUrl;
use std::collections::HashSet;
use std::sync::Mutex;

/// URLs claimed for dispatch during one run
///
/// The set only grows. `try_claim` is the single deduplication gate of the
/// crawler: a URL is enqueued only by the caller whose claim inserted it.
/// Share it between workers through an `Arc`.
#[derive(Debug, Default)]
pub struct VisitedSet {
    claimed: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically inserts `url` if absent
    ///
    /// Returns true iff this call performed the insert.
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_sweep::state::VisitedSet;
    /// use sumi_sweep::url::normalize_url;
    ///
    /// let visited = VisitedSet::new();
    /// let url = normalize_url("https://shop.example/product/1").unwrap();
    /// assert!(visited.try_claim(&url));
    /// assert!(!visited.try_claim(&url));
    /// ```
    pub fn try_claim(&self, url: &NormalizedUrl) -> bool {
        self.lock().insert(url.as_str().to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // A panic while holding the lock cannot leave the set half-updated,
        // so a poisoned guard is still usable.
        self.claimed.lock().unwrap_or_else(|e| e.into_inner())
    }
}
