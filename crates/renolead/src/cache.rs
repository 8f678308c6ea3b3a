//! Reusable TTL cache for reference data. One abstraction shared by the
//! assignee roster, territory table, skill catalog, and source metrics.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

struct CacheEntry<T> {
    value: Arc<T>,
    loaded_at: DateTime<Utc>,
}

/// Time-bounded snapshot refreshed lazily on read. Reads within the TTL
/// window serve the cached snapshot even if backing data changed (bounded
/// staleness). Concurrent refreshes are not deduplicated; the overwrite is
/// idempotent.
pub struct TtlCache<T> {
    ttl: Duration,
    entry: Mutex<Option<CacheEntry<T>>>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    fn fresh(&self, now: DateTime<Utc>) -> Option<Arc<T>> {
        let guard = self.entry.lock().expect("cache mutex poisoned");
        guard
            .as_ref()
            .filter(|entry| now - entry.loaded_at < self.ttl)
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Return the cached snapshot, or run `loader` and cache its result when
    /// the entry is missing or stale. The loader runs outside the lock.
    pub fn get_or_refresh<E>(
        &self,
        now: DateTime<Utc>,
        loader: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(value) = self.fresh(now) {
            return Ok(value);
        }

        let value = Arc::new(loader()?);
        let mut guard = self.entry.lock().expect("cache mutex poisoned");
        *guard = Some(CacheEntry {
            value: Arc::clone(&value),
            loaded_at: now,
        });
        Ok(value)
    }

    pub fn invalidate(&self) {
        let mut guard = self.entry.lock().expect("cache mutex poisoned");
        *guard = None;
    }
}

impl<T: Clone> TtlCache<T> {
    /// Mutate the cached snapshot in place if one is present. Used to keep
    /// in-cache workload counters current between refreshes. Returns false
    /// when nothing is cached.
    pub fn mutate(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut guard = self.entry.lock().expect("cache mutex poisoned");
        match guard.as_mut() {
            Some(entry) => {
                f(Arc::make_mut(&mut entry.value));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::convert::Infallible;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, minute, 0).single().expect("valid timestamp")
    }

    #[test]
    fn serves_cached_value_within_ttl() {
        let cache = TtlCache::new(Duration::minutes(5));
        let first: Arc<u32> = cache
            .get_or_refresh(at(0), || Ok::<_, Infallible>(1))
            .expect("load succeeds");
        let second = cache
            .get_or_refresh(at(4), || Ok::<_, Infallible>(2))
            .expect("cached read succeeds");

        assert_eq!(*first, 1);
        assert_eq!(*second, 1, "within the TTL the loader must not run");
    }

    #[test]
    fn refreshes_after_ttl_elapses() {
        let cache = TtlCache::new(Duration::minutes(5));
        cache
            .get_or_refresh(at(0), || Ok::<_, Infallible>(1))
            .expect("load succeeds");
        let refreshed = cache
            .get_or_refresh(at(6), || Ok::<_, Infallible>(2))
            .expect("refresh succeeds");

        assert_eq!(*refreshed, 2);
    }

    #[test]
    fn loader_errors_leave_cache_empty() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::minutes(5));
        let result = cache.get_or_refresh(at(0), || Err::<u32, _>("offline"));
        assert!(result.is_err());

        let loaded = cache
            .get_or_refresh(at(1), || Ok::<_, &str>(7))
            .expect("retry succeeds");
        assert_eq!(*loaded, 7);
    }

    #[test]
    fn mutate_updates_cached_snapshot() {
        let cache = TtlCache::new(Duration::minutes(5));
        cache
            .get_or_refresh(at(0), || Ok::<_, Infallible>(vec![1, 2]))
            .expect("load succeeds");
        assert!(cache.mutate(|values| values.push(3)));

        let snapshot = cache
            .get_or_refresh(at(1), || Ok::<_, Infallible>(vec![]))
            .expect("cached read succeeds");
        assert_eq!(*snapshot, vec![1, 2, 3]);
    }
}
