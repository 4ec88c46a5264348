//! Single-slot cache with expiration
//!
//! Holds the value produced by a supplier and hands out the same `Arc` until
//! the value expires. The slot is guarded by one lock that is also held while
//! the supplier runs, so concurrent callers wait for the new value instead of
//! recomputing it themselves or seeing a half-built one.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::Result;

type Supplier<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

struct Entry<T> {
    value: Arc<T>,
    expires_at: Option<Instant>,
}

/// Lazily computed value refreshed after a time-to-live
pub struct Cache<T> {
    supplier: Supplier<T>,
    expiration: RwLock<Option<Duration>>,
    entry: Mutex<Option<Entry<T>>>,
}

impl<T> Cache<T> {
    /// Create a cache whose value never expires (until [`Cache::reset`])
    pub fn new<F>(supplier: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self {
            supplier: Box::new(supplier),
            expiration: RwLock::new(None),
            entry: Mutex::new(None),
        }
    }

    /// Create a cache whose value expires `ttl` after being computed
    pub fn with_expiration<F>(ttl: Duration, supplier: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        let cache = Self::new(supplier);
        cache.set_expiration(ttl);
        cache
    }

    /// Current value, recomputed when missing or expired
    ///
    /// A failing supplier leaves the slot untouched and returns the error,
    /// so the next call tries again.
    pub fn get(&self) -> Result<Arc<T>> {
        let mut slot = self.entry.lock();
        let now = Instant::now();

        if let Some(entry) = slot.as_ref() {
            let expired = entry.expires_at.is_some_and(|at| now >= at);
            if !expired {
                return Ok(entry.value.clone());
            }
            debug!("Cached value expired");
        }

        let value = Arc::new((self.supplier)()?);
        let expires_at = self.expiration.read().map(|ttl| Instant::now() + ttl);

        *slot = Some(Entry {
            value: value.clone(),
            expires_at,
        });

        Ok(value)
    }

    /// Change the time-to-live of values computed from now on
    pub fn set_expiration(&self, ttl: Duration) {
        *self.expiration.write() = Some(ttl);
    }

    /// Current time-to-live
    pub fn expiration(&self) -> Option<Duration> {
        *self.expiration.read()
    }

    /// Force the next [`Cache::get`] to recompute the value
    pub fn reset(&self) {
        *self.entry.lock() = None;
    }
}

impl<T> fmt::Debug for Cache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("expiration", &self.expiration())
            .field("loaded", &self.entry.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn counting_cache(ttl: Option<Duration>) -> (Cache<usize>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let supplier = move || Ok(counter.fetch_add(1, Ordering::SeqCst));

        let cache = match ttl {
            Some(ttl) => Cache::with_expiration(ttl, supplier),
            None => Cache::new(supplier),
        };
        (cache, calls)
    }

    #[test]
    fn test_same_value_until_expiration() {
        let (cache, _) = counting_cache(Some(Duration::from_secs(1)));

        let original = cache.get().unwrap();
        let returned = cache.get().unwrap();
        assert!(Arc::ptr_eq(&original, &returned));

        thread::sleep(Duration::from_millis(100));
        let returned = cache.get().unwrap();
        assert!(Arc::ptr_eq(&original, &returned));

        thread::sleep(Duration::from_millis(1100));
        let returned = cache.get().unwrap();
        assert!(!Arc::ptr_eq(&original, &returned));
        assert_eq!(*returned, 1);
    }

    #[test]
    fn test_without_expiration_value_is_kept() {
        let (cache, calls) = counting_cache(None);

        let first = cache.get().unwrap();
        thread::sleep(Duration::from_millis(20));
        let second = cache.get().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_forces_recomputation() {
        let (cache, calls) = counting_cache(None);

        let first = cache.get().unwrap();
        cache.reset();
        let second = cache.get().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_set_expiration_applies_to_next_computation() {
        let (cache, calls) = counting_cache(None);

        let first = cache.get().unwrap();
        cache.set_expiration(Duration::from_millis(10));
        thread::sleep(Duration::from_millis(30));

        // the held value was computed without expiration
        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.reset();
        cache.get().unwrap();
        thread::sleep(Duration::from_millis(30));
        cache.get().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_concurrent_gets_compute_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cache = Arc::new(Cache::with_expiration(Duration::from_secs(60), move || {
            thread::sleep(Duration::from_millis(50));
            Ok(counter.fetch_add(1, Ordering::SeqCst))
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || cache.get().unwrap())
            })
            .collect();

        let values: Vec<Arc<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_supplier_error_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cache = Cache::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::configuration("source unavailable"))
            } else {
                Ok("loaded")
            }
        });

        assert!(cache.get().is_err());
        assert_eq!(*cache.get().unwrap(), "loaded");
    }
}
