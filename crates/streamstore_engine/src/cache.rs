//! Cache port.
//!
//! The cache exclusively owns payload storage; the engine only moves data
//! through these calls and never inspects it beyond present or absent.
//! Merge semantics (what appending at the tail or prepending at the head
//! means) belong to the implementation.

use crate::error::StoreResult;
use parking_lot::RwLock;

/// Abstract load/save of the cached payload for one stream.
///
/// Cache I/O failures propagate to the engine's caller as
/// [`StoreError`](crate::StoreError); they are never turned into
/// lifecycle state.
pub trait CacheStore<T>: Send + Sync {
    /// Loads the cached payload, `None` when absent.
    fn load(&self) -> StoreResult<Option<T>>;

    /// Overwrites the cached payload. `None` clears it.
    fn save(&self, data: Option<T>) -> StoreResult<()>;

    /// Merges newly fetched data at the tail of the cached payload.
    ///
    /// `cached` is the pre-fetch snapshot the fetch was issued against.
    fn save_appending(&self, cached: Option<T>, new: T) -> StoreResult<()>;

    /// Merges newly fetched data at the head of the cached payload.
    fn save_prepending(&self, cached: Option<T>, new: T) -> StoreResult<()>;
}

impl<T, C> CacheStore<T> for std::sync::Arc<C>
where
    C: CacheStore<T> + ?Sized,
{
    fn load(&self) -> StoreResult<Option<T>> {
        (**self).load()
    }

    fn save(&self, data: Option<T>) -> StoreResult<()> {
        (**self).save(data)
    }

    fn save_appending(&self, cached: Option<T>, new: T) -> StoreResult<()> {
        (**self).save_appending(cached, new)
    }

    fn save_prepending(&self, cached: Option<T>, new: T) -> StoreResult<()> {
        (**self).save_prepending(cached, new)
    }
}

/// An in-memory cache for list-shaped payloads, merging by
/// concatenation.
///
/// Useful as-is for tests and small in-process caches.
pub struct MemoryListCache<I> {
    data: RwLock<Option<Vec<I>>>,
}

impl<I> MemoryListCache<I> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(None),
        }
    }
}

impl<I> Default for MemoryListCache<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> CacheStore<Vec<I>> for MemoryListCache<I>
where
    I: Clone + Send + Sync,
{
    fn load(&self) -> StoreResult<Option<Vec<I>>> {
        Ok(self.data.read().clone())
    }

    fn save(&self, data: Option<Vec<I>>) -> StoreResult<()> {
        *self.data.write() = data;
        Ok(())
    }

    fn save_appending(&self, cached: Option<Vec<I>>, new: Vec<I>) -> StoreResult<()> {
        let mut merged = cached.unwrap_or_default();
        merged.extend(new);
        *self.data.write() = Some(merged);
        Ok(())
    }

    fn save_prepending(&self, cached: Option<Vec<I>>, new: Vec<I>) -> StoreResult<()> {
        let mut merged = new;
        merged.extend(cached.unwrap_or_default());
        *self.data.write() = Some(merged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trip() {
        let cache: MemoryListCache<u32> = MemoryListCache::new();
        assert_eq!(cache.load().unwrap(), None);

        cache.save(Some(vec![1, 2, 3])).unwrap();
        assert_eq!(cache.load().unwrap(), Some(vec![1, 2, 3]));

        cache.save(None).unwrap();
        assert_eq!(cache.load().unwrap(), None);
    }

    #[test]
    fn appending_concatenates_at_tail() {
        let cache: MemoryListCache<u32> = MemoryListCache::new();
        cache.save_appending(Some(vec![1, 2]), vec![3, 4]).unwrap();
        assert_eq!(cache.load().unwrap(), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn prepending_concatenates_at_head() {
        let cache: MemoryListCache<u32> = MemoryListCache::new();
        cache.save_prepending(Some(vec![3, 4]), vec![1, 2]).unwrap();
        assert_eq!(cache.load().unwrap(), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn merging_into_absent_cache_stores_the_page() {
        let cache: MemoryListCache<u32> = MemoryListCache::new();
        cache.save_appending(None, vec![7]).unwrap();
        assert_eq!(cache.load().unwrap(), Some(vec![7]));
    }
}
