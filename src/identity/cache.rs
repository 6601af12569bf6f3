/// Fingerprint cache - maps recently resolved fingerprints back to id/ names
///
/// HKP clients usually run an index search and then fetch the key by
/// fingerprint. The second request no longer mentions the id/ name, so the
/// name is remembered here for a short while.
use super::{Fingerprint, IdentityName};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    name: IdentityName,
    inserted_at: Instant,
}

/// Bounded, time-expiring fingerprint → name map
pub struct FingerprintCache {
    /// Keyed by lowercase `0x<hex>`
    entries: Mutex<HashMap<String, CacheEntry>>,
    max_entries: usize,
    ttl: Duration,
}

impl FingerprintCache {
    /// Create a new, empty cache
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    /// Remember `fingerprint → name`
    ///
    /// Any entry already pointing at `name` is dropped first, so a rotated
    /// key never leaves its predecessor behind.
    pub fn put(&self, fingerprint: &Fingerprint, name: &IdentityName) {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        entries.retain(|_, entry| &entry.name != name && !self.is_expired(entry, now));

        let key = fingerprint.prefixed();
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(oldest_key, _)| oldest_key.clone());
            if let Some(oldest_key) = oldest {
                debug!("Fingerprint cache full, evicting {}", oldest_key);
                entries.remove(&oldest_key);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                name: name.clone(),
                inserted_at: now,
            },
        );
    }

    /// Look up a `0x`-prefixed fingerprint (case-insensitive)
    pub fn get(&self, fingerprint: &str) -> Option<IdentityName> {
        let key = fingerprint.to_lowercase();
        let mut entries = self.entries.lock();

        let expired = match entries.get(&key) {
            None => return None,
            Some(entry) => self.is_expired(entry, Instant::now()),
        };
        if expired {
            entries.remove(&key);
            return None;
        }

        entries.get(&key).map(|entry| entry.name.clone())
    }

    /// Drop every entry pointing at `name`
    pub fn remove_by_name(&self, name: &IdentityName) {
        self.entries.lock().retain(|_, entry| &entry.name != name);
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until swept
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    fn fpr(n: u8) -> Fingerprint {
        Fingerprint::parse(&format!("{:02x}", n).repeat(20)).unwrap()
    }

    fn name(s: &str) -> IdentityName {
        IdentityName::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = FingerprintCache::new(10, TTL);
        cache.put(&fpr(0xab), &name("id/phelix"));

        assert_eq!(cache.get(&fpr(0xab).prefixed()), Some(name("id/phelix")));
        // Case-insensitive lookup
        assert_eq!(
            cache.get(&fpr(0xab).prefixed().to_uppercase()),
            Some(name("id/phelix"))
        );
        assert_eq!(cache.get(&fpr(2).prefixed()), None);
    }

    #[tokio::test]
    async fn test_rotation_replaces_entry_for_name() {
        let cache = FingerprintCache::new(10, TTL);
        cache.put(&fpr(1), &name("id/phelix"));
        cache.put(&fpr(2), &name("id/phelix"));

        assert_eq!(cache.get(&fpr(1).prefixed()), None);
        assert_eq!(cache.get(&fpr(2).prefixed()), Some(name("id/phelix")));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_one_entry_per_name_after_many_puts() {
        let cache = FingerprintCache::new(10, TTL);
        let names = ["id/a", "id/b", "id/c"];
        for i in 0..30u8 {
            cache.put(&fpr(i), &name(names[i as usize % names.len()]));
        }

        assert_eq!(cache.len(), names.len());
        assert_eq!(cache.get(&fpr(27).prefixed()), Some(name("id/a")));
        assert_eq!(cache.get(&fpr(28).prefixed()), Some(name("id/b")));
        assert_eq!(cache.get(&fpr(29).prefixed()), Some(name("id/c")));
    }

    #[tokio::test]
    async fn test_same_fingerprint_moves_to_new_name() {
        let cache = FingerprintCache::new(10, TTL);
        cache.put(&fpr(1), &name("id/a"));
        cache.put(&fpr(1), &name("id/b"));

        assert_eq!(cache.get(&fpr(1).prefixed()), Some(name("id/b")));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_at_capacity_keeps_other_entries() {
        let cache = FingerprintCache::new(2, TTL);
        cache.put(&fpr(1), &name("id/a"));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put(&fpr(2), &name("id/b"));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put(&fpr(2), &name("id/c"));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&fpr(1).prefixed()), Some(name("id/a")));
        assert_eq!(cache.get(&fpr(2).prefixed()), Some(name("id/c")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_bound_evicts_oldest() {
        let cache = FingerprintCache::new(3, TTL);
        for i in 0..5u8 {
            cache.put(&fpr(i), &name(&format!("id/n{}", i)));
            tokio::time::advance(Duration::from_secs(1)).await;
            assert!(cache.len() <= 3);
        }

        assert_eq!(cache.get(&fpr(0).prefixed()), None);
        assert_eq!(cache.get(&fpr(1).prefixed()), None);
        assert_eq!(cache.get(&fpr(4).prefixed()), Some(name("id/n4")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = FingerprintCache::new(10, TTL);
        cache.put(&fpr(1), &name("id/phelix"));

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert_eq!(cache.get(&fpr(1).prefixed()), Some(name("id/phelix")));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&fpr(1).prefixed()), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_does_not_extend_ttl() {
        let cache = FingerprintCache::new(10, TTL);
        cache.put(&fpr(1), &name("id/phelix"));

        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(60)).await;
            assert!(cache.get(&fpr(1).prefixed()).is_some());
        }
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(cache.get(&fpr(1).prefixed()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = FingerprintCache::new(10, TTL);
        cache.put(&fpr(1), &name("id/a"));
        tokio::time::advance(Duration::from_secs(200)).await;
        cache.put(&fpr(2), &name("id/b"));
        tokio::time::advance(Duration::from_secs(100)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&fpr(2).prefixed()).is_some());
    }

    #[tokio::test]
    async fn test_remove_by_name() {
        let cache = FingerprintCache::new(10, TTL);
        cache.put(&fpr(1), &name("id/a"));
        cache.put(&fpr(2), &name("id/b"));

        cache.remove_by_name(&name("id/a"));
        assert_eq!(cache.get(&fpr(1).prefixed()), None);
        assert_eq!(cache.get(&fpr(2).prefixed()), Some(name("id/b")));
    }

    #[tokio::test]
    async fn test_concurrent_rotation_leaves_single_entry() {
        let cache = std::sync::Arc::new(FingerprintCache::new(100, TTL));
        let mut handles = Vec::new();
        for i in 0..50u8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.put(&fpr(i), &name("id/phelix"));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len(), 1);
    }
}
