//! In-process cache

use std::collections::HashSet;
use std::sync::Mutex;

use super::LocalCache;
use crate::record::CompositeKey;

/// Cache that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashSet<String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalCache for MemoryCache {
    fn has(&self, key: &CompositeKey) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key.cache_key())
    }

    fn set(&self, key: &CompositeKey) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.cache_key());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_follow_normalization() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());

        cache.set(&CompositeKey::new("User@X.com", "2024-05"));
        assert!(cache.has(&CompositeKey::new(" user@x.COM", "2024-05 ")));
        assert!(!cache.has(&CompositeKey::new("user@x.com", "2024-06")));

        cache.set(&CompositeKey::new("user@x.com", "2024-05"));
        assert_eq!(cache.len(), 1);
    }
}
