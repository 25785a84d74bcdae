//! Cache of decoded endpoint definitions.
//!
//! The file is still read on every request. Decoding is skipped only when the
//! bytes are identical to the cached copy, so an edited fixture is picked up
//! on the very next request. There is no eviction: the key space is the set
//! of fixture files.

use super::types::EndpointDefinition;
use crate::metrics;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug)]
struct CacheEntry {
    raw: Vec<u8>,
    definition: Arc<EndpointDefinition>,
}

/// Counters for cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

/// Decoded definitions keyed by file path.
#[derive(Debug, Default)]
pub struct DefinitionCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoded form of `raw`, reusing the cached one when the bytes match.
    pub fn get_or_decode(
        &self,
        path: &Path,
        raw: Vec<u8>,
    ) -> Result<Arc<EndpointDefinition>, serde_json::Error> {
        if let Some(entry) = self.entries.read().get(path) {
            if entry.raw == raw {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_definition_cache("hit");
                trace!("definition cache hit: {}", path.display());
                return Ok(Arc::clone(&entry.definition));
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_definition_cache("miss");

        match EndpointDefinition::from_slice(&raw) {
            Ok(definition) => {
                let definition = Arc::new(definition);
                self.entries.write().insert(
                    path.to_path_buf(),
                    CacheEntry {
                        raw,
                        definition: Arc::clone(&definition),
                    },
                );
                Ok(definition)
            }
            Err(e) => {
                self.entries.write().remove(path);
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.entries.read().len(),
        }
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GET_ONE: &[u8] = br#"{"Method": {"GET": {"Resp": 1}}}"#;
    const GET_TWO: &[u8] = br#"{"Method": {"GET": {"Resp": 2}}}"#;

    #[test]
    fn test_identical_bytes_hit() {
        let cache = DefinitionCache::new();
        let path = Path::new("defs/a.json");

        let first = cache.get_or_decode(path, GET_ONE.to_vec()).unwrap();
        let second = cache.get_or_decode(path, GET_ONE.to_vec()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                size: 1
            }
        );
    }

    #[test]
    fn test_changed_bytes_are_never_stale() {
        let cache = DefinitionCache::new();
        let path = Path::new("defs/a.json");

        cache.get_or_decode(path, GET_ONE.to_vec()).unwrap();
        let updated = cache.get_or_decode(path, GET_TWO.to_vec()).unwrap();

        assert_eq!(
            updated.context("GET").unwrap().response_body,
            serde_json::json!(2)
        );
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_decode_error_drops_entry() {
        let cache = DefinitionCache::new();
        let path = Path::new("defs/a.json");

        cache.get_or_decode(path, GET_ONE.to_vec()).unwrap();
        assert!(cache.get_or_decode(path, b"{not json".to_vec()).is_err());
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_clear() {
        let cache = DefinitionCache::new();
        cache
            .get_or_decode(Path::new("a.json"), GET_ONE.to_vec())
            .unwrap();
        cache
            .get_or_decode(Path::new("b.json"), GET_TWO.to_vec())
            .unwrap();
        assert_eq!(cache.stats().size, 2);

        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }
}
