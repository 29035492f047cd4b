//! Signature-keyed memoization of layout results.
//!
//! The cache is owned and mutated exclusively by the engine; callers only
//! ever see its get/set/clear contract. Entries are invalidated by layout
//! version mismatch, by TTL expiry, or by failing the well-formedness
//! check, and evicted oldest-insertion-first once the size bound is hit.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::grid::LayoutResult;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Deterministic cache key over event-set identity, view parameters and
/// breakpoint. Two calls with identical inputs build identical signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutSignature(u64);

impl LayoutSignature {
    /// Start a typed signature builder seeded with a stable namespace.
    pub fn builder(seed: impl Hash) -> SignatureBuilder {
        SignatureBuilder::new(seed)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Incremental builder for layout signatures.
///
/// Avoids ad-hoc string formatting and keeps key construction typed.
pub struct SignatureBuilder {
    hasher: DefaultHasher,
}

impl SignatureBuilder {
    pub fn new(seed: impl Hash) -> Self {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        SignatureBuilder { hasher }
    }

    pub fn with(mut self, part: impl Hash) -> Self {
        part.hash(&mut self.hasher);
        self
    }

    pub fn finish(self) -> LayoutSignature {
        LayoutSignature(self.hasher.finish())
    }
}

struct CacheEntry {
    result: LayoutResult,
    inserted_at: Instant,
    version: u64,
}

/// Read-only cache counters for the diagnostics pane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct LayoutCache {
    entries: HashMap<LayoutSignature, CacheEntry>,
    ttl: Duration,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }
}

impl LayoutCache {
    /// Capacity must be at least 1; the engine validates this at
    /// configuration time.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        LayoutCache {
            entries: HashMap::new(),
            ttl,
            capacity,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    fn entry_is_live(&self, entry: &CacheEntry, version: u64) -> bool {
        entry.version == version && entry.inserted_at.elapsed() <= self.ttl
    }

    /// Look up a result. Version mismatches, expired entries and entries
    /// failing the well-formedness check all count as misses; the last
    /// kind is dropped with a warning rather than surfaced as an error.
    pub fn get(&mut self, signature: LayoutSignature, version: u64) -> Option<LayoutResult> {
        let Some(entry) = self.entries.get(&signature) else {
            self.misses += 1;
            return None;
        };

        if !self.entry_is_live(entry, version) {
            debug!(
                "Layout cache: stale entry for {:#x} (version {} vs {})",
                signature.as_u64(),
                entry.version,
                version
            );
            self.entries.remove(&signature);
            self.misses += 1;
            return None;
        }

        if !entry.result.is_well_formed() {
            warn!(
                "Layout cache: discarding malformed entry for {:#x}",
                signature.as_u64()
            );
            self.entries.remove(&signature);
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.entries
            .get(&signature)
            .map(|entry| entry.result.clone())
    }

    pub fn set(&mut self, signature: LayoutSignature, result: LayoutResult, version: u64) {
        self.entries.insert(
            signature,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
                version,
            },
        );

        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(signature, _)| *signature);
            let Some(oldest) = oldest else {
                break;
            };
            self.entries.remove(&oldest);
            self.evictions += 1;
        }
    }

    pub fn has(&self, signature: LayoutSignature, version: u64) -> bool {
        self.entries
            .get(&signature)
            .is_some_and(|entry| self.entry_is_live(entry, version) && entry.result.is_well_formed())
    }

    pub fn delete(&mut self, signature: LayoutSignature) -> bool {
        self.entries.remove(&signature).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{AllDayRow, LayoutBody, NowIndicator};
    use std::thread::sleep;

    fn result(version: u64) -> LayoutResult {
        LayoutResult {
            body: LayoutBody::DayGrid {
                timed: Vec::new(),
                all_day: AllDayRow::default(),
                now: NowIndicator {
                    top: 0.0,
                    visible: false,
                },
            },
            skipped: Vec::new(),
            layout_version: version,
            computed_at_ms: 0,
        }
    }

    fn signature(n: u64) -> LayoutSignature {
        LayoutSignature::builder("test").with(n).finish()
    }

    #[test]
    fn test_signature_is_deterministic() {
        let a = LayoutSignature::builder("layout").with(3u64).with("day-grid").finish();
        let b = LayoutSignature::builder("layout").with(3u64).with("day-grid").finish();
        let c = LayoutSignature::builder("layout").with(4u64).with("day-grid").finish();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let mut cache = LayoutCache::default();
        let sig = signature(1);

        cache.set(sig, result(1), 1);
        assert!(cache.has(sig, 1));
        assert_eq!(cache.get(sig, 1), Some(result(1)));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_version_mismatch_is_a_miss() {
        let mut cache = LayoutCache::default();
        let sig = signature(1);

        cache.set(sig, result(1), 1);
        assert!(!cache.has(sig, 2));
        assert_eq!(cache.get(sig, 2), None);
        // The stale entry is dropped, not resurrected by a later read.
        assert_eq!(cache.get(sig, 1), None);
    }

    #[test]
    fn test_ttl_expiry() {
        let mut cache = LayoutCache::new(Duration::from_millis(20), 8);
        let sig = signature(1);

        cache.set(sig, result(1), 1);
        assert!(cache.has(sig, 1));

        sleep(Duration::from_millis(40));
        assert!(!cache.has(sig, 1));
        assert_eq!(cache.get(sig, 1), None);
    }

    #[test]
    fn test_eviction_drops_oldest_first() {
        let mut cache = LayoutCache::new(Duration::from_secs(60), 2);

        cache.set(signature(1), result(1), 1);
        sleep(Duration::from_millis(5));
        cache.set(signature(2), result(1), 1);
        sleep(Duration::from_millis(5));
        cache.set(signature(3), result(1), 1);

        assert_eq!(cache.stats().entries, 2);
        assert_eq!(cache.stats().evictions, 1);
        assert!(!cache.has(signature(1), 1));
        assert!(cache.has(signature(2), 1));
        assert!(cache.has(signature(3), 1));
    }

    #[test]
    fn test_malformed_entry_is_a_miss() {
        let mut cache = LayoutCache::default();
        let sig = signature(1);

        let mut bad = result(1);
        if let LayoutBody::DayGrid { now, .. } = &mut bad.body {
            now.top = f32::INFINITY;
        }

        cache.set(sig, bad, 1);
        assert!(!cache.has(sig, 1));
        assert_eq!(cache.get(sig, 1), None);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_delete_and_clear() {
        let mut cache = LayoutCache::default();

        cache.set(signature(1), result(1), 1);
        cache.set(signature(2), result(1), 1);

        assert!(cache.delete(signature(1)));
        assert!(!cache.delete(signature(1)));

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
