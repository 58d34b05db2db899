// 🗄️ Match Cache - memoized lookups for repeated UI interactions
//
// Key: (dataset version, matcher settings, identifier, year, sector)
// Stores only the hit position, so cached and uncached lookups return the
// same ResolvedMatch.

use crate::matcher::{MatchHit, RecordMatcher, ResolvedMatch};
use crate::observation::Dataset;
use crate::sector::Sector;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    dataset_version: String,
    matcher: String,
    identifier: String,
    year: i32,
    sector: Sector,
}

/// Hit / miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

#[derive(Debug)]
pub struct MatchCache {
    entries: RwLock<HashMap<CacheKey, Option<MatchHit>>>,
    max_entries: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Default for MatchCache {
    fn default() -> Self {
        MatchCache::new()
    }
}

impl MatchCache {
    pub fn new() -> Self {
        MatchCache::with_max_entries(50_000)
    }

    /// Cache that stops inserting after `max_entries`
    pub fn with_max_entries(max_entries: usize) -> Self {
        MatchCache {
            entries: RwLock::new(HashMap::new()),
            max_entries,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Same contract as [`RecordMatcher::find_observation`], memoized
    pub fn find_observation<'a>(
        &self,
        matcher: &RecordMatcher,
        dataset: &'a Dataset,
        identifier: &str,
        year: i32,
        sector: Sector,
    ) -> Option<ResolvedMatch<'a>> {
        let key = CacheKey {
            dataset_version: dataset.version.clone(),
            matcher: matcher.fingerprint(),
            // Raw text: case decides whether "abc" is read as a code
            identifier: identifier.trim().to_string(),
            year,
            sector,
        };

        // A poisoned lock only costs the memoization
        let cached = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(&key).copied());

        let hit = match cached {
            Some(hit) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                hit
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let hit = matcher.locate(&dataset.observations, identifier, year, sector);
                if let Ok(mut entries) = self.entries.write() {
                    if entries.len() < self.max_entries {
                        entries.insert(key, hit);
                    }
                }
                hit
            }
        };

        hit.map(|h| matcher.resolved(&dataset.observations, h))
    }

    /// Display value, memoized
    pub fn find_value(
        &self,
        matcher: &RecordMatcher,
        dataset: &Dataset,
        identifier: &str,
        year: i32,
        sector: Sector,
    ) -> Option<f64> {
        self.find_observation(matcher, dataset, identifier, year, sector)
            .and_then(|m| m.value)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().map(|e| e.len()).unwrap_or(0),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityCatalog;
    use crate::locale::Locale;
    use crate::observation::Observation;
    use std::sync::Arc;

    fn dataset() -> Dataset {
        Dataset::new(
            "gdp.csv",
            vec![
                Observation::new("Spain", 2022, "All Sectors", "1,44"),
                Observation::new("Spain", 2021, "All Sectors", "1,40"),
                Observation::new("Germany", 2022, "All Sectors", "3,13"),
            ],
        )
    }

    fn matcher() -> RecordMatcher {
        RecordMatcher::new(Arc::new(EntityCatalog::with_defaults()))
    }

    #[test]
    fn test_cached_equals_uncached() {
        let cache = MatchCache::new();
        let matcher = matcher();
        let data = dataset();

        for identifier in ["Spain", "España", "ES", "Germany", "Atlantis"] {
            for year in [2021, 2022, 2023] {
                let direct = matcher
                    .find_observation(&data.observations, identifier, year, Sector::Total)
                    .map(|m| m.index);
                let first = cache
                    .find_observation(&matcher, &data, identifier, year, Sector::Total)
                    .map(|m| m.index);
                let second = cache
                    .find_observation(&matcher, &data, identifier, year, Sector::Total)
                    .map(|m| m.index);
                assert_eq!(direct, first, "{} {}", identifier, year);
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_hits_and_misses() {
        let cache = MatchCache::new();
        let matcher = matcher();
        let data = dataset();

        cache.find_value(&matcher, &data, "Spain", 2022, Sector::Total);
        cache.find_value(&matcher, &data, " Spain ", 2022, Sector::Total);
        cache.find_value(&matcher, &data, "Spain", 2021, Sector::Total);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 2);

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_new_dataset_version_misses() {
        let cache = MatchCache::new();
        let matcher = matcher();
        let old = dataset();
        let mut rows = old.observations.clone();
        rows[0] = Observation::new("Spain", 2022, "All Sectors", "1,49");
        let new = Dataset::new("gdp.csv", rows);

        assert_eq!(cache.find_value(&matcher, &old, "Spain", 2022, Sector::Total), Some(1.44));
        assert_eq!(cache.find_value(&matcher, &new, "Spain", 2022, Sector::Total), Some(1.49));
    }

    #[test]
    fn test_spanish_name_column_changes_the_key() {
        let cache = MatchCache::new();
        let matcher = matcher();
        let row = || Observation::new("Spain", 2022, "All Sectors", "1,44");
        let a = Dataset::new("gdp.csv", vec![row().with_entity_es("España")]);
        let b = Dataset::new("gdp.csv", vec![row().with_entity_es("Chequia")]);

        assert_eq!(cache.find_value(&matcher, &a, "Chequia", 2022, Sector::Total), None);

        let direct = matcher
            .find_observation(&b.observations, "Chequia", 2022, Sector::Total)
            .map(|m| m.index);
        let cached = cache
            .find_observation(&matcher, &b, "Chequia", 2022, Sector::Total)
            .map(|m| m.index);
        assert_eq!(cached, direct);
        assert_eq!(cached, Some(0));
    }

    #[test]
    fn test_matcher_settings_are_part_of_key() {
        let cache = MatchCache::new();
        let data = Dataset::new(
            "gdp.csv",
            vec![Observation::new("Spain", 2022, "Total", "1,44").with_entity_es("España")],
        );

        let es = matcher().with_locale(Locale::Es);
        let en = matcher().with_locale(Locale::En);
        cache.find_value(&es, &data, "España", 2022, Sector::Total);
        cache.find_value(&en, &data, "España", 2022, Sector::Total);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_max_entries() {
        let cache = MatchCache::with_max_entries(1);
        let matcher = matcher();
        let data = dataset();
        cache.find_value(&matcher, &data, "Spain", 2022, Sector::Total);
        cache.find_value(&matcher, &data, "Germany", 2022, Sector::Total);
        assert_eq!(cache.stats().entries, 1);
        // Uncached lookups still answer
        assert_eq!(cache.find_value(&matcher, &data, "Germany", 2022, Sector::Total), Some(3.13));
    }
}
