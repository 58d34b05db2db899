// 🔍 Record Matcher - find the observation for (entity, year, sector)
//
// Four strategies, in strict precedence (first non-empty candidate set wins):
// 1. Code match        - query code vs record code column
// 2. Localized name    - exact normalized name in the locale's column
// 3. Catalog alias     - query → catalog entity → any of its aliases
// 4. Substring         - normalized containment, either direction (last resort)
//
// Aggregate rows (EU, Euro area) are divided by their fixed member count here,
// and only here: every consumer reads values through `value_of`.

use crate::config::DashboardConfig;
use crate::entities::{Entity, EntityCatalog};
use crate::locale::Locale;
use crate::metrics::{aggregate_member_count, per_member_average};
use crate::normalize::{contains_either, normalize_text};
use crate::observation::Observation;
use crate::sector::Sector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// MATCH STRATEGY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Same entity code (ISO2 / ISO3 / dataset code)
    Code,

    /// Exact normalized name in the locale's name column
    LocalizedName,

    /// Record name is one of the catalog aliases of the query entity
    CatalogAlias,

    /// One normalized name contains the other
    Substring,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Code => "code",
            MatchStrategy::LocalizedName => "localized-name",
            MatchStrategy::CatalogAlias => "catalog-alias",
            MatchStrategy::Substring => "substring",
        }
    }
}

// ============================================================================
// DUPLICATE POLICY
// ============================================================================

/// Which row wins when several rows match the same query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Largest absolute numeric value; earliest row on ties;
    /// rows without a numeric value lose to any numeric row
    #[default]
    MaxValue,

    /// Earliest row in file order
    FirstSeen,
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown duplicate policy: {0} (expected 'max_value' or 'first_seen')")]
pub struct ParsePolicyError(pub String);

impl FromStr for DuplicatePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "max_value" | "max" => Ok(DuplicatePolicy::MaxValue),
            "first_seen" | "first" => Ok(DuplicatePolicy::FirstSeen),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::MaxValue => f.write_str("max_value"),
            DuplicatePolicy::FirstSeen => f.write_str("first_seen"),
        }
    }
}

// ============================================================================
// MATCH RESULT
// ============================================================================

/// Position of a match inside a record slice (what the cache stores)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchHit {
    pub index: usize,
    pub strategy: MatchStrategy,

    /// Rows that matched before duplicate resolution
    pub candidates: usize,
}

#[derive(Debug, Clone)]
pub struct ResolvedMatch<'a> {
    pub observation: &'a Observation,
    pub index: usize,
    pub strategy: MatchStrategy,
    pub candidates: usize,

    /// Value as written in the file
    pub raw_value: Option<f64>,

    /// Fixed divisor applied to aggregate rows
    pub member_count: Option<u32>,

    /// Value every consumer must display / compare / rank
    pub value: Option<f64>,
}

impl ResolvedMatch<'_> {
    pub fn is_aggregate(&self) -> bool {
        self.member_count.is_some()
    }

    pub fn had_duplicates(&self) -> bool {
        self.candidates > 1
    }
}

// ============================================================================
// RECORD MATCHER
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordMatcher {
    catalog: Arc<EntityCatalog>,

    /// Which name column strategy 2 reads
    pub locale: Locale,

    pub duplicate_policy: DuplicatePolicy,

    /// Enable strategy 4
    pub substring_fallback: bool,

    /// Minimum normalized length for a containment match
    pub min_fallback_len: usize,

    /// Divide aggregate rows by their member count
    pub normalize_aggregates: bool,
}

/// Query prepared once per lookup
struct Query<'c> {
    raw: String,
    normalized: String,
    /// Entity the identifier names as a code
    code_entity: Option<&'c Entity>,
    /// Identifier shaped like a code but unknown to the catalog
    bare_code: Option<String>,
    /// Normalized aliases of the entity the identifier resolves to
    aliases: Vec<String>,
}

impl RecordMatcher {
    /// Create matcher with default settings
    pub fn new(catalog: Arc<EntityCatalog>) -> Self {
        RecordMatcher {
            catalog,
            locale: Locale::Es,
            duplicate_policy: DuplicatePolicy::MaxValue,
            substring_fallback: true,
            min_fallback_len: 4,
            normalize_aggregates: true,
        }
    }

    pub fn from_config(catalog: Arc<EntityCatalog>, config: &DashboardConfig) -> Self {
        RecordMatcher {
            catalog,
            locale: config.locale,
            duplicate_policy: config.duplicate_policy,
            substring_fallback: config.substring_fallback,
            min_fallback_len: config.min_fallback_len,
            normalize_aggregates: config.normalize_aggregates,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn shared_catalog(&self) -> Arc<EntityCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Settings that change lookup results (part of the cache key)
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.locale,
            self.duplicate_policy,
            self.substring_fallback,
            self.min_fallback_len,
            self.normalize_aggregates
        )
    }

    // ========================================================================
    // LOOKUP
    // ========================================================================

    /// Resolve (entity, year, sector) to at most one observation
    pub fn find_observation<'a>(
        &self,
        records: &'a [Observation],
        identifier: &str,
        year: i32,
        sector: Sector,
    ) -> Option<ResolvedMatch<'a>> {
        let hit = self.locate(records, identifier, year, sector)?;
        Some(self.resolved(records, hit))
    }

    /// Display value for (entity, year, sector)
    pub fn find_value(
        &self,
        records: &[Observation],
        identifier: &str,
        year: i32,
        sector: Sector,
    ) -> Option<f64> {
        self.find_observation(records, identifier, year, sector)
            .and_then(|m| m.value)
    }

    /// Index-only lookup
    pub fn locate(
        &self,
        records: &[Observation],
        identifier: &str,
        year: i32,
        sector: Sector,
    ) -> Option<MatchHit> {
        let query = self.prepare(identifier);
        if query.normalized.is_empty() {
            return None;
        }

        let slice: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, o)| o.year == year && o.matches_sector(sector))
            .map(|(i, _)| i)
            .collect();

        let strategies = [
            MatchStrategy::Code,
            MatchStrategy::LocalizedName,
            MatchStrategy::CatalogAlias,
            MatchStrategy::Substring,
        ];

        for strategy in strategies {
            if strategy == MatchStrategy::Substring && !self.substring_fallback {
                continue;
            }

            let candidates: Vec<usize> = slice
                .iter()
                .copied()
                .filter(|&i| self.matches(&records[i], &query, strategy))
                .collect();

            let Some(index) = self.pick(records, &candidates) else {
                continue;
            };
            debug!(
                query = %query.raw,
                year,
                sector = %sector,
                strategy = strategy.as_str(),
                candidates = candidates.len(),
                line = records[index].line_number,
                "matched observation"
            );
            return Some(MatchHit {
                index,
                strategy,
                candidates: candidates.len(),
            });
        }

        debug!(query = %query.raw, year, sector = %sector, "no observation matched");
        None
    }

    /// Turn a hit back into a full match
    pub fn resolved<'a>(&self, records: &'a [Observation], hit: MatchHit) -> ResolvedMatch<'a> {
        let observation = &records[hit.index];
        let raw_value = observation.numeric_value();
        let member_count = self.member_count_for(observation);
        let value = match (raw_value, member_count) {
            (Some(v), Some(count)) => per_member_average(v, count),
            (v, None) => v,
            (None, Some(_)) => None,
        };

        ResolvedMatch {
            observation,
            index: hit.index,
            strategy: hit.strategy,
            candidates: hit.candidates,
            raw_value,
            member_count,
            value,
        }
    }

    // ========================================================================
    // VALUES
    // ========================================================================

    /// Fixed divisor for aggregate rows; None for countries / regions or when
    /// aggregate normalization is disabled
    pub fn member_count_for(&self, observation: &Observation) -> Option<u32> {
        if !self.normalize_aggregates {
            return None;
        }

        let label = match observation.code.as_deref() {
            Some(code) => format!("{} {}", observation.entity, code),
            None => observation.entity.clone(),
        };

        let is_aggregate = observation.names().any(|n| self.catalog.is_supranational(n))
            || observation
                .code
                .as_deref()
                .is_some_and(|c| self.catalog.is_supranational(c));
        if !is_aggregate {
            return None;
        }

        aggregate_member_count(&label)
    }

    /// The value consumers display for a row (aggregates divided)
    pub fn value_of(&self, observation: &Observation) -> Option<f64> {
        let raw = observation.numeric_value()?;
        match self.member_count_for(observation) {
            Some(count) => per_member_average(raw, count),
            None => Some(raw),
        }
    }

    // ========================================================================
    // RECORD IDENTITY
    // ========================================================================

    /// Catalog entity a record refers to (code column first, then names)
    pub fn resolve_record(&self, observation: &Observation) -> Option<&Entity> {
        if let Some(entity) = observation
            .code
            .as_deref()
            .and_then(|c| self.catalog.find_by_code(c))
        {
            return Some(entity);
        }
        observation
            .names()
            .find_map(|name| self.catalog.find_by_name(name))
    }

    /// Grouping key: canonical code when resolvable, normalized name otherwise
    pub fn record_key(&self, observation: &Observation) -> String {
        match self.resolve_record(observation) {
            Some(entity) => entity.code.to_string(),
            None => normalize_text(&observation.entity),
        }
    }

    /// Pick one row among duplicates per the configured policy.
    /// None for an empty candidate list.
    pub fn pick(&self, records: &[Observation], candidates: &[usize]) -> Option<usize> {
        let (&first, rest) = candidates.split_first()?;
        if rest.is_empty() || self.duplicate_policy == DuplicatePolicy::FirstSeen {
            return Some(first);
        }

        let mut best = first;
        let mut best_value = records[first].numeric_value().map(f64::abs);
        for &i in rest {
            let value = records[i].numeric_value().map(f64::abs);
            let better = match (value, best_value) {
                (Some(v), Some(b)) => v > b,
                (Some(_), None) => true,
                _ => false,
            };
            if better {
                best = i;
                best_value = value;
            }
        }

        if best != first {
            debug!(
                kept_line = records[best].line_number,
                dropped_line = records[first].line_number,
                "duplicate rows: kept larger value"
            );
        }
        Some(best)
    }

    // ========================================================================
    // STRATEGIES
    // ========================================================================

    fn prepare(&self, identifier: &str) -> Query<'_> {
        let raw = identifier.trim().to_string();
        let code_entity = self.catalog.find_by_code(&raw);
        let bare_code = if code_entity.is_none() && looks_like_code(&raw) {
            Some(raw.clone())
        } else {
            None
        };
        let aliases = self
            .catalog
            .resolve(&raw)
            .map(|e| e.aliases().map(normalize_text).collect())
            .unwrap_or_default();

        Query {
            normalized: normalize_text(&raw),
            raw,
            code_entity,
            bare_code,
            aliases,
        }
    }

    fn matches(&self, record: &Observation, query: &Query<'_>, strategy: MatchStrategy) -> bool {
        match strategy {
            MatchStrategy::Code => {
                let Some(code) = record.code.as_deref() else {
                    return false;
                };
                if let Some(entity) = query.code_entity {
                    return entity.has_code(code);
                }
                query
                    .bare_code
                    .as_deref()
                    .is_some_and(|q| q.eq_ignore_ascii_case(code.trim()))
            }
            MatchStrategy::LocalizedName => {
                normalize_text(record.name_for(self.locale)) == query.normalized
            }
            MatchStrategy::CatalogAlias => {
                !query.aliases.is_empty()
                    && record
                        .names()
                        .any(|n| query.aliases.contains(&normalize_text(n)))
            }
            MatchStrategy::Substring => record.names().any(|n| {
                contains_either(&normalize_text(n), &query.normalized, self.min_fallback_len)
            }),
        }
    }
}

/// "ES", "EA20", "EU27_2020", "ES-CN"
fn looks_like_code(s: &str) -> bool {
    (2..=10).contains(&s.len())
        && s.chars().any(|c| c.is_ascii_uppercase())
        && s
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> RecordMatcher {
        RecordMatcher::new(Arc::new(EntityCatalog::with_defaults()))
    }

    fn obs(entity: &str, year: i32, sector: &str, value: &str) -> Observation {
        Observation::new(entity, year, sector, value)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_code_match_first() {
        let records = vec![
            obs("Grèce", 2022, "total", "1,5").with_code("EL"),
            obs("Greece", 2022, "total", "9,9"),
        ];
        let m = matcher().find_observation(&records, "GR", 2022, Sector::Total).unwrap();
        assert_eq!(m.strategy, MatchStrategy::Code);
        assert_eq!(m.index, 0);
    }

    #[test]
    fn test_localized_name_match() {
        let records = vec![obs("Spain", 2022, "All Sectors", "1,44").with_entity_es("España")];

        let es = matcher().find_observation(&records, "espana", 2022, Sector::Total).unwrap();
        assert_eq!(es.strategy, MatchStrategy::LocalizedName);

        let en = matcher()
            .with_locale(Locale::En)
            .find_observation(&records, "SPAIN", 2022, Sector::Total)
            .unwrap();
        assert_eq!(en.strategy, MatchStrategy::LocalizedName);
    }

    #[test]
    fn test_catalog_alias_match() {
        let records = vec![obs("Czech Republic", 2015, "total", "1,9")];
        let m = matcher().find_observation(&records, "Chequia", 2015, Sector::Total).unwrap();
        assert_eq!(m.strategy, MatchStrategy::CatalogAlias);
        assert_eq!(m.value, Some(1.9));
    }

    #[test]
    fn test_substring_fallback_and_toggle() {
        let records = vec![obs("Germany (provisional series)", 2022, "total", "3,1")];

        let m = matcher().find_observation(&records, "Germany", 2022, Sector::Total).unwrap();
        assert_eq!(m.strategy, MatchStrategy::Substring);

        let mut strict = matcher();
        strict.substring_fallback = false;
        assert!(strict.find_observation(&records, "Germany", 2022, Sector::Total).is_none());
    }

    #[test]
    fn test_short_fragments_do_not_match() {
        let records = vec![obs("Ireland", 2022, "total", "1,0")];
        assert!(matcher().find_observation(&records, "Ire", 2022, Sector::Total).is_none());
    }

    #[test]
    fn test_exact_beats_substring() {
        let records = vec![
            obs("Germany (until 1990 former territory of the FRG)", 2022, "total", "5,0"),
            obs("Germany", 2022, "total", "3,1"),
        ];
        let m = matcher()
            .with_locale(Locale::En)
            .find_observation(&records, "Germany", 2022, Sector::Total)
            .unwrap();
        assert_eq!(m.strategy, MatchStrategy::LocalizedName);
        assert_eq!(m.index, 1);
    }

    #[test]
    fn test_year_and_sector_filter() {
        let records = vec![
            obs("Spain", 2021, "All Sectors", "1,40"),
            obs("Spain", 2022, "Business enterprise sector", "0,80"),
            obs("Spain", 2022, "All Sectors", "1,44"),
        ];
        let m = matcher().find_observation(&records, "Spain", 2022, Sector::Total).unwrap();
        assert_eq!(m.index, 2);

        let b = matcher().find_observation(&records, "Spain", 2022, Sector::Business).unwrap();
        assert_eq!(b.index, 1);

        assert!(matcher().find_observation(&records, "Spain", 2020, Sector::Total).is_none());
        assert!(matcher().find_observation(&records, "Spain", 2022, Sector::Government).is_none());
    }

    #[test]
    fn test_duplicate_policy() {
        let records = vec![
            obs("Spain", 2022, "total", "1,40"),
            obs("Spain", 2022, "total", "1,44"),
            obs("Spain", 2022, "total", ""),
        ];

        let max = matcher().find_observation(&records, "Spain", 2022, Sector::Total).unwrap();
        assert_eq!(max.index, 1);
        assert_eq!(max.candidates, 3);
        assert!(max.had_duplicates());

        let first = matcher()
            .with_policy(DuplicatePolicy::FirstSeen)
            .find_observation(&records, "Spain", 2022, Sector::Total)
            .unwrap();
        assert_eq!(first.index, 0);
    }

    #[test]
    fn test_max_value_prefers_numeric_and_earliest_on_tie() {
        let records = vec![
            obs("Spain", 2022, "total", ""),
            obs("Spain", 2022, "total", "1,4"),
            obs("Spain", 2022, "total", "1.4"),
        ];
        let m = matcher().find_observation(&records, "Spain", 2022, Sector::Total).unwrap();
        assert_eq!(m.index, 1);
    }

    #[test]
    fn test_eu_aggregate_divided_by_27() {
        let records = vec![obs("European Union - 27 countries (from 2020)", 2022, "total", "59,4")];
        let m = matcher().find_observation(&records, "EU", 2022, Sector::Total).unwrap();
        assert_eq!(m.member_count, Some(27));
        assert!(approx(m.raw_value.unwrap(), 59.4));
        assert!(approx(m.value.unwrap(), 2.2));
        assert!(m.is_aggregate());
    }

    #[test]
    fn test_every_eu_vintage_divided_by_27() {
        let records = vec![
            obs("European Union - 28 countries (2013-2020)", 2019, "total", "59,4"),
            obs("European Union - 15 countries (1995-2004)", 2003, "total", "59,4"),
        ];
        for year in [2019, 2003] {
            let m = matcher().find_observation(&records, "EU", year, Sector::Total).unwrap();
            assert_eq!(m.member_count, Some(27));
            assert!(approx(m.value.unwrap(), 2.2));
        }
    }

    #[test]
    fn test_average_rows_keep_their_value() {
        let records = vec![
            obs("EU27 average", 2022, "All Sectors", "2,2"),
            obs("Promedio UE", 2021, "All Sectors", "2,1"),
        ];
        let m = matcher().find_observation(&records, "EU27 average", 2022, Sector::Total).unwrap();
        assert_eq!(m.member_count, None);
        assert_eq!(m.value, Some(2.2));

        let m = matcher().find_observation(&records, "Promedio UE", 2021, Sector::Total).unwrap();
        assert_eq!(m.value, Some(2.1));
        assert_eq!(matcher().value_of(&records[1]), Some(2.1));
    }

    #[test]
    fn test_pick_on_empty_candidates() {
        let records = vec![obs("Spain", 2022, "total", "1,4")];
        assert_eq!(matcher().pick(&records, &[]), None);
        assert_eq!(matcher().pick(&records, &[0]), Some(0));
    }

    #[test]
    fn test_euro_area_vintage_divisor() {
        let records = vec![
            obs("Euro area - 19 countries  (2015-2022)", 2022, "total", "38,0"),
            obs("Euro area – 20 countries (from 2023)", 2023, "total", "44,0"),
        ];
        let m19 = matcher().find_observation(&records, "Euro area", 2022, Sector::Total).unwrap();
        assert_eq!(m19.member_count, Some(19));
        assert!(approx(m19.value.unwrap(), 2.0));

        let m20 = matcher().find_observation(&records, "Zona del euro", 2023, Sector::Total).unwrap();
        assert_eq!(m20.member_count, Some(20));
        assert!(approx(m20.value.unwrap(), 2.2));
    }

    #[test]
    fn test_value_of_is_consistent_with_match() {
        let matcher = matcher();
        let records = vec![obs("European Union", 2022, "total", "59,4")];
        let m = matcher.find_observation(&records, "European Union", 2022, Sector::Total).unwrap();
        assert_eq!(matcher.value_of(&records[0]), m.value);

        let mut raw = RecordMatcher::new(Arc::new(EntityCatalog::with_defaults()));
        raw.normalize_aggregates = false;
        assert!(approx(raw.value_of(&records[0]).unwrap(), 59.4));
    }

    #[test]
    fn test_countries_are_not_divided() {
        let records = vec![obs("Spain", 2022, "total", "1,44").with_code("ES")];
        let m = matcher().find_observation(&records, "ES", 2022, Sector::Total).unwrap();
        assert_eq!(m.member_count, None);
        assert_eq!(m.value, Some(1.44));
    }

    #[test]
    fn test_malformed_value_resolves_with_none() {
        let records = vec![obs("Spain", 2022, "All Sectors", "")];
        let m = matcher().find_observation(&records, "Spain", 2022, Sector::Total).unwrap();
        assert_eq!(m.raw_value, None);
        assert_eq!(m.value, None);
    }

    #[test]
    fn test_unresolvable_entity_is_none() {
        let records = vec![obs("Spain", 2022, "total", "1,4")];
        assert!(matcher().find_observation(&records, "Atlantis", 2022, Sector::Total).is_none());
        assert!(matcher().find_observation(&records, "", 2022, Sector::Total).is_none());
    }

    #[test]
    fn test_record_key() {
        let m = matcher();
        assert_eq!(m.record_key(&obs("Czech Republic", 2022, "total", "1")), "CZ");
        assert_eq!(m.record_key(&obs("X", 2022, "total", "1").with_code("EL")), "GR");
        assert_eq!(m.record_key(&obs("Atlántida", 2022, "total", "1")), "atlantida");
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("max-value".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::MaxValue));
        assert_eq!("first_seen".parse::<DuplicatePolicy>(), Ok(DuplicatePolicy::FirstSeen));
        assert!("random".parse::<DuplicatePolicy>().is_err());
    }
}
