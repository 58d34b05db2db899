// 📋 Summaries - what a chart, table or tooltip shows for an entity
//
// Every value here comes from RecordMatcher (find_value / value_of), so
// aggregate rows are divided by their member count in every consumer.

use crate::entities::country::EU_CODE;
use crate::locale::{format_decimal, format_optional, format_percent_change, Locale};
use crate::matcher::{MatchStrategy, RecordMatcher};
use crate::metrics::{ranked_order, share_of_total, yoy_change, RankEntry, RankPosition};
use crate::observation::{Observation, ObservationFlag};
use crate::sector::Sector;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// ENTITY SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    /// Canonical catalog code, when the entity is known
    pub code: Option<String>,

    /// Display name in the requested locale
    pub name: String,

    pub flag_url: Option<String>,
    pub year: i32,
    pub sector: Sector,

    pub value: Option<f64>,
    pub previous: Option<f64>,
    pub yoy: Option<f64>,

    /// None for aggregates and for entities without a value
    pub rank: Option<RankPosition>,

    /// Value was divided by a member count
    pub is_aggregate: bool,

    /// EU aggregate divided by its member count
    pub eu_average: Option<f64>,

    /// value - eu_average (countries / regions only)
    pub diff_vs_eu: Option<f64>,

    pub flags: Vec<ObservationFlag>,

    pub strategy: Option<MatchStrategy>,
}

/// Summary for (entity, year, sector).
///
/// None when the identifier is neither in the catalog nor in the records.
pub fn summarize(
    matcher: &RecordMatcher,
    records: &[Observation],
    identifier: &str,
    year: i32,
    sector: Sector,
) -> Option<EntitySummary> {
    let locale = matcher.locale;
    let current = matcher.find_observation(records, identifier, year, sector);
    let entity = current
        .as_ref()
        .and_then(|m| matcher.resolve_record(m.observation))
        .or_else(|| matcher.catalog().resolve(identifier));

    if current.is_none() && entity.is_none() {
        return None;
    }

    let name = match (entity, &current) {
        (Some(e), _) => e.name(locale).to_string(),
        (None, Some(m)) => m.observation.name_for(locale).to_string(),
        (None, None) => identifier.trim().to_string(),
    };

    let value = current.as_ref().and_then(|m| m.value);
    let previous = matcher.find_value(records, identifier, year - 1, sector);
    let is_aggregate = current.as_ref().is_some_and(|m| m.is_aggregate())
        || entity.is_some_and(|e| e.is_supranational());

    let rank = match (&current, value, is_aggregate) {
        (Some(m), Some(_), false) => {
            let key = matcher.record_key(m.observation);
            country_ranking(matcher, records, year, sector)
                .into_iter()
                .find(|r| r.key == key)
                .map(|r| r.position)
        }
        _ => None,
    };

    let eu_average = matcher.find_value(records, EU_CODE, year, sector);
    let diff_vs_eu = match (value, eu_average, is_aggregate) {
        (Some(v), Some(eu), false) => Some(v - eu),
        _ => None,
    };

    Some(EntitySummary {
        code: entity.map(|e| e.code.to_string()),
        name,
        flag_url: entity.and_then(|e| e.flag_url.clone()),
        year,
        sector,
        value,
        previous,
        yoy: value.and_then(|v| yoy_change(v, previous)),
        rank,
        is_aggregate,
        eu_average,
        diff_vs_eu,
        flags: current
            .as_ref()
            .map(|m| m.observation.status.flags.clone())
            .unwrap_or_default(),
        strategy: current.as_ref().map(|m| m.strategy),
    })
}

// ============================================================================
// SECTOR BREAKDOWN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorShare {
    pub sector: Sector,
    pub value: Option<f64>,

    /// Percentage of the total; None when either side is missing or total is 0
    pub share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorBreakdown {
    pub total: Option<f64>,
    pub sectors: Vec<SectorShare>,
}

/// Per-sector values of one entity for a year
pub fn sector_breakdown(
    matcher: &RecordMatcher,
    records: &[Observation],
    identifier: &str,
    year: i32,
) -> SectorBreakdown {
    let total = matcher.find_value(records, identifier, year, Sector::Total);

    let sectors = Sector::ALL
        .iter()
        .filter(|s| **s != Sector::Total)
        .map(|&sector| {
            let value = matcher.find_value(records, identifier, year, sector);
            let share = match (value, total) {
                (Some(v), Some(t)) => share_of_total(v, t),
                _ => None,
            };
            SectorShare { sector, value, share }
        })
        .collect();

    SectorBreakdown { total, sectors }
}

// ============================================================================
// COUNTRY RANKING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    /// Canonical code, or normalized name for unknown entities
    pub key: String,
    pub name: String,
    pub flag_url: Option<String>,
    pub value: f64,
    pub position: RankPosition,
}

/// Rank every non-aggregate entity present in (year, sector).
///
/// Rows are grouped per entity; duplicates resolve with the matcher's policy.
pub fn country_ranking(
    matcher: &RecordMatcher,
    records: &[Observation],
    year: i32,
    sector: Sector,
) -> Vec<RankedEntity> {
    let locale = matcher.locale;

    // key → candidate row indices, in file order
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for (idx, obs) in records.iter().enumerate() {
        if obs.year != year || !obs.matches_sector(sector) {
            continue;
        }
        let key = matcher.record_key(obs);
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(idx);
    }

    let mut entries = Vec::new();
    let mut supranational: HashSet<String> = HashSet::new();
    let mut flags: HashMap<String, Option<String>> = HashMap::new();

    for key in order {
        let candidates = &groups[&key];
        let Some(picked) = matcher.pick(records, candidates) else {
            continue;
        };
        let obs = &records[picked];
        let Some(value) = matcher.value_of(obs) else {
            continue;
        };

        let entity = matcher.resolve_record(obs);
        let is_aggregate = entity.is_some_and(|e| e.is_supranational())
            || obs.names().any(|n| matcher.catalog().is_supranational(n));
        if is_aggregate {
            supranational.insert(key.clone());
        }

        let name = entity
            .map(|e| e.name(locale).to_string())
            .unwrap_or_else(|| obs.name_for(locale).to_string());
        flags.insert(key.clone(), entity.and_then(|e| e.flag_url.clone()));
        entries.push(RankEntry::new(&key, value).with_name(&name));
    }

    ranked_order(&entries, |e| supranational.contains(&e.id))
        .into_iter()
        .map(|(entry, position)| RankedEntity {
            key: entry.id.clone(),
            name: entry.name.clone(),
            flag_url: flags.get(&entry.id).cloned().flatten(),
            value: entry.value,
            position,
        })
        .collect()
}

// ============================================================================
// TOOLTIP
// ============================================================================

/// Lines of a chart tooltip, localized
pub fn tooltip_lines(summary: &EntitySummary, locale: Locale) -> Vec<String> {
    let (value_label, yoy_label, rank_label, eu_label, diff_label, notes_label) = match locale {
        Locale::Es => (
            "Valor",
            "Variación interanual",
            "Posición",
            "Media UE por país",
            "Diferencia vs. UE",
            "Notas",
        ),
        Locale::En => (
            "Value",
            "Year-over-year",
            "Rank",
            "EU per-country average",
            "Difference vs. EU",
            "Notes",
        ),
    };

    let mut lines = vec![
        format!("{} ({}, {})", summary.name, summary.year, summary.sector.name(locale)),
        format!("{}: {}", value_label, format_optional(summary.value, 2, locale)),
        format!("{}: {}", yoy_label, format_percent_change(summary.yoy, locale)),
    ];

    if let Some(position) = summary.rank {
        lines.push(format!("{}: {} / {}", rank_label, position.rank, position.total));
    }

    if let Some(eu) = summary.eu_average.filter(|_| !summary.is_aggregate) {
        lines.push(format!("{}: {}", eu_label, format_decimal(eu, 2, locale)));
        if let Some(diff) = summary.diff_vs_eu {
            let sign = if diff > 0.0 { "+" } else { "" };
            lines.push(format!("{}: {}{}", diff_label, sign, format_decimal(diff, 2, locale)));
        }
    }

    if !summary.flags.is_empty() {
        let notes: Vec<&str> = summary.flags.iter().map(|f| f.description(locale)).collect();
        lines.push(format!("{}: {}", notes_label, notes.join(", ")));
    }

    lines
}

// ============================================================================
// TESTS
// ============================================================================
