// 📈 Metric Derivation - pure functions over resolved values
//
// Every function returns None instead of NaN / Infinity.

use crate::normalize::normalize_text;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// EU member count. Every EU vintage is normalized to it.
pub const EU_MEMBERS: u32 = 27;

/// Euro area member count, 2015-2022 vintage
pub const EURO_AREA_2015_MEMBERS: u32 = 19;

/// Euro area member count, from 2023
pub const EURO_AREA_2023_MEMBERS: u32 = 20;

/// Label tokens of rows that already hold a per-member value
const AVERAGE_MARKERS: &[&str] = &["average", "avg", "promedio", "media", "mean"];

// ============================================================================
// YEAR-OVER-YEAR / SHARES / AVERAGES
// ============================================================================

/// Percent change versus the previous value.
///
/// None when there is no previous value or it is zero.
pub fn yoy_change(current: f64, previous: Option<f64>) -> Option<f64> {
    let previous = previous?;
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

/// Sector value as a percentage of the total. None when total is zero.
pub fn share_of_total(sector_value: f64, total_value: f64) -> Option<f64> {
    if total_value == 0.0 || !total_value.is_finite() || !sector_value.is_finite() {
        return None;
    }
    Some(sector_value / total_value * 100.0)
}

/// Aggregate divided by a fixed member count. None when the count is zero.
pub fn per_member_average(aggregate_value: f64, member_count: u32) -> Option<f64> {
    if member_count == 0 || !aggregate_value.is_finite() {
        return None;
    }
    Some(aggregate_value / member_count as f64)
}

/// Fixed member count for an aggregate row, from its label and/or code.
///
/// - European Union → 27, whatever vintage the label names
/// - Euro area → 20 for the 2023 vintage, 19 for the 2015 vintage,
///   20 when the label names no vintage
/// - Rows already labelled as an average ("EU27 average", "Promedio UE")
///   → None
/// - Anything else → None
///
/// Never derived from counting rows.
pub fn aggregate_member_count(label: &str) -> Option<u32> {
    let normalized = normalize_text(label);
    let tokens: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let has_token = |wanted: &[&str]| tokens.iter().any(|t| wanted.contains(t));

    if has_token(AVERAGE_MARKERS) {
        return None;
    }

    let is_euro_area = ["euro area", "zona euro", "zona del euro", "eurozone", "euro zone", "eurozona"]
        .iter()
        .any(|m| normalized.contains(m))
        || has_token(&["ea", "ea19", "ea20"]);

    if is_euro_area {
        if normalized.contains("2023") || normalized.contains("20 countries")
            || normalized.contains("20 paises") || has_token(&["ea20"])
        {
            return Some(EURO_AREA_2023_MEMBERS);
        }
        if normalized.contains("2015") || normalized.contains("19 countries")
            || normalized.contains("19 paises") || has_token(&["ea19"])
        {
            return Some(EURO_AREA_2015_MEMBERS);
        }
        return Some(EURO_AREA_2023_MEMBERS);
    }

    let is_eu = normalized.contains("european union")
        || normalized.contains("union europea")
        || has_token(&["eu", "ue", "eu27", "eu28", "ue27", "ue28"]);

    if is_eu {
        return Some(EU_MEMBERS);
    }

    None
}

// ============================================================================
// RANKING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub id: String,

    /// Display name, used for tie-breaking
    pub name: String,

    pub value: f64,
}

impl RankEntry {
    /// Entry whose display name is its id
    pub fn new(id: &str, value: f64) -> Self {
        RankEntry {
            id: id.to_string(),
            name: id.to_string(),
            value,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

/// 1-based position among `total` ranked entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankPosition {
    pub rank: usize,
    pub total: usize,
}

/// Rank entries by value, descending.
///
/// - Entries matching `exclude` (e.g. supranational aggregates) get no rank
///   and do not count towards `total`
/// - Entries with a non-finite value are skipped the same way
/// - Ties break by ascending normalized display name, then by id, so the
///   result is identical on every call
pub fn rank<F>(entries: &[RankEntry], exclude: F) -> HashMap<String, RankPosition>
where
    F: Fn(&RankEntry) -> bool,
{
    ranked_order(entries, exclude)
        .into_iter()
        .map(|(entry, position)| (entry.id.clone(), position))
        .collect()
}

/// Same as [`rank`] but returns the entries in rank order
pub fn ranked_order<F>(entries: &[RankEntry], exclude: F) -> Vec<(&RankEntry, RankPosition)>
where
    F: Fn(&RankEntry) -> bool,
{
    let mut eligible: Vec<(&RankEntry, String)> = entries
        .iter()
        .filter(|e| e.value.is_finite() && !exclude(e))
        .map(|e| (e, normalize_text(&e.name)))
        .collect();

    eligible.sort_by(|(a, a_name), (b, b_name)| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a_name.cmp(b_name))
            .then_with(|| a.id.cmp(&b.id))
    });

    let total = eligible.len();
    eligible
        .into_iter()
        .enumerate()
        .map(|(idx, (entry, _))| (entry, RankPosition { rank: idx + 1, total }))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_yoy_null_safety() {
        for x in [0.0, 1.0, -3.5, 1e9] {
            assert_eq!(yoy_change(x, None), None);
            assert_eq!(yoy_change(x, Some(0.0)), None);
        }
    }

    #[test]
    fn test_yoy_correctness() {
        assert!(approx(yoy_change(110.0, Some(100.0)).unwrap(), 10.0));
        assert!(approx(yoy_change(90.0, Some(100.0)).unwrap(), -10.0));
        assert!(approx(yoy_change(1.44, Some(1.40)).unwrap(), 2.857142857142857));
    }

    #[test]
    fn test_yoy_never_nan() {
        assert_eq!(yoy_change(f64::NAN, Some(1.0)), None);
        assert_eq!(yoy_change(1.0, Some(f64::INFINITY)), None);
    }

    #[test]
    fn test_share_of_total() {
        assert!(approx(share_of_total(0.8, 1.6).unwrap(), 50.0));
        assert_eq!(share_of_total(0.8, 0.0), None);
    }

    #[test]
    fn test_per_member_average() {
        assert!((per_member_average(59.4, EU_MEMBERS).unwrap() - 2.2).abs() < 1e-9);
        assert_eq!(per_member_average(10.0, 0), None);
    }

    #[test]
    fn test_aggregate_member_count_vintages() {
        assert_eq!(aggregate_member_count("European Union - 27 countries (from 2020)"), Some(27));
        assert_eq!(aggregate_member_count("Unión Europea"), Some(27));
        assert_eq!(aggregate_member_count("EU27_2020"), Some(27));
        assert_eq!(aggregate_member_count("European Union - 28 countries (2013-2020)"), Some(27));
        assert_eq!(aggregate_member_count("European Union - 15 countries (1995-2004)"), Some(27));
        assert_eq!(aggregate_member_count("EU28"), Some(27));

        assert_eq!(aggregate_member_count("Euro area – 20 countries (from 2023)"), Some(20));
        assert_eq!(aggregate_member_count("Euro area - 19 countries  (2015-2022)"), Some(19));
        assert_eq!(aggregate_member_count("EA19"), Some(19));
        assert_eq!(aggregate_member_count("Zona del euro"), Some(20));

        assert_eq!(aggregate_member_count("Spain"), None);
        assert_eq!(aggregate_member_count("OECD"), None);
        // "eu" as a token, not as a substring
        assert_eq!(aggregate_member_count("Europe"), None);
    }

    #[test]
    fn test_average_rows_are_not_divided_again() {
        assert_eq!(aggregate_member_count("EU27 average"), None);
        assert_eq!(aggregate_member_count("Promedio UE"), None);
        assert_eq!(aggregate_member_count("Media UE-27"), None);
        assert_eq!(aggregate_member_count("Euro area average"), None);
    }

    #[test]
    fn test_rank_tie_break_is_deterministic() {
        let entries = vec![RankEntry::new("Germany", 2.5), RankEntry::new("France", 2.5)];

        let first = rank(&entries, |_| false);
        for _ in 0..10 {
            assert_eq!(rank(&entries, |_| false), first);
        }
        assert_eq!(first["France"], RankPosition { rank: 1, total: 2 });
        assert_eq!(first["Germany"], RankPosition { rank: 2, total: 2 });

        // Input order does not matter
        let reversed = vec![RankEntry::new("France", 2.5), RankEntry::new("Germany", 2.5)];
        assert_eq!(rank(&reversed, |_| false), first);
    }

    #[test]
    fn test_rank_tie_break_uses_normalized_name() {
        let entries = vec![
            RankEntry::new("b", 1.0).with_name("Österreich"),
            RankEntry::new("a", 1.0).with_name("Portugal"),
        ];
        let ranks = rank(&entries, |_| false);
        // "osterreich" < "portugal"
        assert_eq!(ranks["b"].rank, 1);
        assert_eq!(ranks["a"].rank, 2);
    }

    #[test]
    fn test_rank_excludes_supranational() {
        let entries = vec![
            RankEntry::new("European Union", 2.2),
            RankEntry::new("Germany", 3.1),
            RankEntry::new("Spain", 1.4),
            RankEntry::new("Portugal", 1.7),
        ];
        let ranks = rank(&entries, |e| e.id == "European Union");

        assert!(!ranks.contains_key("European Union"));
        assert_eq!(ranks["Germany"], RankPosition { rank: 1, total: 3 });
        assert_eq!(ranks["Portugal"], RankPosition { rank: 2, total: 3 });
        assert_eq!(ranks["Spain"], RankPosition { rank: 3, total: 3 });
    }

    #[test]
    fn test_rank_skips_non_finite() {
        let entries = vec![RankEntry::new("A", f64::NAN), RankEntry::new("B", 1.0)];
        let ranks = rank(&entries, |_| false);
        assert!(!ranks.contains_key("A"));
        assert_eq!(ranks["B"], RankPosition { rank: 1, total: 1 });
    }
}
