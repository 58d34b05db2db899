// 🔤 Text Normalizer - basis of every name comparison
//
// "España", "ESPAÑA" and "Espana" are the same entity name.
// Two names are equal iff their normalized forms are equal.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Combining diacritical marks block (U+0300 – U+036F)
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Normalize text for matching.
///
/// - Lowercase
/// - Unicode canonical decomposition (NFD)
/// - Strip combining diacritical marks
///
/// Total: never panics, empty input gives `""`.
///
/// ```
/// use canarias_rd::normalize::normalize_text;
///
/// assert_eq!(normalize_text("España"), "espana");
/// assert_eq!(normalize_text("Unión Europea"), "union europea");
/// ```
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Same as [`normalize_text`] for values that may be absent.
pub fn normalize_opt(text: Option<&str>) -> String {
    text.map(normalize_text).unwrap_or_default()
}

/// Containment in either direction, over already-normalized strings.
///
/// Both sides must be at least `min_len` chars, otherwise short fragments
/// ("ire", "es") would match unrelated names.
pub fn contains_either(a: &str, b: &str, min_len: usize) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.chars().count() < min_len || b.chars().count() < min_len {
        return false;
    }
    a.contains(b) || b.contains(a)
}

/// How to read a lone separator ("157.000", "1,44")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberHint {
    /// Ratios and percentages: a lone separator is the decimal point
    #[default]
    Fractional,

    /// Headcounts and application counts: a lone separator followed by
    /// exactly three digits is thousands grouping ("157.000" → 157000)
    Count,
}

/// Parse a locale-formatted decimal ("1,44", "1.44", "1.234,5", "2 345,6").
///
/// Rules:
/// - Empty, ":" (Eurostat "not available") or non-numeric ⇒ `None`
/// - Both separators present ⇒ the last one is the decimal separator
/// - A single separator kind appearing once ⇒ decimal separator
/// - A single separator kind appearing more than once ⇒ thousands grouping
/// - Trailing "%" is ignored
///
/// Never returns NaN or infinity.
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    parse_number_with(raw, NumberHint::Fractional)
}

/// [`parse_locale_number`], reading a lone separator per `hint`
pub fn parse_number_with(raw: &str, hint: NumberHint) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();

    if cleaned.is_empty() || cleaned == ":" {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    let canonical = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            if comma > dot {
                // 1.234,5
                cleaned.replace('.', "").replace(',', ".")
            } else {
                // 1,234.5
                cleaned.replace(',', "")
            }
        }
        (None, Some(comma)) => {
            if cleaned.matches(',').count() > 1 || is_grouping(&cleaned, comma, hint) {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        (Some(dot), None) => {
            if cleaned.matches('.').count() > 1 || is_grouping(&cleaned, dot, hint) {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        (None, None) => cleaned,
    };

    canonical
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// "157.000" under [`NumberHint::Count`]: three digits after the separator
fn is_grouping(cleaned: &str, separator: usize, hint: NumberHint) -> bool {
    if hint != NumberHint::Count {
        return false;
    }
    let (head, tail) = (&cleaned[..separator], &cleaned[separator + 1..]);
    let head_digits = head.trim_start_matches('-');
    tail.len() == 3
        && tail.chars().all(|c| c.is_ascii_digit())
        && !head_digits.is_empty()
        && head_digits != "0"
        && head_digits.chars().all(|c| c.is_ascii_digit())
}

// ============================================================================
// TESTS
// ============================================================================
