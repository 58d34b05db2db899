// 🌐 Locale - Spanish / English display conventions
//
// es: 1.234,56   en: 1,234.56

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown locale: {0} (expected 'es' or 'en')")]
pub struct ParseLocaleError(pub String);

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
        }
    }

    /// The other locale (language toggle)
    pub fn toggle(&self) -> Locale {
        match self {
            Locale::Es => Locale::En,
            Locale::En => Locale::Es,
        }
    }

    fn decimal_separator(&self) -> char {
        match self {
            Locale::Es => ',',
            Locale::En => '.',
        }
    }

    fn thousands_separator(&self) -> char {
        match self {
            Locale::Es => '.',
            Locale::En => ',',
        }
    }

    /// Label rendered in place of a missing value
    pub fn no_data(&self) -> &'static str {
        match self {
            Locale::Es => "n/d",
            Locale::En => "n/a",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = ParseLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "es" | "es-es" | "spanish" | "espanol" | "español" => Ok(Locale::Es),
            "en" | "en-gb" | "en-us" | "english" | "ingles" | "inglés" => Ok(Locale::En),
            other => Err(ParseLocaleError(other.to_string())),
        }
    }
}

/// Format a number with the locale's separators.
///
/// Non-finite input renders as the "no data" label.
pub fn format_decimal(value: f64, decimals: usize, locale: Locale) -> String {
    if !value.is_finite() {
        return locale.no_data().to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (fixed.clone(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    let digits: Vec<char> = int_part.chars().collect();
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(locale.thousands_separator());
        }
        grouped.push(*digit);
    }

    // "-0,00" is noise
    let is_negative = value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.');

    let mut out = String::new();
    if is_negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push(locale.decimal_separator());
        out.push_str(&frac);
    }
    out
}

/// Optional value, "n/d" / "n/a" when absent
pub fn format_optional(value: Option<f64>, decimals: usize, locale: Locale) -> String {
    match value {
        Some(v) => format_decimal(v, decimals, locale),
        None => locale.no_data().to_string(),
    }
}

/// Signed percentage change: "+2,86 %" (es) / "+2.86%" (en)
pub fn format_percent_change(change: Option<f64>, locale: Locale) -> String {
    let Some(change) = change.filter(|c| c.is_finite()) else {
        return locale.no_data().to_string();
    };

    let sign = if change > 0.0 { "+" } else { "" };
    let body = format_decimal(change, 2, locale);
    match locale {
        Locale::Es => format!("{}{} %", sign, body),
        Locale::En => format!("{}{}%", sign, body),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_from_str() {
        assert_eq!("es".parse::<Locale>(), Ok(Locale::Es));
        assert_eq!("EN".parse::<Locale>(), Ok(Locale::En));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_format_decimal_es_en() {
        assert_eq!(format_decimal(1.44, 2, Locale::Es), "1,44");
        assert_eq!(format_decimal(1.44, 2, Locale::En), "1.44");
        assert_eq!(format_decimal(1234567.891, 2, Locale::Es), "1.234.567,89");
        assert_eq!(format_decimal(1234567.891, 2, Locale::En), "1,234,567.89");
        assert_eq!(format_decimal(-1234.5, 1, Locale::Es), "-1.234,5");
        assert_eq!(format_decimal(999.0, 0, Locale::En), "999");
    }

    #[test]
    fn test_format_decimal_never_renders_nan() {
        assert_eq!(format_decimal(f64::NAN, 2, Locale::Es), "n/d");
        assert_eq!(format_decimal(f64::INFINITY, 2, Locale::En), "n/a");
        assert_eq!(format_decimal(-0.001, 2, Locale::En), "0.00");
    }

    #[test]
    fn test_format_percent_change() {
        assert_eq!(format_percent_change(Some(2.857), Locale::Es), "+2,86 %");
        assert_eq!(format_percent_change(Some(-10.0), Locale::En), "-10.00%");
        assert_eq!(format_percent_change(None, Locale::Es), "n/d");
        assert_eq!(format_percent_change(Some(f64::NAN), Locale::En), "n/a");
    }
}
