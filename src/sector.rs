// 🏭 Sector - R&D performing sector breakdown
//
// One closed enum instead of per-dataset label maps.
// "All Sectors", "Total", "All" and "Todos los sectores" are one class.

use crate::normalize::normalize_text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::locale::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sector {
    /// All sectors combined
    Total,

    /// Business enterprise sector
    Business,

    /// Government sector
    Government,

    /// Higher education sector
    Education,

    /// Private non-profit sector
    NonProfit,
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown sector label: {0}")]
pub struct ParseSectorError(pub String);

/// Label used by datasets that have no sector column
pub const ALL_SECTORS_LABEL: &str = "All Sectors";

impl Sector {
    pub const ALL: [Sector; 5] = [
        Sector::Total,
        Sector::Business,
        Sector::Government,
        Sector::Education,
        Sector::NonProfit,
    ];

    /// Short identifier (config files, CLI args)
    pub fn id(&self) -> &'static str {
        match self {
            Sector::Total => "total",
            Sector::Business => "business",
            Sector::Government => "government",
            Sector::Education => "education",
            Sector::NonProfit => "nonprofit",
        }
    }

    /// Every label (already normalized) that denotes this sector in source data
    fn labels(&self) -> &'static [&'static str] {
        match self {
            Sector::Total => &["total", "all", "all sectors", "todos los sectores", "total sectores"],
            Sector::Business => &[
                "business",
                "business enterprise",
                "business enterprise sector",
                "empresas",
                "sector empresarial",
            ],
            Sector::Government => &[
                "government",
                "government sector",
                "administracion publica",
                "administraciones publicas",
                "gobierno",
            ],
            Sector::Education => &[
                "education",
                "higher education",
                "higher education sector",
                "ensenanza superior",
                "educacion superior",
                "universidades",
            ],
            Sector::NonProfit => &[
                "nonprofit",
                "non-profit",
                "private non-profit",
                "private non-profit sector",
                "ipsfl",
                "instituciones privadas sin fines de lucro",
                "sin fines de lucro",
            ],
        }
    }

    /// Resolve a dataset label to a sector
    pub fn from_label(label: &str) -> Option<Sector> {
        let normalized = normalize_text(label.trim());
        Sector::ALL
            .into_iter()
            .find(|sector| sector.labels().contains(&normalized.as_str()))
    }

    /// Does this dataset label denote this sector?
    pub fn matches_label(&self, label: &str) -> bool {
        Sector::from_label(label) == Some(*self)
    }

    /// Display name
    pub fn name(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Sector::Total, Locale::Es) => "Todos los sectores",
            (Sector::Total, Locale::En) => "All sectors",
            (Sector::Business, Locale::Es) => "Empresas",
            (Sector::Business, Locale::En) => "Business enterprise",
            (Sector::Government, Locale::Es) => "Administración Pública",
            (Sector::Government, Locale::En) => "Government",
            (Sector::Education, Locale::Es) => "Enseñanza superior",
            (Sector::Education, Locale::En) => "Higher education",
            (Sector::NonProfit, Locale::Es) => "IPSFL",
            (Sector::NonProfit, Locale::En) => "Private non-profit",
        }
    }

    /// Next sector in selector order (wraps)
    pub fn next(&self) -> Sector {
        let idx = Sector::ALL.iter().position(|s| s == self).unwrap_or(0);
        Sector::ALL[(idx + 1) % Sector::ALL.len()]
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Sector {
    type Err = ParseSectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sector::from_label(s).ok_or_else(|| ParseSectorError(s.to_string()))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_sectors_equivalence_class() {
        for label in ["All Sectors", "total", "TOTAL", "all", "all sectors", "Todos los sectores"] {
            assert!(Sector::Total.matches_label(label), "{} should be total", label);
        }
        assert!(!Sector::Business.matches_label("All Sectors"));
    }

    #[test]
    fn test_other_sectors_match_only_their_labels() {
        assert!(Sector::Business.matches_label("Business enterprise sector"));
        assert!(Sector::Government.matches_label("Administración Pública"));
        assert!(Sector::Education.matches_label("Enseñanza Superior"));
        assert!(Sector::NonProfit.matches_label("Private non-profit sector"));

        assert!(!Sector::Business.matches_label("Government sector"));
        assert!(!Sector::Education.matches_label("total"));
        assert!(!Sector::Total.matches_label("Business enterprise sector"));
    }

    #[test]
    fn test_unknown_label() {
        assert_eq!(Sector::from_label("agriculture"), None);
        assert!("agriculture".parse::<Sector>().is_err());
        assert_eq!("nonprofit".parse::<Sector>(), Ok(Sector::NonProfit));
    }

    #[test]
    fn test_ids_roundtrip_through_labels() {
        for sector in Sector::ALL {
            assert_eq!(Sector::from_label(sector.id()), Some(sector));
        }
    }

    #[test]
    fn test_next_wraps() {
        assert_eq!(Sector::Total.next(), Sector::Business);
        assert_eq!(Sector::NonProfit.next(), Sector::Total);
    }
}
