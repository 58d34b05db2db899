// Entity Models - countries, supranational blocs, autonomous communities
//
// Each entity has:
// - Stable identity (canonical code) that NEVER changes
// - Display names per locale + every dataset spelling ever observed
// - A catalog for normalization and lookups
//
// Entities are compiled-in data: built once, never mutated.

pub mod catalog;
pub mod country;
pub mod region;

pub use catalog::EntityCatalog;

use crate::locale::Locale;
use crate::normalize::normalize_text;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ENTITY CODE
// ============================================================================

/// Canonical entity code: ISO 3166-1 alpha-2 for countries ("ES"),
/// NUTS-2 for autonomous communities ("ES70"), mnemonic for blocs ("EU", "EA").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityCode(String);

impl EntityCode {
    pub fn new(code: impl Into<String>) -> Self {
        EntityCode(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityCode {
    fn from(s: &str) -> Self {
        EntityCode::new(s)
    }
}

// ============================================================================
// ENTITY KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Sovereign country
    Country,

    /// Aggregate of countries (EU, Euro area, OECD)
    Supranational,

    /// Spanish autonomous community / autonomous city
    Region,
}

// ============================================================================
// ENTITY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub code: EntityCode,
    pub kind: EntityKind,

    /// Spanish names, first one is the display name
    pub names_es: Vec<String>,

    /// English names, first one is the display name
    pub names_en: Vec<String>,

    /// Literal spellings seen in datasets (historic names included)
    pub names_dataset: Vec<String>,

    pub iso2: Option<String>,
    pub iso3: Option<String>,

    /// Other codes datasets use for this entity ("EL" for Greece, "EU27_2020")
    pub alt_codes: Vec<String>,

    pub flag_url: Option<String>,
}

impl Entity {
    pub fn new(code: &str, kind: EntityKind, name_es: &str, name_en: &str) -> Self {
        Entity {
            code: EntityCode::new(code),
            kind,
            names_es: vec![name_es.to_string()],
            names_en: vec![name_en.to_string()],
            names_dataset: Vec::new(),
            iso2: None,
            iso3: None,
            alt_codes: Vec::new(),
            flag_url: None,
        }
    }

    /// Builder: ISO codes, flag asset derived from alpha-2
    pub fn with_iso(mut self, iso2: &str, iso3: &str) -> Self {
        self.iso2 = Some(iso2.to_string());
        self.iso3 = Some(iso3.to_string());
        self.flag_url = Some(flag_asset(iso2));
        self
    }

    pub fn with_flag(mut self, flag_url: &str) -> Self {
        self.flag_url = Some(flag_url.to_string());
        self
    }

    /// Builder: extra Spanish aliases
    pub fn es(mut self, aliases: &[&str]) -> Self {
        push_unique(&mut self.names_es, aliases);
        self
    }

    /// Builder: extra English aliases
    pub fn en(mut self, aliases: &[&str]) -> Self {
        push_unique(&mut self.names_en, aliases);
        self
    }

    /// Builder: dataset-literal spellings
    pub fn dataset(mut self, aliases: &[&str]) -> Self {
        push_unique(&mut self.names_dataset, aliases);
        self
    }

    pub fn codes(mut self, codes: &[&str]) -> Self {
        push_unique(&mut self.alt_codes, codes);
        self
    }

    pub fn is_supranational(&self) -> bool {
        self.kind == EntityKind::Supranational
    }

    /// Display name for a locale
    pub fn name(&self, locale: Locale) -> &str {
        let names = match locale {
            Locale::Es => &self.names_es,
            Locale::En => &self.names_en,
        };
        names
            .first()
            .or_else(|| self.names_dataset.first())
            .map(String::as_str)
            .unwrap_or_else(|| self.code.as_str())
    }

    /// All aliases: es, en, dataset (in that order)
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.names_es
            .iter()
            .chain(self.names_en.iter())
            .chain(self.names_dataset.iter())
            .map(String::as_str)
    }

    /// Exact normalized alias match
    pub fn has_alias(&self, normalized_name: &str) -> bool {
        !normalized_name.is_empty()
            && self.aliases().any(|alias| normalize_text(alias) == normalized_name)
    }

    /// Canonical code, ISO codes and dataset codes (case-insensitive)
    pub fn has_code(&self, code: &str) -> bool {
        let code = code.trim();
        if code.is_empty() {
            return false;
        }
        self.code.as_str().eq_ignore_ascii_case(code)
            || self.iso2.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(code))
            || self.iso3.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(code))
            || self.alt_codes.iter().any(|c| c.eq_ignore_ascii_case(code))
    }
}

fn push_unique(target: &mut Vec<String>, items: &[&str]) {
    for item in items {
        if !target.iter().any(|existing| existing == item) {
            target.push(item.to_string());
        }
    }
}

/// Flag asset for an ISO 3166-1 alpha-2 code
pub fn flag_asset(iso2: &str) -> String {
    format!("https://flagcdn.com/{}.svg", iso2.to_lowercase())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_builder() {
        let entity = Entity::new("CZ", EntityKind::Country, "Chequia", "Czechia")
            .with_iso("CZ", "CZE")
            .en(&["Czech Republic", "Czechia"])
            .dataset(&["Czechia", "Czech Republic"]);

        assert_eq!(entity.names_en, vec!["Czechia", "Czech Republic"]);
        assert_eq!(entity.name(Locale::Es), "Chequia");
        assert_eq!(entity.flag_url.as_deref(), Some("https://flagcdn.com/cz.svg"));
        assert!(entity.has_alias("czech republic"));
        assert!(!entity.has_alias(""));
    }

    #[test]
    fn test_entity_codes_case_insensitive() {
        let entity = Entity::new("GR", EntityKind::Country, "Grecia", "Greece")
            .with_iso("GR", "GRC")
            .codes(&["EL"]);

        assert!(entity.has_code("gr"));
        assert!(entity.has_code("GRC"));
        assert!(entity.has_code("el"));
        assert!(!entity.has_code(""));
        assert!(!entity.has_code("ES"));
    }

    #[test]
    fn test_entity_code_normalizes() {
        assert_eq!(EntityCode::new(" es70 ").as_str(), "ES70");
        assert_eq!(EntityCode::from("ea"), EntityCode::new("EA"));
    }
}
