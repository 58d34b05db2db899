// 📚 Entity Catalog - one registry for every country / bloc / region
//
// Replaces the per-chart name-to-code tables with a single immutable catalog,
// shared as `Arc<EntityCatalog>` by every consumer.

use super::country::default_countries;
use super::region::default_regions;
use super::{Entity, EntityCode, EntityKind};
use crate::locale::Locale;
use crate::normalize::normalize_text;
use std::collections::HashMap;
use tracing::debug;

/// Textual markers of aggregate rows not present in the catalog
/// (new vintages, "OECD average", "Promedio UE"...). Already normalized.
pub const SUPRANATIONAL_MARKERS: &[&str] = &[
    "european union",
    "union europea",
    "euro area",
    "zona euro",
    "oecd",
    "ocde",
    "average",
    "promedio",
];

/// Registry of all known entities
///
/// Built once at startup; lookups never mutate it.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    entities: Vec<Entity>,

    /// Canonical code → index into `entities`
    by_code: HashMap<EntityCode, usize>,
}

impl EntityCatalog {
    /// Create new empty catalog
    pub fn new() -> Self {
        EntityCatalog::default()
    }

    /// Catalog with countries, supranational blocs and autonomous communities
    pub fn with_defaults() -> Self {
        let mut catalog = EntityCatalog::new();
        for entity in default_countries().into_iter().chain(default_regions()) {
            catalog.register(entity);
        }
        catalog
    }

    /// Register an entity. A second entity with the same canonical code
    /// replaces the first one.
    pub fn register(&mut self, entity: Entity) {
        match self.by_code.get(&entity.code) {
            Some(&idx) => {
                debug!(code = %entity.code, "replacing catalog entry");
                self.entities[idx] = entity;
            }
            None => {
                self.by_code.insert(entity.code.clone(), self.entities.len());
                self.entities.push(entity);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in registration order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn by_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    /// Lookup by canonical code, then by ISO / dataset codes
    pub fn find_by_code(&self, code: &str) -> Option<&Entity> {
        let canonical = EntityCode::new(code);
        if let Some(&idx) = self.by_code.get(&canonical) {
            return self.entities.get(idx);
        }
        self.entities.iter().find(|e| e.has_code(code))
    }

    /// Resolve a name (any locale, any dataset spelling) to its canonical code.
    ///
    /// Exact normalized equality only: the first entity whose es / en /
    /// dataset aliases contain the name wins.
    pub fn resolve_code_from_name(&self, name: &str) -> Option<EntityCode> {
        self.find_by_name(name).map(|e| e.code.clone())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        let normalized = normalize_text(name.trim());
        if normalized.is_empty() {
            return None;
        }
        self.entities.iter().find(|e| e.has_alias(&normalized))
    }

    /// Code first, then name
    pub fn resolve(&self, identifier: &str) -> Option<&Entity> {
        self.find_by_code(identifier)
            .or_else(|| self.find_by_name(identifier))
    }

    /// First localized alias of a known code
    pub fn name_for_code(&self, code: &str, locale: Locale) -> Option<&str> {
        self.find_by_code(code).map(|e| e.name(locale))
    }

    pub fn flag_for_code(&self, code: &str) -> Option<&str> {
        self.find_by_code(code).and_then(|e| e.flag_url.as_deref())
    }

    /// Normalized aliases of a code (es, en, dataset)
    pub fn aliases_for(&self, code: &str) -> Vec<String> {
        self.find_by_code(code)
            .map(|e| e.aliases().map(normalize_text).collect())
            .unwrap_or_default()
    }

    /// Display name for anything: catalog name when resolvable, raw text otherwise
    pub fn display_name(&self, identifier: &str, locale: Locale) -> String {
        self.resolve(identifier)
            .map(|e| e.name(locale).to_string())
            .unwrap_or_else(|| identifier.trim().to_string())
    }

    /// Is this an aggregate (EU, Euro area, OECD...) rather than a country?
    ///
    /// True when the resolved entity is flagged supranational, or when the
    /// normalized text contains one of [`SUPRANATIONAL_MARKERS`].
    pub fn is_supranational(&self, identifier: &str) -> bool {
        if let Some(entity) = self.resolve(identifier) {
            if entity.is_supranational() {
                return true;
            }
        }

        let normalized = normalize_text(identifier);
        SUPRANATIONAL_MARKERS
            .iter()
            .any(|marker| normalized.contains(marker))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::country::{EURO_AREA_CODE, EU_CODE};
    use crate::entities::region::CANARIAS_CODE;

    #[test]
    fn test_every_alias_resolves_to_its_code() {
        let catalog = EntityCatalog::with_defaults();
        for entity in catalog.entities() {
            for alias in entity.aliases() {
                assert_eq!(
                    catalog.resolve_code_from_name(alias),
                    Some(entity.code.clone()),
                    "alias {:?} of {} resolved elsewhere",
                    alias,
                    entity.code
                );
            }
        }
    }

    #[test]
    fn test_resolve_is_accent_and_case_insensitive() {
        let catalog = EntityCatalog::with_defaults();
        assert_eq!(catalog.resolve_code_from_name("ESPANA"), Some(EntityCode::new("ES")));
        assert_eq!(catalog.resolve_code_from_name("españa"), Some(EntityCode::new("ES")));
        assert_eq!(
            catalog.resolve_code_from_name("Canary Islands"),
            Some(EntityCode::new(CANARIAS_CODE))
        );
        assert_eq!(catalog.resolve_code_from_name("Atlantis"), None);
        assert_eq!(catalog.resolve_code_from_name(""), None);
    }

    #[test]
    fn test_historic_names_resolve_to_same_code() {
        let catalog = EntityCatalog::with_defaults();
        assert_eq!(
            catalog.resolve_code_from_name("Czech Republic"),
            catalog.resolve_code_from_name("Czechia")
        );
        assert_eq!(
            catalog.resolve_code_from_name("Euro area - 19 countries  (2015-2022)"),
            Some(EntityCode::new(EURO_AREA_CODE))
        );
        assert_eq!(
            catalog.resolve_code_from_name("Euro area – 20 countries (from 2023)"),
            Some(EntityCode::new(EURO_AREA_CODE))
        );
    }

    #[test]
    fn test_no_substring_resolution() {
        let catalog = EntityCatalog::with_defaults();
        // Whole-string equality only
        assert_eq!(catalog.resolve_code_from_name("Ire"), None);
        assert_eq!(catalog.resolve_code_from_name("Northern Ireland"), None);
    }

    #[test]
    fn test_name_and_flag_for_code() {
        let catalog = EntityCatalog::with_defaults();
        assert_eq!(catalog.name_for_code("ES", Locale::Es), Some("España"));
        assert_eq!(catalog.name_for_code("es", Locale::En), Some("Spain"));
        assert_eq!(catalog.name_for_code("EL", Locale::Es), Some("Grecia"));
        assert_eq!(catalog.name_for_code("ES70", Locale::En), Some("Canary Islands"));
        assert_eq!(catalog.name_for_code("XX", Locale::En), None);

        assert_eq!(catalog.flag_for_code("DE"), Some("https://flagcdn.com/de.svg"));
        assert_eq!(catalog.flag_for_code(EU_CODE), Some("https://flagcdn.com/eu.svg"));
        assert_eq!(catalog.flag_for_code("ES70"), None);
    }

    #[test]
    fn test_is_supranational() {
        let catalog = EntityCatalog::with_defaults();
        assert!(catalog.is_supranational("EU"));
        assert!(catalog.is_supranational("European Union"));
        assert!(catalog.is_supranational("Zona del euro"));
        assert!(catalog.is_supranational("EA20"));
        assert!(catalog.is_supranational("OCDE"));

        // Not in the catalog, caught by markers
        assert!(catalog.is_supranational("European Union - 25 countries (2004-2006)"));
        assert!(catalog.is_supranational("Promedio CCAA"));
        assert!(catalog.is_supranational("OECD average"));

        assert!(!catalog.is_supranational("Spain"));
        assert!(!catalog.is_supranational("Canarias"));
        assert!(!catalog.is_supranational("Atlantis"));
    }

    #[test]
    fn test_register_replaces_same_code() {
        let mut catalog = EntityCatalog::new();
        catalog.register(Entity::new("XX", EntityKind::Country, "Equis", "Ex"));
        catalog.register(Entity::new("xx", EntityKind::Country, "Equis 2", "Ex 2"));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.name_for_code("XX", Locale::Es), Some("Equis 2"));
    }

    #[test]
    fn test_aliases_for_and_display_name() {
        let catalog = EntityCatalog::with_defaults();
        let aliases = catalog.aliases_for("ES");
        assert!(aliases.contains(&"espana".to_string()));
        assert!(aliases.contains(&"total nacional".to_string()));
        assert!(catalog.aliases_for("XX").is_empty());

        assert_eq!(catalog.display_name("Spain", Locale::Es), "España");
        assert_eq!(catalog.display_name(" Atlantis ", Locale::Es), "Atlantis");
    }

    #[test]
    fn test_by_kind() {
        let catalog = EntityCatalog::with_defaults();
        assert_eq!(catalog.by_kind(EntityKind::Region).count(), 19);
        assert_eq!(catalog.by_kind(EntityKind::Supranational).count(), 3);
    }
}
