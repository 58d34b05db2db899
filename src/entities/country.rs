// 🌍 Country + supranational bloc tables
//
// Problem solved:
// - "Czechia", "Czech Republic", "Chequia", "República Checa" → same entity "CZ"
// - "Euro area - 19 countries (2015-2022)" / "Euro area – 20 countries (from 2023)" → "EA"
// - Every historical dataset spelling is stored as an alias: renamed countries
//   resolve by exact match, never by fuzzy matching.

use super::{Entity, EntityKind};

/// Canonical code of the European Union aggregate
pub const EU_CODE: &str = "EU";

/// Canonical code of the Euro area aggregate
pub const EURO_AREA_CODE: &str = "EA";

/// Canonical code of the OECD aggregate
pub const OECD_CODE: &str = "OECD";

fn country(iso2: &str, iso3: &str, name_es: &str, name_en: &str) -> Entity {
    Entity::new(iso2, EntityKind::Country, name_es, name_en).with_iso(iso2, iso3)
}

/// Supranational aggregates
pub fn supranational_entities() -> Vec<Entity> {
    vec![
        Entity::new(EU_CODE, EntityKind::Supranational, "Unión Europea", "European Union")
            .with_flag("https://flagcdn.com/eu.svg")
            .es(&["UE", "UE-27", "UE27", "Unión Europea (27 países)"])
            .en(&["EU", "EU-27", "EU27"])
            .dataset(&[
                "European Union - 27 countries (from 2020)",
                "European Union - 28 countries (2013-2020)",
                "European Union - 27 countries (2007-2013)",
                "EU27_2020",
            ])
            .codes(&["EU27_2020", "EU28", "EU27_2007", "EU27"]),
        Entity::new(EURO_AREA_CODE, EntityKind::Supranational, "Zona del euro", "Euro area")
            .with_flag("https://flagcdn.com/eu.svg")
            .es(&["Zona euro", "Eurozona", "Zona del euro (20 países)", "Zona del euro (19 países)"])
            .en(&["Eurozone", "Euro zone"])
            .dataset(&[
                "Euro area – 20 countries (from 2023)",
                "Euro area - 20 countries (from 2023)",
                "Euro area - 19 countries  (2015-2022)",
                "Euro area - 19 countries (2015-2022)",
            ])
            .codes(&["EA20", "EA19"]),
        Entity::new(OECD_CODE, EntityKind::Supranational, "OCDE", "OECD")
            .es(&["Total OCDE", "Media OCDE"])
            .en(&["OECD - Total", "OECD Total", "OECD average"])
            .dataset(&["OECD countries"]),
    ]
}

/// EU-27 member states
pub fn eu_member_states() -> Vec<Entity> {
    vec![
        country("AT", "AUT", "Austria", "Austria"),
        country("BE", "BEL", "Bélgica", "Belgium"),
        country("BG", "BGR", "Bulgaria", "Bulgaria"),
        country("HR", "HRV", "Croacia", "Croatia"),
        country("CY", "CYP", "Chipre", "Cyprus"),
        country("CZ", "CZE", "Chequia", "Czechia")
            .es(&["República Checa"])
            .en(&["Czech Republic"]),
        country("DK", "DNK", "Dinamarca", "Denmark"),
        country("EE", "EST", "Estonia", "Estonia"),
        country("FI", "FIN", "Finlandia", "Finland"),
        country("FR", "FRA", "Francia", "France"),
        country("DE", "DEU", "Alemania", "Germany")
            .dataset(&[
                "Germany (until 1990 former territory of the FRG)",
                "Germany including former GDR",
            ]),
        country("GR", "GRC", "Grecia", "Greece").codes(&["EL"]),
        country("HU", "HUN", "Hungría", "Hungary"),
        country("IE", "IRL", "Irlanda", "Ireland"),
        country("IT", "ITA", "Italia", "Italy"),
        country("LV", "LVA", "Letonia", "Latvia"),
        country("LT", "LTU", "Lituania", "Lithuania"),
        country("LU", "LUX", "Luxemburgo", "Luxembourg"),
        country("MT", "MLT", "Malta", "Malta"),
        country("NL", "NLD", "Países Bajos", "Netherlands")
            .es(&["Holanda"])
            .en(&["The Netherlands"]),
        country("PL", "POL", "Polonia", "Poland"),
        country("PT", "PRT", "Portugal", "Portugal"),
        country("RO", "ROU", "Rumanía", "Romania").es(&["Rumania"]),
        country("SK", "SVK", "Eslovaquia", "Slovakia").en(&["Slovak Republic"]),
        country("SI", "SVN", "Eslovenia", "Slovenia"),
        country("ES", "ESP", "España", "Spain")
            .dataset(&["Total Nacional", "Total España"]),
        country("SE", "SWE", "Suecia", "Sweden"),
    ]
}

/// Non-EU countries present in the R&D datasets
pub fn other_countries() -> Vec<Entity> {
    vec![
        country("GB", "GBR", "Reino Unido", "United Kingdom")
            .codes(&["UK"])
            .en(&["UK", "Great Britain"]),
        country("NO", "NOR", "Noruega", "Norway"),
        country("CH", "CHE", "Suiza", "Switzerland"),
        country("IS", "ISL", "Islandia", "Iceland"),
        country("TR", "TUR", "Turquía", "Türkiye")
            .en(&["Turkey"])
            .es(&["Türkiye"]),
        country("RS", "SRB", "Serbia", "Serbia"),
        country("ME", "MNE", "Montenegro", "Montenegro"),
        country("MK", "MKD", "Macedonia del Norte", "North Macedonia")
            .dataset(&["Former Yugoslav Republic of Macedonia, the"]),
        country("AL", "ALB", "Albania", "Albania"),
        country("BA", "BIH", "Bosnia y Herzegovina", "Bosnia and Herzegovina"),
        country("US", "USA", "Estados Unidos", "United States")
            .en(&["United States of America", "USA"]),
        country("JP", "JPN", "Japón", "Japan"),
        country("CN", "CHN", "China", "China")
            .dataset(&["China (except Hong Kong)", "China (People's Republic of)"]),
        country("KR", "KOR", "Corea del Sur", "South Korea")
            .en(&["Korea", "Republic of Korea"]),
        country("IL", "ISR", "Israel", "Israel"),
        country("CA", "CAN", "Canadá", "Canada"),
    ]
}

/// Every country-level entity (supranational first, then EU, then the rest)
pub fn default_countries() -> Vec<Entity> {
    let mut entities = supranational_entities();
    entities.extend(eu_member_states());
    entities.extend(other_countries());
    entities
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eu_has_27_members() {
        assert_eq!(eu_member_states().len(), 27);
    }

    #[test]
    fn test_supranational_kinds() {
        for entity in supranational_entities() {
            assert!(entity.is_supranational(), "{} should be supranational", entity.code);
        }
        for entity in eu_member_states().into_iter().chain(other_countries()) {
            assert!(!entity.is_supranational(), "{} should be a country", entity.code);
            assert!(entity.flag_url.is_some());
        }
    }

    #[test]
    fn test_renamed_countries_keep_old_spellings() {
        let all = default_countries();
        let czechia = all.iter().find(|e| e.code.as_str() == "CZ").unwrap();
        assert!(czechia.has_alias("czech republic"));
        assert!(czechia.has_alias("czechia"));

        let turkey = all.iter().find(|e| e.code.as_str() == "TR").unwrap();
        assert!(turkey.has_alias("turkey"));
        assert!(turkey.has_alias("turkiye"));
    }
}
