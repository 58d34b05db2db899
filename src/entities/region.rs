// 🏝️ Autonomous communities of Spain (NUTS-2)
//
// Regional datasets (INE) use "Balears, Illes" / "Madrid, Comunidad de" style
// literals; the dashboard uses "Illes Balears" / "Comunidad de Madrid".

use super::{Entity, EntityKind};

/// Canonical code of the Canary Islands
pub const CANARIAS_CODE: &str = "ES70";

fn region(nuts2: &str, iso_3166_2: &str, name_es: &str, name_en: &str) -> Entity {
    Entity::new(nuts2, EntityKind::Region, name_es, name_en).codes(&[iso_3166_2])
}

pub fn default_regions() -> Vec<Entity> {
    vec![
        region("ES11", "ES-GA", "Galicia", "Galicia"),
        region("ES12", "ES-AS", "Principado de Asturias", "Asturias")
            .es(&["Asturias"])
            .dataset(&["Asturias, Principado de"]),
        region("ES13", "ES-CB", "Cantabria", "Cantabria"),
        region("ES21", "ES-PV", "País Vasco", "Basque Country")
            .es(&["Euskadi"])
            .dataset(&["País Vasco/Euskadi"]),
        region("ES22", "ES-NC", "Comunidad Foral de Navarra", "Navarre")
            .es(&["Navarra"])
            .dataset(&["Navarra, Comunidad Foral de"]),
        region("ES23", "ES-RI", "La Rioja", "La Rioja").dataset(&["Rioja, La"]),
        region("ES24", "ES-AR", "Aragón", "Aragon"),
        region("ES30", "ES-MD", "Comunidad de Madrid", "Community of Madrid")
            .es(&["Madrid"])
            .dataset(&["Madrid, Comunidad de"]),
        region("ES41", "ES-CL", "Castilla y León", "Castile and León"),
        region("ES42", "ES-CM", "Castilla-La Mancha", "Castile-La Mancha")
            .dataset(&["Castilla - La Mancha"]),
        region("ES43", "ES-EX", "Extremadura", "Extremadura"),
        region("ES51", "ES-CT", "Cataluña", "Catalonia").es(&["Catalunya"]),
        region("ES52", "ES-VC", "Comunitat Valenciana", "Valencian Community")
            .es(&["Comunidad Valenciana"]),
        region("ES53", "ES-IB", "Illes Balears", "Balearic Islands")
            .es(&["Islas Baleares"])
            .dataset(&["Balears, Illes"]),
        region("ES61", "ES-AN", "Andalucía", "Andalusia"),
        region("ES62", "ES-MC", "Región de Murcia", "Region of Murcia")
            .es(&["Murcia"])
            .dataset(&["Murcia, Región de"]),
        region("ES63", "ES-CE", "Ceuta", "Ceuta"),
        region("ES64", "ES-ML", "Melilla", "Melilla"),
        region(CANARIAS_CODE, "ES-CN", "Canarias", "Canary Islands")
            .es(&["Islas Canarias"])
            .dataset(&["Canarias, Islas"]),
    ]
}
