// 📊 Observations - one (entity, year, sector) value from a dataset
//
// Observations are read-only: loaded once, held for the session lifetime.
// The value stays as the raw locale-formatted string; numeric extraction
// happens on demand and yields None (never NaN) for malformed input.

use crate::locale::Locale;
use crate::normalize::{parse_number_with, NumberHint};
use crate::sector::Sector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// OBSERVATION STATUS FLAGS
// ============================================================================

/// Eurostat observation status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationFlag {
    BreakInSeries,      // b
    Confidential,       // c
    DefinitionDiffers,  // d
    Estimated,          // e
    Forecast,           // f
    NotSignificant,     // n
    Provisional,        // p
    Revised,            // r
    EurostatEstimate,   // s
    LowReliability,     // u
    NotApplicable,      // z
}

impl ObservationFlag {
    pub fn from_letter(letter: char) -> Option<ObservationFlag> {
        match letter.to_ascii_lowercase() {
            'b' => Some(ObservationFlag::BreakInSeries),
            'c' => Some(ObservationFlag::Confidential),
            'd' => Some(ObservationFlag::DefinitionDiffers),
            'e' => Some(ObservationFlag::Estimated),
            'f' => Some(ObservationFlag::Forecast),
            'n' => Some(ObservationFlag::NotSignificant),
            'p' => Some(ObservationFlag::Provisional),
            'r' => Some(ObservationFlag::Revised),
            's' => Some(ObservationFlag::EurostatEstimate),
            'u' => Some(ObservationFlag::LowReliability),
            'z' => Some(ObservationFlag::NotApplicable),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            ObservationFlag::BreakInSeries => 'b',
            ObservationFlag::Confidential => 'c',
            ObservationFlag::DefinitionDiffers => 'd',
            ObservationFlag::Estimated => 'e',
            ObservationFlag::Forecast => 'f',
            ObservationFlag::NotSignificant => 'n',
            ObservationFlag::Provisional => 'p',
            ObservationFlag::Revised => 'r',
            ObservationFlag::EurostatEstimate => 's',
            ObservationFlag::LowReliability => 'u',
            ObservationFlag::NotApplicable => 'z',
        }
    }

    pub fn description(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (ObservationFlag::BreakInSeries, Locale::Es) => "ruptura de serie",
            (ObservationFlag::BreakInSeries, Locale::En) => "break in time series",
            (ObservationFlag::Confidential, Locale::Es) => "confidencial",
            (ObservationFlag::Confidential, Locale::En) => "confidential",
            (ObservationFlag::DefinitionDiffers, Locale::Es) => "definición diferente",
            (ObservationFlag::DefinitionDiffers, Locale::En) => "definition differs",
            (ObservationFlag::Estimated, Locale::Es) => "estimado",
            (ObservationFlag::Estimated, Locale::En) => "estimated",
            (ObservationFlag::Forecast, Locale::Es) => "previsión",
            (ObservationFlag::Forecast, Locale::En) => "forecast",
            (ObservationFlag::NotSignificant, Locale::Es) => "no significativo",
            (ObservationFlag::NotSignificant, Locale::En) => "not significant",
            (ObservationFlag::Provisional, Locale::Es) => "provisional",
            (ObservationFlag::Provisional, Locale::En) => "provisional",
            (ObservationFlag::Revised, Locale::Es) => "revisado",
            (ObservationFlag::Revised, Locale::En) => "revised",
            (ObservationFlag::EurostatEstimate, Locale::Es) => "estimación de Eurostat",
            (ObservationFlag::EurostatEstimate, Locale::En) => "Eurostat estimate",
            (ObservationFlag::LowReliability, Locale::Es) => "baja fiabilidad",
            (ObservationFlag::LowReliability, Locale::En) => "low reliability",
            (ObservationFlag::NotApplicable, Locale::Es) => "no aplicable",
            (ObservationFlag::NotApplicable, Locale::En) => "not applicable",
        }
    }
}

/// Parsed status code, e.g. "bd" → [BreakInSeries, DefinitionDiffers]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationStatus {
    pub raw: String,
    pub flags: Vec<ObservationFlag>,
}

impl ObservationStatus {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let mut flags = Vec::new();
        for letter in raw.chars().filter(|c| c.is_ascii_alphabetic()) {
            match ObservationFlag::from_letter(letter) {
                Some(flag) if !flags.contains(&flag) => flags.push(flag),
                Some(_) => {}
                None => debug!(%letter, status = raw, "ignoring unknown status letter"),
            }
        }
        ObservationStatus {
            raw: raw.to_string(),
            flags,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn has(&self, flag: ObservationFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// "estimado, provisional"
    pub fn describe(&self, locale: Locale) -> String {
        self.flags
            .iter()
            .map(|f| f.description(locale))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// OBSERVATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Entity name exactly as in the source file
    pub entity: String,

    /// Spanish name column, when the dataset carries both languages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_es: Option<String>,

    /// Entity code column ("ES", "EL", "EA20", "ES70"...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub year: i32,

    /// Sector label as in the source file
    pub sector_label: String,

    /// Raw value string ("1,44", "1.44", "", ":")
    pub value: String,

    #[serde(default, skip_serializing_if = "ObservationStatus::is_empty")]
    pub status: ObservationStatus,

    /// How `value` reads a lone separator; set by the loader per dataset kind
    #[serde(default)]
    pub number_hint: NumberHint,

    // Provenance
    pub source_file: String,
    pub line_number: usize,
}

impl Observation {
    pub fn new(entity: &str, year: i32, sector_label: &str, value: &str) -> Self {
        Observation {
            entity: entity.trim().to_string(),
            entity_es: None,
            code: None,
            year,
            sector_label: sector_label.trim().to_string(),
            value: value.trim().to_string(),
            status: ObservationStatus::default(),
            number_hint: NumberHint::default(),
            source_file: String::new(),
            line_number: 0,
        }
    }

    /// Builder pattern: add entity code
    pub fn with_code(mut self, code: &str) -> Self {
        let code = code.trim();
        if !code.is_empty() {
            self.code = Some(code.to_string());
        }
        self
    }

    /// Builder pattern: add Spanish entity name
    pub fn with_entity_es(mut self, name: &str) -> Self {
        let name = name.trim();
        if !name.is_empty() {
            self.entity_es = Some(name.to_string());
        }
        self
    }

    /// Builder pattern: add status flags
    pub fn with_status(mut self, raw: &str) -> Self {
        self.status = ObservationStatus::parse(raw);
        self
    }

    pub fn with_number_hint(mut self, hint: NumberHint) -> Self {
        self.number_hint = hint;
        self
    }

    /// Builder pattern: add provenance
    pub fn with_provenance(mut self, source_file: &str, line_number: usize) -> Self {
        self.source_file = source_file.to_string();
        self.line_number = line_number;
        self
    }

    /// Numeric value; None for empty / malformed strings
    pub fn numeric_value(&self) -> Option<f64> {
        parse_number_with(&self.value, self.number_hint)
    }

    /// Name column for a locale (falls back to the primary column)
    pub fn name_for(&self, locale: Locale) -> &str {
        match locale {
            Locale::Es => self.entity_es.as_deref().unwrap_or(&self.entity),
            Locale::En => &self.entity,
        }
    }

    /// Every name column this record carries
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.entity.as_str()).chain(self.entity_es.as_deref())
    }

    pub fn sector(&self) -> Option<Sector> {
        Sector::from_label(&self.sector_label)
    }

    pub fn matches_sector(&self, sector: Sector) -> bool {
        // No sector column means the row is a total
        if self.sector_label.is_empty() {
            return sector == Sector::Total;
        }
        sector.matches_label(&self.sector_label)
    }
}

// ============================================================================
// DATASET
// ============================================================================

/// A loaded dataset: observations + identity for caching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,

    /// SHA-256 over the observation content
    pub version: String,

    pub observations: Vec<Observation>,

    /// Rows dropped at load time (unparseable year)
    pub skipped_rows: usize,

    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    pub fn new(name: &str, observations: Vec<Observation>) -> Self {
        let version = compute_version(&observations);
        Dataset {
            name: name.to_string(),
            version,
            observations,
            skipped_rows: 0,
            loaded_at: Utc::now(),
        }
    }

    pub fn with_skipped_rows(mut self, skipped: usize) -> Self {
        self.skipped_rows = skipped;
        self
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct years, ascending
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.observations.iter().map(|o| o.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Observation count per raw sector label
    pub fn sector_labels(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for obs in &self.observations {
            *counts.entry(obs.sector_label.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Rows for a year + sector
    pub fn slice(&self, year: i32, sector: Sector) -> impl Iterator<Item = &Observation> {
        self.observations
            .iter()
            .filter(move |o| o.year == year && o.matches_sector(sector))
    }
}

/// Content hash: same observations ⇒ same version
pub fn compute_version(observations: &[Observation]) -> String {
    let mut hasher = Sha256::new();
    for obs in observations {
        hasher.update(format!(
            "{}|{}|{}|{}|{}|{}|{}|{:?}\n",
            obs.entity,
            obs.entity_es.as_deref().unwrap_or(""),
            obs.code.as_deref().unwrap_or(""),
            obs.year,
            obs.sector_label,
            obs.value,
            obs.status.raw,
            obs.number_hint
        ));
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================
