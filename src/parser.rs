// 🏗️ Dataset loaders - CSV / JSON → Observations
//
// Every dataset names its columns differently ("Country" / "País" / "GEO",
// "%GDP" / "Valor" / "OBS_VALUE") and uses ";" or "," as delimiter.
// Columns are found by normalized header name, per dataset kind.

use crate::normalize::{normalize_text, NumberHint};
use crate::observation::{Dataset, Observation};
use crate::sector::ALL_SECTORS_LABEL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Which R&D dataset a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    /// Gross domestic expenditure on R&D as % of GDP (by country)
    RdIntensity,

    /// Researchers (headcount / FTE)
    Researchers,

    /// Patent applications
    Patents,

    /// Autonomous-community data (INE)
    Regional,
}

impl DatasetKind {
    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::RdIntensity => "R&D expenditure (% GDP)",
            DatasetKind::Researchers => "Researchers",
            DatasetKind::Patents => "Patent applications",
            DatasetKind::Regional => "Autonomous communities",
        }
    }

    /// Researcher and patent figures are counts; the rest are ratios
    pub fn number_hint(&self) -> NumberHint {
        match self {
            DatasetKind::Researchers | DatasetKind::Patents => NumberHint::Count,
            DatasetKind::RdIntensity | DatasetKind::Regional => NumberHint::Fractional,
        }
    }

    /// Candidate header names (normalized) per field
    pub fn layout(&self) -> ColumnLayout {
        let entity: &'static [&'static str] = match self {
            DatasetKind::Regional => &[
                "comunidad autonoma",
                "comunidades y ciudades autonomas",
                "comunidad",
                "ccaa",
                "region",
                "territorio",
                "entity",
            ],
            _ => &["country", "geo (labels)", "geo", "entity", "territorio", "name"],
        };

        let value: &'static [&'static str] = match self {
            DatasetKind::RdIntensity => &["%gdp", "% gdp", "gdp", "% pib", "%pib", "value", "obs_value", "valor"],
            DatasetKind::Researchers => &["researchers", "investigadores", "fte", "eji", "value", "obs_value", "valor", "total"],
            DatasetKind::Patents => &["patents", "patentes", "applications", "solicitudes", "value", "obs_value", "valor"],
            DatasetKind::Regional => &["value", "valor", "% pib", "%pib", "gasto", "obs_value", "total"],
        };

        ColumnLayout {
            entity,
            entity_es: &["pais", "nombre", "name_es", "nombre es"],
            code: &["code", "geo code", "geo_code", "iso", "iso2", "iso3", "codigo", "cod"],
            year: &["year", "ano", "anio", "time", "time_period", "periodo"],
            sector: &["sector", "sector of performance", "sectperf", "sector de ejecucion"],
            value,
            status: &["approx", "flag", "obs_flag", "observation status", "status", "estado"],
            number_hint: self.number_hint(),
        }
    }
}

/// Candidate header names for each observation field
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub entity: &'static [&'static str],
    pub entity_es: &'static [&'static str],
    pub code: &'static [&'static str],
    pub year: &'static [&'static str],
    pub sector: &'static [&'static str],
    pub value: &'static [&'static str],
    pub status: &'static [&'static str],
    pub number_hint: NumberHint,
}

/// Resolved column positions for one file
#[derive(Debug, Clone, Copy, PartialEq)]
struct Columns {
    entity: usize,
    entity_es: Option<usize>,
    code: Option<usize>,
    year: usize,
    sector: Option<usize>,
    value: usize,
    status: Option<usize>,
    number_hint: NumberHint,
}

impl ColumnLayout {
    fn resolve(&self, headers: &[String]) -> Result<Columns> {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| normalize_text(h.trim().trim_start_matches('\u{feff}')))
            .collect();
        let find = |candidates: &[&str]| {
            candidates
                .iter()
                .find_map(|c| normalized.iter().position(|h| h == c))
        };

        let entity_es = find(self.entity_es);
        let entity = find(self.entity)
            .or(entity_es)
            .ok_or_else(|| anyhow::anyhow!("No entity column in headers: {:?}", headers))?;
        let year = find(self.year)
            .ok_or_else(|| anyhow::anyhow!("No year column in headers: {:?}", headers))?;
        let value = find(self.value)
            .ok_or_else(|| anyhow::anyhow!("No value column in headers: {:?}", headers))?;

        Ok(Columns {
            entity,
            entity_es: entity_es.filter(|&i| i != entity),
            code: find(self.code),
            year,
            sector: find(self.sector),
            value,
            status: find(self.status),
            number_hint: self.number_hint,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Json,
}

// ============================================================================
// PARSER TRAIT
// ============================================================================

/// DatasetParser - turns a file into a Dataset
pub trait DatasetParser: Send + Sync {
    /// Parse a file
    fn parse(&self, file_path: &Path) -> Result<Dataset> {
        let text = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;
        let name = file_name(file_path);
        let dataset = self.parse_str(&text, &name)?;
        info!(
            file = %name,
            kind = self.kind().name(),
            observations = dataset.len(),
            skipped = dataset.skipped_rows,
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Parse already-read content; `source_name` ends up in provenance
    fn parse_str(&self, text: &str, source_name: &str) -> Result<Dataset>;

    fn kind(&self) -> DatasetKind;

    /// Parser version (for provenance tracking)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

// ============================================================================
// CSV
// ============================================================================

pub struct CsvDatasetParser {
    kind: DatasetKind,
}

impl CsvDatasetParser {
    pub fn new(kind: DatasetKind) -> Self {
        CsvDatasetParser { kind }
    }
}

/// ";" when the header line has more semicolons than commas
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    if header.matches(';').count() > header.matches(',').count() {
        b';'
    } else {
        b','
    }
}

impl DatasetParser for CsvDatasetParser {
    fn parse_str(&self, text: &str, source_name: &str) -> Result<Dataset> {
        let text = text.trim_start_matches('\u{feff}');
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(sniff_delimiter(text))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header in {}", source_name))?
            .iter()
            .map(str::to_string)
            .collect();
        let columns = self.kind.layout().resolve(&headers)?;

        let mut observations = Vec::new();
        let mut skipped = 0;

        for (line_num, result) in reader.records().enumerate() {
            let line = line_num + 2; // 1-indexed + header row
            let record = result.with_context(|| {
                format!("Failed to parse CSV line {} in {}", line, source_name)
            })?;
            let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

            match build_observation(&columns, field, source_name, line) {
                Some(obs) => observations.push(obs),
                None => skipped += 1,
            }
        }

        Ok(Dataset::new(source_name, observations).with_skipped_rows(skipped))
    }

    fn kind(&self) -> DatasetKind {
        self.kind
    }
}

// ============================================================================
// JSON
// ============================================================================

/// Top-level array of flat objects, or `{"data": [...]}`
pub struct JsonDatasetParser {
    kind: DatasetKind,
}

impl JsonDatasetParser {
    pub fn new(kind: DatasetKind) -> Self {
        JsonDatasetParser { kind }
    }
}

fn json_field_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

impl DatasetParser for JsonDatasetParser {
    fn parse_str(&self, text: &str, source_name: &str) -> Result<Dataset> {
        let json: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
            .with_context(|| format!("Failed to parse JSON from {}", source_name))?;

        let items = match &json {
            Value::Array(items) => items,
            Value::Object(map) => map
                .get("data")
                .and_then(|d| d.as_array())
                .ok_or_else(|| anyhow::anyhow!("JSON missing 'data' array in {}", source_name))?,
            _ => anyhow::bail!("JSON root must be an array or object in {}", source_name),
        };

        // Union of keys, first-seen order: a row may omit a key the others carry
        let mut headers: Vec<String> = Vec::new();
        for object in items.iter().filter_map(Value::as_object) {
            for key in object.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
        if headers.is_empty() {
            return Ok(Dataset::new(source_name, Vec::new()).with_skipped_rows(items.len()));
        }
        let columns = self
            .kind
            .layout()
            .resolve(&headers)
            .with_context(|| format!("Failed to resolve JSON columns in {}", source_name))?;

        let mut observations = Vec::new();
        let mut skipped = 0;

        for (idx, item) in items.iter().enumerate() {
            let Some(object) = item.as_object() else {
                warn!(file = source_name, index = idx, "skipping non-object JSON row");
                skipped += 1;
                continue;
            };

            let values: Vec<String> = headers
                .iter()
                .map(|h| object.get(h).map(json_field_to_string).unwrap_or_default())
                .collect();
            let field = |i: Option<usize>| i.and_then(|i| values.get(i)).map(String::as_str).unwrap_or("");

            match build_observation(&columns, field, source_name, idx + 1) {
                Some(obs) => observations.push(obs),
                None => skipped += 1,
            }
        }

        Ok(Dataset::new(source_name, observations).with_skipped_rows(skipped))
    }

    fn kind(&self) -> DatasetKind {
        self.kind
    }
}

// ============================================================================
// SHARED ROW HANDLING
// ============================================================================

/// "2022", "2022.0", "2022 (p)" → 2022
fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

fn build_observation<'r, F>(columns: &Columns, field: F, source_name: &str, line: usize) -> Option<Observation>
where
    F: Fn(Option<usize>) -> &'r str,
{
    let entity = field(Some(columns.entity));
    let year_raw = field(Some(columns.year));

    let Some(year) = parse_year(year_raw) else {
        warn!(file = source_name, line, year = year_raw, "skipping row with unparseable year");
        return None;
    };

    if entity.trim().is_empty() {
        warn!(file = source_name, line, "skipping row without entity name");
        return None;
    }

    let sector = match columns.sector {
        Some(_) => field(columns.sector),
        None => ALL_SECTORS_LABEL,
    };

    Some(
        Observation::new(entity, year, sector, field(Some(columns.value)))
            .with_entity_es(field(columns.entity_es))
            .with_code(field(columns.code))
            .with_status(field(columns.status))
            .with_number_hint(columns.number_hint)
            .with_provenance(source_name, line),
    )
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Detect dataset kind from the filename
///
/// - "gerd_gdp.csv", "idi_pib.csv" → RdIntensity
/// - "researchers_2023.json"       → Researchers
/// - "patentes.csv"                → Patents
/// - "ccaa_gasto.csv"              → Regional
pub fn detect_dataset(file_path: &Path) -> Result<DatasetKind> {
    let filename = normalize_text(&file_name(file_path));

    // Regional first: "canarias_pib.csv" is regional, not national
    if ["ccaa", "comunidad", "region", "canarias", "autonom"]
        .iter()
        .any(|p| filename.contains(p))
    {
        return Ok(DatasetKind::Regional);
    }
    if ["research", "investigador"].iter().any(|p| filename.contains(p)) {
        return Ok(DatasetKind::Researchers);
    }
    if ["patent"].iter().any(|p| filename.contains(p)) {
        return Ok(DatasetKind::Patents);
    }
    if ["gdp", "pib", "gerd", "rd_", "i+d", "idi"].iter().any(|p| filename.contains(p)) {
        return Ok(DatasetKind::RdIntensity);
    }

    Err(anyhow::anyhow!(
        "Could not detect dataset kind from filename: {}",
        file_path.display()
    ))
}

/// CSV or JSON, from the extension
pub fn detect_format(file_path: &Path) -> Result<DatasetFormat> {
    match file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("csv") | Some("tsv") | Some("txt") => Ok(DatasetFormat::Csv),
        Some("json") => Ok(DatasetFormat::Json),
        _ => Err(anyhow::anyhow!(
            "Unsupported dataset format: {}",
            file_path.display()
        )),
    }
}

/// Parser for a kind + format
pub fn get_parser(kind: DatasetKind, format: DatasetFormat) -> Box<dyn DatasetParser> {
    match format {
        DatasetFormat::Csv => Box::new(CsvDatasetParser::new(kind)),
        DatasetFormat::Json => Box::new(JsonDatasetParser::new(kind)),
    }
}

/// Detect kind + format and parse
pub fn load_dataset(file_path: &Path) -> Result<Dataset> {
    let kind = detect_dataset(file_path)?;
    load_dataset_as(file_path, kind)
}

/// Parse with an explicit kind (filename gives no hint)
pub fn load_dataset_as(file_path: &Path, kind: DatasetKind) -> Result<Dataset> {
    let format = detect_format(file_path)?;
    get_parser(kind, format).parse(file_path)
}

// ============================================================================
// TESTS
// ============================================================================
