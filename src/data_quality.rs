// ✅ Data Quality Engine - dataset audit
//
// Per-observation rules map the "no data" conditions the matcher silently
// absorbs (unknown entity, missing / malformed value, overlapping rows) onto
// a report a human can act on.

use crate::matcher::RecordMatcher;
use crate::normalize::{parse_number_with, NumberHint};
use crate::observation::{Dataset, Observation};
use crate::sector::Sector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Years outside this range are treated as typos
pub const MIN_PLAUSIBLE_YEAR: i32 = 1980;
pub const MAX_PLAUSIBLE_YEAR: i32 = 2100;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub rule_name: String,
    pub field: String,
    pub message: String,
    pub confidence: f64,
    pub severity: Severity,
}

impl ValidationResult {
    pub fn pass(rule_name: &str, field: &str, message: &str) -> Self {
        ValidationResult {
            passed: true,
            rule_name: rule_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
            confidence: 1.0,
            severity: Severity::Info,
        }
    }

    pub fn fail(rule_name: &str, field: &str, message: &str, severity: Severity) -> Self {
        ValidationResult {
            passed: false,
            rule_name: rule_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
            confidence: if severity == Severity::Critical {
                0.0
            } else {
                0.5
            },
            severity,
        }
    }
}

// ============================================================================
// QUALITY REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// "file.csv:12"
    pub observation_ref: String,
    pub overall_quality: f64,
    pub overall_confidence: f64,
    pub validations: Vec<ValidationResult>,
    pub issues: Vec<QualityIssue>,
    pub passed_count: usize,
    pub failed_count: usize,
    pub needs_review: bool,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "Quality: {:.1}%, Confidence: {:.1}%, Issues: {} ({} critical)",
            self.overall_quality * 100.0,
            self.overall_confidence * 100.0,
            self.issues.len(),
            self.issues
                .iter()
                .filter(|i| i.severity == Severity::Critical)
                .count()
        )
    }

    pub fn is_high_quality(&self) -> bool {
        self.overall_quality >= 0.8 && self.overall_confidence >= 0.7
    }

    pub fn has_critical_issues(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == Severity::Critical)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub field: String,
    pub issue: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Value cannot be used at all
    Warning,  // Shows as "no data" or may be the wrong row
    Info,     // Usable, worth a footnote
}

/// Rows sharing (entity, year, sector)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub entity_key: String,
    pub year: i32,
    pub sector_label: String,
    pub lines: Vec<usize>,

    /// Positions of the rows in the dataset, parallel to `lines`
    pub rows: Vec<usize>,

    /// Line the matcher keeps
    pub kept_line: usize,
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

pub struct DataQualityEngine {
    matcher: RecordMatcher,

    /// Minimum confidence threshold for "needs_review"
    review_threshold: f64,
}

impl DataQualityEngine {
    pub fn new(matcher: RecordMatcher) -> Self {
        DataQualityEngine {
            matcher,
            review_threshold: 0.7,
        }
    }

    /// Validate one observation
    pub fn validate(&self, obs: &Observation) -> QualityReport {
        let mut validations = Vec::new();
        let mut issues = Vec::new();

        // Rule 1: Entity resolves to the catalog
        let entity_result = self.validate_entity(obs);
        if !entity_result.passed {
            issues.push(QualityIssue {
                severity: entity_result.severity.clone(),
                field: "entity".to_string(),
                issue: entity_result.message.clone(),
                recommendation: "Add the spelling as a dataset alias in the entity catalog"
                    .to_string(),
            });
        }
        validations.push(entity_result);

        // Rule 2: Value is numeric
        let value_result = self.validate_value(&obs.value, obs.number_hint);
        if !value_result.passed {
            issues.push(QualityIssue {
                severity: value_result.severity.clone(),
                field: "value".to_string(),
                issue: value_result.message.clone(),
                recommendation: if value_result.severity == Severity::Critical {
                    "Fix the number format (e.g. 1,44 or 1.44)".to_string()
                } else {
                    "Value will render as no data".to_string()
                },
            });
        }
        validations.push(value_result);

        // Rule 3: Sector label is known
        let sector_result = self.validate_sector(&obs.sector_label);
        if !sector_result.passed {
            issues.push(QualityIssue {
                severity: sector_result.severity.clone(),
                field: "sector".to_string(),
                issue: sector_result.message.clone(),
                recommendation: "Use total, business, government, education or nonprofit"
                    .to_string(),
            });
        }
        validations.push(sector_result);

        // Rule 4: Year is plausible
        let year_result = self.validate_year(obs.year);
        if !year_result.passed {
            issues.push(QualityIssue {
                severity: year_result.severity.clone(),
                field: "year".to_string(),
                issue: year_result.message.clone(),
                recommendation: format!(
                    "Check the year column ({}-{})",
                    MIN_PLAUSIBLE_YEAR, MAX_PLAUSIBLE_YEAR
                ),
            });
        }
        validations.push(year_result);

        // Status flags are not failures, only noted
        if !obs.status.is_empty() {
            issues.push(QualityIssue {
                severity: Severity::Info,
                field: "status".to_string(),
                issue: format!(
                    "Status flags '{}': {}",
                    obs.status.raw,
                    obs.status.describe(self.matcher.locale)
                ),
                recommendation: "Show the flag next to the value".to_string(),
            });
        }

        let passed_count = validations.iter().filter(|v| v.passed).count();
        let failed_count = validations.len() - passed_count;
        let overall_quality = passed_count as f64 / validations.len() as f64;

        let overall_confidence: f64 =
            validations.iter().map(|v| v.confidence).sum::<f64>() / validations.len() as f64;

        let needs_review = overall_confidence < self.review_threshold;

        QualityReport {
            observation_ref: format!("{}:{}", obs.source_file, obs.line_number),
            overall_quality,
            overall_confidence,
            validations,
            issues,
            passed_count,
            failed_count,
            needs_review,
        }
    }

    /// Validate every observation, then look for overlapping rows
    pub fn audit(&self, dataset: &Dataset) -> DatasetAudit {
        let mut reports: Vec<QualityReport> =
            dataset.observations.iter().map(|o| self.validate(o)).collect();

        let duplicates = self.find_duplicates(&dataset.observations);
        for group in &duplicates {
            for &idx in &group.rows {
                let Some(report) = reports.get_mut(idx) else {
                    continue;
                };
                report.issues.push(QualityIssue {
                    severity: Severity::Warning,
                    field: "duplicate".to_string(),
                    issue: format!(
                        "{} rows for {} / {} / {} (lines {:?})",
                        group.lines.len(),
                        group.entity_key,
                        group.year,
                        group.sector_label,
                        group.lines
                    ),
                    recommendation: format!(
                        "Line {} is used ({} policy)",
                        group.kept_line, self.matcher.duplicate_policy
                    ),
                });
            }
        }

        let summary = self.batch_summary(&reports, dataset.skipped_rows, duplicates.len());
        DatasetAudit {
            dataset: dataset.name.clone(),
            version: dataset.version.clone(),
            reports,
            duplicates,
            summary,
        }
    }

    /// Groups of rows the matcher would have to choose between
    pub fn find_duplicates(&self, observations: &[Observation]) -> Vec<DuplicateGroup> {
        let mut groups: HashMap<(String, i32, String), Vec<usize>> = HashMap::new();
        let mut order = Vec::new();

        for (idx, obs) in observations.iter().enumerate() {
            let sector = obs
                .sector()
                .map(|s| s.id().to_string())
                .unwrap_or_else(|| obs.sector_label.clone());
            let key = (self.matcher.record_key(obs), obs.year, sector);
            let entry = groups.entry(key.clone()).or_default();
            if entry.is_empty() {
                order.push(key);
            }
            entry.push(idx);
        }

        order
            .into_iter()
            .filter_map(|key| {
                let indices = &groups[&key];
                if indices.len() < 2 {
                    return None;
                }
                let kept = self.matcher.pick(observations, indices)?;
                Some(DuplicateGroup {
                    entity_key: key.0.clone(),
                    year: key.1,
                    sector_label: key.2.clone(),
                    lines: indices.iter().map(|&i| observations[i].line_number).collect(),
                    rows: indices.clone(),
                    kept_line: observations[kept].line_number,
                })
            })
            .collect()
    }

    /// Generate summary statistics for an audit
    pub fn batch_summary(
        &self,
        reports: &[QualityReport],
        skipped_rows: usize,
        duplicate_groups: usize,
    ) -> BatchSummary {
        let total = reports.len();
        let high_quality = reports.iter().filter(|r| r.is_high_quality()).count();
        let needs_review = reports.iter().filter(|r| r.needs_review).count();
        let has_critical = reports.iter().filter(|r| r.has_critical_issues()).count();
        let missing_values = reports
            .iter()
            .filter(|r| {
                r.validations
                    .iter()
                    .any(|v| v.rule_name == "value_missing")
            })
            .count();

        let (avg_quality, avg_confidence) = if total == 0 {
            (0.0, 0.0)
        } else {
            (
                reports.iter().map(|r| r.overall_quality).sum::<f64>() / total as f64,
                reports.iter().map(|r| r.overall_confidence).sum::<f64>() / total as f64,
            )
        };

        BatchSummary {
            total_observations: total,
            skipped_rows,
            high_quality_count: high_quality,
            needs_review_count: needs_review,
            critical_issues_count: has_critical,
            missing_value_count: missing_values,
            duplicate_groups,
            average_quality: avg_quality,
            average_confidence: avg_confidence,
        }
    }

    // ========================================================================
    // VALIDATION RULES
    // ========================================================================

    fn validate_entity(&self, obs: &Observation) -> ValidationResult {
        if obs.entity.is_empty() {
            return ValidationResult::fail(
                "entity_empty",
                "entity",
                "Entity name is empty",
                Severity::Critical,
            );
        }

        match self.matcher.resolve_record(obs) {
            Some(entity) => ValidationResult::pass(
                "entity_known",
                "entity",
                &format!("'{}' → {}", obs.entity, entity.code),
            ),
            None => ValidationResult::fail(
                "entity_unknown",
                "entity",
                &format!("'{}' is not in the entity catalog", obs.entity),
                Severity::Warning,
            ),
        }
    }

    fn validate_value(&self, value: &str, hint: NumberHint) -> ValidationResult {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == ":" {
            return ValidationResult::fail(
                "value_missing",
                "value",
                "Value is missing",
                Severity::Warning,
            );
        }

        match parse_number_with(trimmed, hint) {
            Some(v) => ValidationResult::pass("value_numeric", "value", &format!("Value: {}", v)),
            None => ValidationResult::fail(
                "value_malformed",
                "value",
                &format!("Value is not a number: '{}'", trimmed),
                Severity::Critical,
            ),
        }
    }

    fn validate_sector(&self, label: &str) -> ValidationResult {
        // No sector column = total
        if label.is_empty() {
            return ValidationResult::pass("sector_known", "sector", "No sector (total)");
        }

        match Sector::from_label(label) {
            Some(sector) => ValidationResult::pass(
                "sector_known",
                "sector",
                &format!("'{}' → {}", label, sector.id()),
            ),
            None => ValidationResult::fail(
                "sector_unknown",
                "sector",
                &format!("Unknown sector label: '{}'", label),
                Severity::Warning,
            ),
        }
    }

    fn validate_year(&self, year: i32) -> ValidationResult {
        if (MIN_PLAUSIBLE_YEAR..=MAX_PLAUSIBLE_YEAR).contains(&year) {
            ValidationResult::pass("year_plausible", "year", &format!("Year {}", year))
        } else {
            ValidationResult::fail(
                "year_implausible",
                "year",
                &format!("Year {} is out of range", year),
                Severity::Critical,
            )
        }
    }
}

// ============================================================================
// AUDIT / BATCH SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetAudit {
    pub dataset: String,
    pub version: String,
    pub reports: Vec<QualityReport>,
    pub duplicates: Vec<DuplicateGroup>,
    pub summary: BatchSummary,
}

impl DatasetAudit {
    /// Reports with at least one issue
    pub fn with_issues(&self) -> impl Iterator<Item = &QualityReport> {
        self.reports.iter().filter(|r| !r.issues.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_observations: usize,
    pub skipped_rows: usize,
    pub high_quality_count: usize,
    pub needs_review_count: usize,
    pub critical_issues_count: usize,
    pub missing_value_count: usize,
    pub duplicate_groups: usize,
    pub average_quality: f64,
    pub average_confidence: f64,
}

impl BatchSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} observations ({} skipped): {:.1}% quality, {:.1}% confidence | {} high quality, {} need review, {} critical, {} missing values, {} duplicate groups",
            self.total_observations,
            self.skipped_rows,
            self.average_quality * 100.0,
            self.average_confidence * 100.0,
            self.high_quality_count,
            self.needs_review_count,
            self.critical_issues_count,
            self.missing_value_count,
            self.duplicate_groups
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityCatalog;
    use std::sync::Arc;

    fn engine() -> DataQualityEngine {
        DataQualityEngine::new(RecordMatcher::new(Arc::new(EntityCatalog::with_defaults())))
    }

    fn obs(entity: &str, year: i32, sector: &str, value: &str, line: usize) -> Observation {
        Observation::new(entity, year, sector, value).with_provenance("gdp.csv", line)
    }

    #[test]
    fn test_validate_clean_observation() {
        let report = engine().validate(&obs("Spain", 2022, "All Sectors", "1,44", 2));

        println!("Report: {}", report.summary());

        assert!(report.is_high_quality());
        assert!(!report.needs_review);
        assert!(!report.has_critical_issues());
        assert_eq!(report.issues.len(), 0);
        assert_eq!(report.observation_ref, "gdp.csv:2");
    }

    #[test]
    fn test_validate_missing_value_is_warning() {
        let report = engine().validate(&obs("Spain", 2022, "All Sectors", "", 2));
        assert!(!report.has_critical_issues());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Warning);
        assert_eq!(report.issues[0].field, "value");

        let colon = engine().validate(&obs("Spain", 2022, "All Sectors", ":", 3));
        assert_eq!(colon.issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_validate_malformed_value_is_critical() {
        let report = engine().validate(&obs("Spain", 2022, "All Sectors", "1,4x", 2));
        assert!(report.has_critical_issues());
        assert_eq!(report.failed_count, 1);
    }

    #[test]
    fn test_validate_unknown_entity_and_sector() {
        let report = engine().validate(&obs("Atlantis", 2022, "Military", "1,0", 2));
        let fields: Vec<&str> = report.issues.iter().map(|i| i.field.as_str()).collect();
        assert!(fields.contains(&"entity"));
        assert!(fields.contains(&"sector"));
        assert!(!report.has_critical_issues());
        assert!(!report.is_high_quality());
    }

    #[test]
    fn test_validate_implausible_year() {
        let report = engine().validate(&obs("Spain", 22, "total", "1,0", 2));
        assert!(report.has_critical_issues());
    }

    #[test]
    fn test_status_flags_are_info() {
        let report = engine().validate(&obs("Spain", 2022, "total", "1,44", 2).with_status("ep"));
        assert_eq!(report.failed_count, 0);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Info);
    }

    #[test]
    fn test_audit_reports_duplicates() {
        let dataset = Dataset::new(
            "gdp.csv",
            vec![
                obs("Euro area - 19 countries  (2015-2022)", 2022, "total", "40,1", 2),
                obs("Spain", 2022, "total", "1,44", 3),
                obs("Zona del euro", 2022, "All Sectors", "45,0", 4),
                obs("Spain", 2021, "total", "1,40", 5),
            ],
        );

        let audit = engine().audit(&dataset);
        assert_eq!(audit.duplicates.len(), 1);

        let group = &audit.duplicates[0];
        assert_eq!(group.entity_key, "EA");
        assert_eq!(group.lines, vec![2, 4]);
        assert_eq!(group.kept_line, 4);

        assert_eq!(audit.summary.duplicate_groups, 1);
        assert_eq!(audit.with_issues().count(), 2);
        println!("{}", audit.summary.summary());
    }

    #[test]
    fn test_duplicate_issues_land_on_their_rows_without_provenance() {
        let dataset = Dataset::new(
            "memory",
            vec![
                Observation::new("Germany", 2022, "total", "3,13"),
                Observation::new("Spain", 2022, "total", "1,40"),
                Observation::new("France", 2022, "total", "2,22"),
                Observation::new("España", 2022, "total", "1,44"),
            ],
        );

        let audit = engine().audit(&dataset);
        assert_eq!(audit.duplicates[0].rows, vec![1, 3]);

        let flagged: Vec<bool> = audit
            .reports
            .iter()
            .map(|r| r.issues.iter().any(|i| i.field == "duplicate"))
            .collect();
        assert_eq!(flagged, vec![false, true, false, true]);
    }

    #[test]
    fn test_batch_summary_empty() {
        let audit = engine().audit(&Dataset::new("empty.csv", Vec::new()));
        assert_eq!(audit.summary.total_observations, 0);
        assert_eq!(audit.summary.average_quality, 0.0);
    }
}
