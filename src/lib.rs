// Canarias R&D Indicators - Core Library
// Entity resolution, record matching and metric derivation over R&D datasets,
// shared by the CLI, the terminal dashboard and tests

pub mod normalize;
pub mod locale;
pub mod sector;
pub mod entities;
pub mod observation;
pub mod parser;
pub mod config;
pub mod matcher;
pub mod metrics;
pub mod cache;
pub mod summary;
pub mod data_quality;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use normalize::{normalize_text, parse_locale_number, parse_number_with, NumberHint};
pub use locale::{format_decimal, format_percent_change, Locale};
pub use sector::Sector;
pub use entities::{Entity, EntityCatalog, EntityCode, EntityKind};
pub use observation::{Dataset, Observation, ObservationFlag, ObservationStatus};
pub use parser::{
    DatasetParser, DatasetKind, DatasetFormat,
    CsvDatasetParser, JsonDatasetParser,
    detect_dataset, get_parser, load_dataset, load_dataset_as,
};
pub use config::DashboardConfig;
pub use matcher::{DuplicatePolicy, MatchStrategy, RecordMatcher, ResolvedMatch};
pub use metrics::{
    aggregate_member_count, per_member_average, rank, share_of_total, yoy_change,
    RankEntry, RankPosition,
};
pub use cache::MatchCache;
pub use summary::{
    country_ranking, sector_breakdown, summarize, tooltip_lines,
    EntitySummary, RankedEntity, SectorBreakdown, SectorShare,
};
pub use data_quality::{
    DataQualityEngine, DatasetAudit, QualityReport, QualityIssue, Severity, BatchSummary,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
