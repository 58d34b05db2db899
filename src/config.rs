// ⚙️ Dashboard configuration
//
// JSON file, every field optional:
// {
//   "locale": "es",
//   "duplicate_policy": "max_value",
//   "substring_fallback": true,
//   "min_fallback_len": 4,
//   "normalize_aggregates": true,
//   "log_level": "info"
// }

use crate::locale::Locale;
use crate::matcher::DuplicatePolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Path to a JSON config file
pub const CONFIG_ENV_VAR: &str = "CANARIAS_RD_CONFIG";

/// Locale override ("es" / "en")
pub const LOCALE_ENV_VAR: &str = "CANARIAS_RD_LOCALE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub locale: Locale,
    pub duplicate_policy: DuplicatePolicy,
    pub substring_fallback: bool,
    pub min_fallback_len: usize,
    pub normalize_aggregates: bool,
    pub log_level: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            locale: Locale::Es,
            duplicate_policy: DuplicatePolicy::MaxValue,
            substring_fallback: true,
            min_fallback_len: 4,
            normalize_aggregates: true,
            log_level: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Defaults, or the file named by `CANARIAS_RD_CONFIG`, then the
    /// `CANARIAS_RD_LOCALE` override
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => DashboardConfig::load(Path::new(path.trim()))?,
            _ => DashboardConfig::default(),
        };

        if let Ok(locale) = env::var(LOCALE_ENV_VAR) {
            config.locale = locale
                .parse()
                .with_context(|| format!("Invalid {}", LOCALE_ENV_VAR))?;
        }

        Ok(config)
    }

    /// tracing level parsed from `log_level` (unknown → INFO)
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level
            .parse::<tracing::Level>()
            .unwrap_or(tracing::Level::INFO)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.locale, Locale::Es);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::MaxValue);
        assert!(config.substring_fallback);
        assert_eq!(config.min_fallback_len, 4);
        assert!(config.normalize_aggregates);
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"locale": "en", "duplicate_policy": "first_seen"}}"#).unwrap();

        let config = DashboardConfig::load(file.path()).unwrap();
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstSeen);
        // Untouched fields keep defaults
        assert!(config.substring_fallback);
        assert_eq!(config.min_fallback_len, 4);
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"locale": "fr"}}"#).unwrap();
        assert!(DashboardConfig::load(file.path()).is_err());

        assert!(DashboardConfig::load(Path::new("/nonexistent/config.json")).is_err());
    }

    #[test]
    fn test_tracing_level() {
        let config = DashboardConfig {
            log_level: "debug".to_string(),
            ..DashboardConfig::default()
        };
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);

        let bogus = DashboardConfig {
            log_level: "chatty".to_string(),
            ..DashboardConfig::default()
        };
        assert_eq!(bogus.tracing_level(), tracing::Level::INFO);
    }
}
