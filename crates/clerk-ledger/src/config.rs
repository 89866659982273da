use std::path::{Path, PathBuf};

use clerk_store::{JournalConfig, SyncMode};
use clerk_types::DEFAULT_LOG_INDEX_UNIT;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Ledger configuration, usually read from a TOML file.
///
/// ```toml
/// log_index_unit = 100000
///
/// [journal]
/// path = "data/clerk.journal"
/// sync_mode = "every_write"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Block spacing used when deriving sequence ids from log positions.
    pub log_index_unit: u64,
    /// Durable storage settings.
    pub journal: JournalSettings,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalSettings {
    /// Journal file. The CLI `--data` flag overrides it.
    pub path: Option<PathBuf>,
    pub sync_mode: SyncMode,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            log_index_unit: DEFAULT_LOG_INDEX_UNIT,
            journal: JournalSettings::default(),
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, LedgerError> {
        let config: Self = toml::from_str(text).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.log_index_unit == 0 {
            return Err(LedgerError::Config("log_index_unit must be positive".into()));
        }
        Ok(())
    }

    pub fn journal_config(&self) -> JournalConfig {
        JournalConfig {
            sync_mode: self.journal.sync_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LedgerConfig::default();
        assert_eq!(c.log_index_unit, 100_000);
        assert!(c.journal.path.is_none());
        assert_eq!(c.journal.sync_mode, SyncMode::OsDefault);
    }

    #[test]
    fn parses_full_toml() {
        let c = LedgerConfig::from_toml_str(
            r#"
            log_index_unit = 1000

            [journal]
            path = "data/clerk.journal"
            sync_mode = "every_write"
            "#,
        )
        .unwrap();
        assert_eq!(c.log_index_unit, 1000);
        assert_eq!(c.journal.path, Some(PathBuf::from("data/clerk.journal")));
        assert_eq!(c.journal_config().sync_mode, SyncMode::EveryWrite);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let c = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(c, LedgerConfig::default());
    }

    #[test]
    fn zero_log_index_unit_rejected() {
        let err = LedgerConfig::from_toml_str("log_index_unit = 0").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn unknown_sync_mode_rejected() {
        let err = LedgerConfig::from_toml_str("[journal]\nsync_mode = \"sometimes\"").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clerk.toml");
        std::fs::write(&path, "log_index_unit = 10\n").unwrap();
        assert_eq!(LedgerConfig::load(&path).unwrap().log_index_unit, 10);
        assert!(LedgerConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
