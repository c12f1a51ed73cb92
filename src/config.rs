//! Startup configuration.
//!
//! Resolved once in `main` (after `dotenvy` has loaded any `.env` file) and then
//! passed down. Nothing else in the crate reads environment variables.
//!
//! | Variable               | Default                 | Meaning                          |
//! |------------------------|-------------------------|----------------------------------|
//! | `CLINIC_DB_PATH`       | `data/clinic.db`        | SQLite address book              |
//! | `CLINIC_PREFS_PATH`    | `data/preferences.json` | User preferences                 |
//! | `CLINIC_HISTORY_LIMIT` | unset (unbounded)       | Max undo entries, at least 2     |

use crate::history::HistoryManager;
use crate::prefs::DEFAULT_ADDRESS_BOOK_PATH;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_PREFS_PATH: &str = "data/preferences.json";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    db_path: PathBuf,
    prefs_path: PathBuf,
    history_limit: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: PathBuf::from(DEFAULT_ADDRESS_BOOK_PATH),
            prefs_path: PathBuf::from(DEFAULT_PREFS_PATH),
            history_limit: None,
        }
    }
}

impl AppConfig {
    /// Read the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from any key lookup; lets tests avoid touching process state
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(path) = lookup("CLINIC_DB_PATH").filter(|v| !v.trim().is_empty()) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("CLINIC_PREFS_PATH").filter(|v| !v.trim().is_empty()) {
            config.prefs_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("CLINIC_HISTORY_LIMIT") {
            let limit: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("CLINIC_HISTORY_LIMIT is not a number: {:?}", raw))?;
            if limit < 2 {
                bail!("CLINIC_HISTORY_LIMIT must be at least 2, got {}", limit);
            }
            config.history_limit = Some(limit);
        }

        Ok(config)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn prefs_path(&self) -> &Path {
        &self.prefs_path
    }

    pub fn history_limit(&self) -> Option<usize> {
        self.history_limit
    }

    /// History sized per this configuration
    pub fn history(&self) -> HistoryManager {
        match self.history_limit {
            Some(limit) => HistoryManager::with_capacity(limit),
            None => HistoryManager::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.history().capacity(), None);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CLINIC_DB_PATH", "/tmp/c.db"),
            ("CLINIC_PREFS_PATH", "/tmp/p.json"),
            ("CLINIC_HISTORY_LIMIT", "50"),
        ]))
        .unwrap();

        assert_eq!(config.db_path(), Path::new("/tmp/c.db"));
        assert_eq!(config.prefs_path(), Path::new("/tmp/p.json"));
        assert_eq!(config.history().capacity(), Some(50));
    }

    #[test]
    fn test_invalid_history_limit() {
        assert!(AppConfig::from_lookup(lookup_from(&[("CLINIC_HISTORY_LIMIT", "lots")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("CLINIC_HISTORY_LIMIT", "1")])).is_err());
    }
}
