//! Process configuration from `EXPENSESHARE_*` environment variables.

use std::path::PathBuf;

use anyhow::{Context, anyhow};

use expenseshare_core::Currency;
use expenseshare_observability::LogFormat;

pub const DB_PATH_VAR: &str = "EXPENSESHARE_DB_PATH";
pub const LOG_FORMAT_VAR: &str = "EXPENSESHARE_LOG_FORMAT";
pub const DEFAULT_CURRENCY_VAR: &str = "EXPENSESHARE_DEFAULT_CURRENCY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_format: LogFormat,
    /// Currency preselected on the registration form.
    pub default_currency: Currency,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; unset and blank values take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = match get(DB_PATH_VAR) {
            Some(path) => PathBuf::from(path.trim()),
            None => default_db_path()?,
        };
        let log_format = match get(LOG_FORMAT_VAR) {
            Some(raw) => raw.parse::<LogFormat>().with_context(|| format!("invalid {LOG_FORMAT_VAR}"))?,
            None => LogFormat::default(),
        };
        let default_currency = match get(DEFAULT_CURRENCY_VAR) {
            Some(raw) => raw
                .parse::<Currency>()
                .map_err(|e| anyhow!("invalid {DEFAULT_CURRENCY_VAR}: {e}"))?,
            None => Currency::default(),
        };

        Ok(Self {
            db_path,
            log_format,
            default_currency,
        })
    }
}

/// `{data_dir}/expenseshare/expenseshare.db`, falling back to `~/.local/share`.
pub fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    Ok(base.join("expenseshare").join("expenseshare.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.default_currency, Currency::USD);
        assert!(config.db_path.ends_with("expenseshare/expenseshare.db"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            (DB_PATH_VAR, "/tmp/es/test.db"),
            (LOG_FORMAT_VAR, "pretty"),
            (DEFAULT_CURRENCY_VAR, "eur"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/es/test.db"));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.default_currency, Currency::EUR);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(AppConfig::from_lookup(lookup(&[(LOG_FORMAT_VAR, "xml")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[(DEFAULT_CURRENCY_VAR, "DOGE")])).is_err());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = AppConfig::from_lookup(lookup(&[(LOG_FORMAT_VAR, "  ")])).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
