//! Configuration for the schedule service and CLI

use crate::error::{Result, ScheduleError};
use crate::i18n::Catalog;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "POCO_SCHEDULE_";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    /// Timezone for tasks created without one
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// Locale used for summaries
    #[serde(default = "default_locale")]
    pub locale: String,
    /// i18next resource file overlaid on the built-in catalog
    #[serde(default)]
    pub translations: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound on tasks claimed per dispatch pass
    #[serde(default = "default_dispatch_limit")]
    pub dispatch_limit: usize,
    /// JSON file backing the task store; in-memory when unset
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            locale: default_locale(),
            translations: None,
            log_level: default_log_level(),
            dispatch_limit: default_dispatch_limit(),
            store_path: None,
        }
    }
}

fn default_timezone() -> String {
    "UTC".into()
}
fn default_locale() -> String {
    "en".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_dispatch_limit() -> usize {
    50
}

impl ScheduleConfig {
    /// Read a JSON config file, then apply `POCO_SCHEDULE_*` overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScheduleError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            ScheduleError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.with_env(|name| std::env::var(name).ok())
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        Self::default().with_env(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, keyed by full variable name
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

        if let Some(tz) = var("TIMEZONE") {
            self.default_timezone = tz;
        }
        if let Some(locale) = var("LOCALE") {
            self.locale = locale;
        }
        if let Some(path) = var("TRANSLATIONS") {
            self.translations = Some(path.into());
        }
        if let Some(level) = var("LOG") {
            self.log_level = level;
        }
        if let Some(limit) = var("DISPATCH_LIMIT") {
            self.dispatch_limit = limit.parse().map_err(|_| {
                ScheduleError::Config(format!("{}DISPATCH_LIMIT must be a number", ENV_PREFIX))
            })?;
        }
        if let Some(path) = var("STORE") {
            self.store_path = Some(path.into());
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        if self.dispatch_limit == 0 {
            return Err(ScheduleError::Config(
                "dispatch_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.default_timezone)
    }

    /// Built-in catalog for `locale`, with `translations` merged on top
    pub fn catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::for_locale(&self.locale);
        if let Some(path) = &self.translations {
            let json = std::fs::read_to_string(path).map_err(|e| {
                ScheduleError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            catalog.merge_json(&json)?;
        }
        Ok(catalog)
    }
}

/// Resolve an IANA timezone name
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimezone(name.to_string()))
}
