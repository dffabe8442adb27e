//! Translation seam for user-facing schedule text
//!
//! Formatters take a [`Translate`] implementation as an argument instead of
//! reaching for a process-wide instance. Keys and `{{name}}` placeholders
//! follow i18next conventions so the frontend's locale files can be loaded
//! as-is with [`Catalog::merge_json`].

use crate::error::{Result, ScheduleError};
use std::collections::HashMap;

/// Key prefix shared by every schedule string
pub const KEY_PREFIX: &str = "library.scheduledTasks.schedule";

/// Something that turns a key plus named arguments into display text
pub trait Translate {
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String;
}

impl<F> Translate for F
where
    F: Fn(&str, &[(&str, &str)]) -> String,
{
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String {
        self(key, args)
    }
}

const ENGLISH: &[(&str, &str)] = &[
    ("summary.everyMinutes_one", "every minute"),
    ("summary.everyMinutes_other", "every {{count}} minutes"),
    ("summary.everyHours_one", "every hour"),
    ("summary.everyHours_other", "every {{count}} hours"),
    ("summary.everyHoursAt_one", "every hour at minute {{minute}}"),
    ("summary.everyHoursAt_other", "every {{count}} hours at minute {{minute}}"),
    ("summary.daily", "daily at {{time}}"),
    ("summary.weekly", "every {{days}} at {{time}}"),
    ("summary.monthly", "on day {{day}} of each month at {{time}}"),
    ("summary.listSeparator", ", "),
    ("weekdays.short.0", "Sun"),
    ("weekdays.short.1", "Mon"),
    ("weekdays.short.2", "Tue"),
    ("weekdays.short.3", "Wed"),
    ("weekdays.short.4", "Thu"),
    ("weekdays.short.5", "Fri"),
    ("weekdays.short.6", "Sat"),
    ("preview", "Runs {{summary}}"),
];

const CHINESE: &[(&str, &str)] = &[
    ("summary.everyMinutes_one", "每分钟"),
    ("summary.everyMinutes_other", "每 {{count}} 分钟"),
    ("summary.everyHours_one", "每小时"),
    ("summary.everyHours_other", "每 {{count}} 小时"),
    ("summary.everyHoursAt_one", "每小时的第 {{minute}} 分钟"),
    ("summary.everyHoursAt_other", "每 {{count}} 小时的第 {{minute}} 分钟"),
    ("summary.daily", "每天 {{time}}"),
    ("summary.weekly", "每{{days}} {{time}}"),
    ("summary.monthly", "每月 {{day}} 日 {{time}}"),
    ("summary.listSeparator", "、"),
    ("weekdays.short.0", "周日"),
    ("weekdays.short.1", "周一"),
    ("weekdays.short.2", "周二"),
    ("weekdays.short.3", "周三"),
    ("weekdays.short.4", "周四"),
    ("weekdays.short.5", "周五"),
    ("weekdays.short.6", "周六"),
    ("preview", "执行时间：{{summary}}"),
];

/// Key-to-template table for one locale
///
/// Lookups of unknown keys return the key itself, so a missing entry shows
/// up in the UI instead of failing.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    locale: String,
    entries: HashMap<String, String>,
}

impl Catalog {
    /// Empty catalog
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            entries: HashMap::new(),
        }
    }

    /// Built-in English strings
    pub fn english() -> Self {
        Self::from_table("en", ENGLISH)
    }

    /// Built-in Simplified Chinese strings
    pub fn chinese() -> Self {
        Self::from_table("zh", CHINESE)
    }

    /// Built-in catalog for a locale tag such as `zh-CN`; English otherwise
    pub fn for_locale(locale: &str) -> Self {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match language.as_str() {
            "zh" => Self::chinese(),
            _ => Self::english(),
        }
    }

    fn from_table(locale: &str, table: &[(&str, &str)]) -> Self {
        let mut catalog = Self::new(locale);
        for (key, template) in table {
            catalog.insert(format!("{}.{}", KEY_PREFIX, key), *template);
        }
        catalog
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.entries.insert(key.into(), template.into());
    }

    /// Overlay entries from an i18next resource file
    ///
    /// Nested objects are flattened into dotted keys; non-string leaves are
    /// rejected.
    pub fn merge_json(&mut self, json: &str) -> Result<usize> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Object(map) = value else {
            return Err(ScheduleError::Config(
                "translation file must contain a JSON object".to_string(),
            ));
        };

        let mut merged = 0;
        let mut stack: Vec<(String, serde_json::Value)> = map.into_iter().collect();
        while let Some((key, value)) = stack.pop() {
            match value {
                serde_json::Value::String(template) => {
                    self.insert(key, template);
                    merged += 1;
                }
                serde_json::Value::Object(children) => {
                    stack.extend(
                        children
                            .into_iter()
                            .map(|(child, value)| (format!("{}.{}", key, child), value)),
                    );
                }
                other => {
                    return Err(ScheduleError::Config(format!(
                        "translation '{}' must be a string, got {}",
                        key, other
                    )));
                }
            }
        }

        tracing::debug!(locale = %self.locale, merged, "Merged translations");
        Ok(merged)
    }
}

impl Translate for Catalog {
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String {
        match self.entries.get(key) {
            Some(template) => interpolate(template, args),
            None => key.to_string(),
        }
    }
}

/// Replace `{{name}}` placeholders; unknown placeholders are left in place
pub fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };

        let name = after[..end].trim();
        match args.iter().find(|(arg, _)| *arg == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}
