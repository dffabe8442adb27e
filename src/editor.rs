//! Headless schedule settings form
//!
//! Holds the state behind a scheduled-task settings dialog. The cron string
//! is the source of truth: opening the form infers a preset from it, and
//! every structured edit writes a rebuilt cron string back.

use crate::i18n::Translate;
use crate::preset::{
    build_cron_from_preset, infer_schedule_from_cron, Interval, IntervalDraft, IntervalUnit,
    PresetDraft, PresetKind, SchedulePreset, TimeDraft, TimeOfDay, WeekdaySet, DEFAULT_DAY_OF_MONTH,
    DEFAULT_INTERVAL, DEFAULT_WEEKDAY,
};
use crate::summary::{format_schedule_preview, format_schedule_summary};
use crate::task::{ScheduledTask, ScheduledTaskUpdateInput, WorkspaceScope};
use serde::{Deserialize, Serialize};

/// Values a settings dialog reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTaskSettingsValue {
    pub name: String,
    pub cron: String,
    pub timezone: String,
    pub enabled: bool,
    pub reuse_session: bool,
    pub workspace_scope: WorkspaceScope,
}

impl From<&ScheduledTask> for ScheduledTaskSettingsValue {
    fn from(task: &ScheduledTask) -> Self {
        Self {
            name: task.name.clone(),
            cron: task.cron.clone(),
            timezone: task.timezone.clone(),
            enabled: task.enabled,
            reuse_session: task.reuse_session,
            workspace_scope: task.workspace_scope,
        }
    }
}

impl From<ScheduledTaskSettingsValue> for ScheduledTaskUpdateInput {
    fn from(value: ScheduledTaskSettingsValue) -> Self {
        Self {
            name: Some(value.name),
            cron: Some(value.cron),
            timezone: Some(value.timezone),
            enabled: Some(value.enabled),
            reuse_session: Some(value.reuse_session),
            workspace_scope: Some(value.workspace_scope),
            ..Default::default()
        }
    }
}

/// Form state for editing one task's schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEditor {
    value: ScheduledTaskSettingsValue,
    use_cron: bool,
    preset: PresetKind,
    interval_value: u32,
    interval_unit: IntervalUnit,
    time: TimeOfDay,
    week_days: WeekdaySet,
    day_of_month: u32,
}

impl ScheduleEditor {
    /// Open the form on a stored value
    pub fn open(value: ScheduledTaskSettingsValue) -> Self {
        let mut editor = Self {
            value,
            use_cron: false,
            preset: PresetKind::default(),
            interval_value: DEFAULT_INTERVAL,
            interval_unit: IntervalUnit::default(),
            time: TimeOfDay::default(),
            week_days: WeekdaySet::from_days([DEFAULT_WEEKDAY]),
            day_of_month: DEFAULT_DAY_OF_MONTH,
        };
        let preset = infer_schedule_from_cron(&editor.value.cron);
        editor.load(&preset);
        editor
    }

    fn load(&mut self, preset: &SchedulePreset) {
        match preset {
            SchedulePreset::Interval(interval) => {
                self.preset = PresetKind::Interval;
                self.interval_value = interval.value();
                self.interval_unit = interval.unit();
                if let Interval::Hours { at_minute, .. } = interval {
                    self.time.minute = *at_minute;
                }
            }
            SchedulePreset::Daily(time) => {
                self.preset = PresetKind::Daily;
                self.time = *time;
            }
            SchedulePreset::Weekly { days, time } => {
                self.preset = PresetKind::Weekly;
                self.week_days = *days;
                self.time = *time;
            }
            SchedulePreset::Monthly { day, time } => {
                self.preset = PresetKind::Monthly;
                self.day_of_month = *day;
                self.time = *time;
            }
            SchedulePreset::Cron(_) => self.use_cron = true,
        }
    }

    pub fn value(&self) -> &ScheduledTaskSettingsValue {
        &self.value
    }

    pub fn cron(&self) -> &str {
        &self.value.cron
    }

    pub fn use_cron(&self) -> bool {
        self.use_cron
    }

    pub fn preset_kind(&self) -> PresetKind {
        self.preset
    }

    pub fn time(&self) -> TimeOfDay {
        self.time
    }

    pub fn week_days(&self) -> WeekdaySet {
        self.week_days
    }

    pub fn day_of_month(&self) -> u32 {
        self.day_of_month
    }

    pub fn interval(&self) -> (u32, IntervalUnit) {
        (self.interval_value, self.interval_unit)
    }

    /// Draft equivalent of the structured fields
    pub fn draft(&self) -> PresetDraft {
        PresetDraft {
            preset: self.preset,
            interval: Some(IntervalDraft {
                value: Some(self.interval_value.into()),
                unit: self.interval_unit,
            }),
            time: Some(TimeDraft {
                hour: Some(self.time.hour.into()),
                minute: Some(self.time.minute.into()),
            }),
            week_days: self.week_days.iter().map(i64::from).collect(),
            day_of_month: Some(self.day_of_month.into()),
        }
    }

    fn rebuild(&mut self) {
        if !self.use_cron {
            self.value.cron = build_cron_from_preset(&self.draft());
        }
    }

    pub fn set_preset(&mut self, preset: PresetKind) {
        self.preset = preset;
        self.rebuild();
    }

    /// Values below 1 become 1
    pub fn set_interval_value(&mut self, value: i64) {
        self.interval_value = u32::try_from(value.max(1)).unwrap_or(u32::MAX);
        self.rebuild();
    }

    pub fn set_interval_unit(&mut self, unit: IntervalUnit) {
        self.interval_unit = unit;
        self.rebuild();
    }

    /// Set the time from `HH:MM`; returns false and changes nothing if invalid
    pub fn set_time(&mut self, value: &str) -> bool {
        match TimeOfDay::parse(value) {
            Some(time) => {
                self.time = time;
                self.rebuild();
                true
            }
            None => false,
        }
    }

    /// Toggle a weekday (0=Sunday); the last selected day cannot be removed
    pub fn toggle_weekday(&mut self, day: u32) -> bool {
        let changed = if self.week_days.contains(day) {
            self.week_days.len() > 1 && self.week_days.remove(day)
        } else {
            self.week_days.insert(day)
        };
        if changed {
            self.rebuild();
        }
        changed
    }

    /// Clamped to 1-31
    pub fn set_day_of_month(&mut self, day: i64) {
        self.day_of_month = day.clamp(1, 31) as u32;
        self.rebuild();
    }

    /// Switch between raw cron text and the structured fields
    ///
    /// Leaving raw mode loads the preset the text maps to; text no preset
    /// can represent is replaced by the cron built from the current fields.
    pub fn set_use_cron(&mut self, use_cron: bool) {
        if use_cron == self.use_cron {
            return;
        }
        if use_cron {
            self.use_cron = true;
            return;
        }

        self.use_cron = false;
        match infer_schedule_from_cron(&self.value.cron) {
            SchedulePreset::Cron(raw) => {
                tracing::debug!(cron = %raw, "Expression has no preset; rebuilding from fields");
            }
            preset => self.load(&preset),
        }
        self.rebuild();
    }

    /// Replace the raw cron text; only meaningful in raw mode
    pub fn set_cron_text(&mut self, cron: impl Into<String>) {
        if self.use_cron {
            self.value.cron = cron.into();
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.value.name = name.into();
    }

    pub fn set_timezone(&mut self, timezone: impl Into<String>) {
        self.value.timezone = timezone.into();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.value.enabled = enabled;
    }

    pub fn set_reuse_session(&mut self, reuse_session: bool) {
        self.value.reuse_session = reuse_session;
    }

    pub fn set_workspace_scope(&mut self, scope: WorkspaceScope) {
        self.value.workspace_scope = scope;
    }

    pub fn summary<T: Translate + ?Sized>(&self, t: &T) -> String {
        format_schedule_summary(&infer_schedule_from_cron(&self.value.cron), t)
    }

    /// Summary wrapped in the dialog's preview line
    pub fn preview<T: Translate + ?Sized>(&self, t: &T) -> String {
        format_schedule_preview(&infer_schedule_from_cron(&self.value.cron), t)
    }

    pub fn can_save(&self) -> bool {
        !self.value.cron.trim().is_empty()
    }

    /// Final value, or `None` while the cron string is empty
    pub fn save(&self) -> Option<ScheduledTaskSettingsValue> {
        if !self.can_save() {
            return None;
        }
        let mut value = self.value.clone();
        value.cron = value.cron.trim().to_string();
        value.workspace_scope = value.workspace_scope.effective(value.reuse_session);
        Some(value)
    }
}
