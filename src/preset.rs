//! Schedule presets and their cron translation
//!
//! A settings dialog offers four friendly recurrences (every N minutes or
//! hours, daily, weekly, monthly). Only the cron string is persisted, so
//! every reopen re-infers the preset from it:
//!
//! ```
//! use poco_schedule::{build_cron_from_preset, infer_schedule_from_cron, PresetDraft};
//!
//! let preset = infer_schedule_from_cron("30 9 * * 1,3,5");
//! let draft = PresetDraft::from_preset(&preset).unwrap();
//! assert_eq!(build_cron_from_preset(&draft), "30 9 * * 1,3,5");
//!
//! // Anything the presets can't express is kept verbatim
//! assert!(infer_schedule_from_cron("0 9-17 * * 1-5").is_cron());
//! ```

use serde::{Deserialize, Serialize};

/// Hour used when a draft carries no time
pub const DEFAULT_HOUR: u32 = 9;
/// Minute used when a draft carries no time
pub const DEFAULT_MINUTE: u32 = 0;
/// Interval used when a draft carries no interval value
pub const DEFAULT_INTERVAL: u32 = 5;
/// Weekday used when a weekly draft selects no days (Monday)
pub const DEFAULT_WEEKDAY: u32 = 1;
/// Day of month used when a monthly draft carries none
pub const DEFAULT_DAY_OF_MONTH: u32 = 1;

/// Wall-clock time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    /// Returns `None` unless hour is 0-23 and minute is 0-59
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour <= 23 && minute <= 59).then_some(Self { hour, minute })
    }

    /// Parse `H:MM` / `HH:MM`
    pub fn parse(value: &str) -> Option<Self> {
        let (hour, minute) = value.trim().split_once(':')?;
        Self::new(hour.parse().ok()?, minute.parse().ok()?)
    }

    fn clamped(self) -> Self {
        Self {
            hour: self.hour.min(23),
            minute: self.minute.min(59),
        }
    }
}

impl Default for TimeOfDay {
    fn default() -> Self {
        Self {
            hour: DEFAULT_HOUR,
            minute: DEFAULT_MINUTE,
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Set of weekdays, 0=Sunday..6=Saturday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Collect days, mapping 7 to Sunday and dropping anything else out of range
    pub fn from_days(days: impl IntoIterator<Item = u32>) -> Self {
        let mut set = Self::empty();
        for day in days {
            set.insert(day);
        }
        set
    }

    /// Returns false if the day is out of range or already present
    pub fn insert(&mut self, day: u32) -> bool {
        match normalize_weekday(day) {
            Some(day) if !self.contains(day) => {
                self.0 |= 1 << day;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, day: u32) -> bool {
        match normalize_weekday(day) {
            Some(day) if self.contains(day) => {
                self.0 &= !(1 << day);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, day: u32) -> bool {
        normalize_weekday(day).is_some_and(|day| self.0 & (1 << day) != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Days in cron order, Sunday first
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..7).filter(move |&day| self.contains(day))
    }

    /// Days in calendar order, Monday first and Sunday last
    pub fn iter_monday_first(&self) -> impl Iterator<Item = u32> + '_ {
        (1..7).chain(0..1).filter(move |&day| self.contains(day))
    }

    fn cron_field(&self) -> String {
        self.iter()
            .map(|day| day.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<u32> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::from_days(iter)
    }
}

fn normalize_weekday(day: u32) -> Option<u32> {
    match day {
        0..=6 => Some(day),
        7 => Some(0),
        _ => None,
    }
}

/// Unit of an interval preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    #[default]
    Minute,
    Hour,
}

/// Repeat every N minutes, or every N hours at a fixed minute of the hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Minutes(u32),
    Hours { every: u32, at_minute: u32 },
}

impl Interval {
    pub fn value(&self) -> u32 {
        match *self {
            Interval::Minutes(every) | Interval::Hours { every, .. } => every,
        }
    }

    pub fn unit(&self) -> IntervalUnit {
        match self {
            Interval::Minutes(_) => IntervalUnit::Minute,
            Interval::Hours { .. } => IntervalUnit::Hour,
        }
    }
}

/// Preset kinds a dialog can edit (the raw cron fallback is not one of them)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    #[default]
    Interval,
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for PresetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresetKind::Interval => write!(f, "interval"),
            PresetKind::Daily => write!(f, "daily"),
            PresetKind::Weekly => write!(f, "weekly"),
            PresetKind::Monthly => write!(f, "monthly"),
        }
    }
}

/// A recurrence, either one of the friendly presets or a raw cron string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchedulePreset {
    Interval(Interval),
    Daily(TimeOfDay),
    Weekly { days: WeekdaySet, time: TimeOfDay },
    Monthly { day: u32, time: TimeOfDay },
    /// Expression none of the presets can represent, kept as given
    Cron(String),
}

impl SchedulePreset {
    /// `None` for the raw cron fallback
    pub fn kind(&self) -> Option<PresetKind> {
        match self {
            SchedulePreset::Interval(_) => Some(PresetKind::Interval),
            SchedulePreset::Daily(_) => Some(PresetKind::Daily),
            SchedulePreset::Weekly { .. } => Some(PresetKind::Weekly),
            SchedulePreset::Monthly { .. } => Some(PresetKind::Monthly),
            SchedulePreset::Cron(_) => None,
        }
    }

    pub fn is_cron(&self) -> bool {
        matches!(self, SchedulePreset::Cron(_))
    }

    pub fn time(&self) -> Option<TimeOfDay> {
        match self {
            SchedulePreset::Daily(time)
            | SchedulePreset::Weekly { time, .. }
            | SchedulePreset::Monthly { time, .. } => Some(*time),
            SchedulePreset::Interval(_) | SchedulePreset::Cron(_) => None,
        }
    }

    /// Render as a five-field cron string
    ///
    /// Out-of-range values are clamped so the result always has five valid
    /// fields; the raw fallback is returned trimmed.
    pub fn to_cron(&self) -> String {
        match self {
            SchedulePreset::Interval(Interval::Minutes(every)) => {
                format!("*/{} * * * *", (*every).max(1))
            }
            SchedulePreset::Interval(Interval::Hours { every, at_minute }) => {
                format!("{} */{} * * *", (*at_minute).min(59), (*every).max(1))
            }
            SchedulePreset::Daily(time) => {
                let time = time.clamped();
                format!("{} {} * * *", time.minute, time.hour)
            }
            SchedulePreset::Weekly { days, time } => {
                let time = time.clamped();
                let days = if days.is_empty() {
                    WeekdaySet::from_days([DEFAULT_WEEKDAY])
                } else {
                    *days
                };
                format!("{} {} * * {}", time.minute, time.hour, days.cron_field())
            }
            SchedulePreset::Monthly { day, time } => {
                let time = time.clamped();
                format!("{} {} {} * *", time.minute, time.hour, (*day).clamp(1, 31))
            }
            SchedulePreset::Cron(raw) => raw.trim().to_string(),
        }
    }
}

/// One field of a cron string, as far as preset inference cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Any,
    Value(u32),
    Step(u32),
    Days(WeekdaySet),
}

impl Token {
    fn parse(field: &str, min: u32, max: u32) -> Option<Self> {
        if field == "*" {
            return Some(Token::Any);
        }
        if let Some(step) = field.strip_prefix("*/") {
            return parse_number(step).filter(|&n| n >= 1).map(Token::Step);
        }
        parse_number(field)
            .filter(|n| (min..=max).contains(n))
            .map(Token::Value)
    }

    fn parse_weekday(field: &str) -> Option<Self> {
        if field == "*" || field.starts_with("*/") {
            return Token::parse(field, 0, 7);
        }
        let mut days = WeekdaySet::empty();
        for item in field.split(',') {
            let day = parse_number(item).and_then(normalize_weekday)?;
            days.insert(day);
        }
        Some(Token::Days(days))
    }
}

/// Plain decimal digits only; rejects signs, blanks and other syntax
fn parse_number(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Classify a cron string as one of the friendly presets
///
/// Never fails: input that is malformed or that no preset can express comes
/// back as [`SchedulePreset::Cron`] carrying the input unchanged.
pub fn infer_schedule_from_cron(cron: &str) -> SchedulePreset {
    match classify(cron) {
        Some(preset) => preset,
        None => {
            tracing::debug!(cron, "No schedule preset matches; keeping raw cron");
            SchedulePreset::Cron(cron.to_string())
        }
    }
}

fn classify(cron: &str) -> Option<SchedulePreset> {
    let fields: Vec<&str> = cron.split_whitespace().collect();
    let [minute, hour, day, month, weekday] = fields.as_slice() else {
        return None;
    };

    let minute = Token::parse(minute, 0, 59)?;
    let hour = Token::parse(hour, 0, 23)?;
    let day = Token::parse(day, 1, 31)?;
    let month = Token::parse(month, 1, 12)?;
    let weekday = Token::parse_weekday(weekday)?;

    use Token::{Any, Days, Step, Value};
    let preset = match (minute, hour, day, month, weekday) {
        (Step(every), Any, Any, Any, Any) => SchedulePreset::Interval(Interval::Minutes(every)),
        (Value(at_minute), Step(every), Any, Any, Any) => {
            SchedulePreset::Interval(Interval::Hours { every, at_minute })
        }
        (Value(minute), Value(hour), Any, Any, Any) => {
            SchedulePreset::Daily(TimeOfDay { hour, minute })
        }
        (Value(minute), Value(hour), Any, Any, Days(days)) => SchedulePreset::Weekly {
            days,
            time: TimeOfDay { hour, minute },
        },
        (Value(minute), Value(hour), Value(day), Any, Any) => SchedulePreset::Monthly {
            day,
            time: TimeOfDay { hour, minute },
        },
        _ => return None,
    };
    Some(preset)
}

/// Interval part of a [`PresetDraft`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntervalDraft {
    #[serde(default)]
    pub value: Option<i64>,
    #[serde(default)]
    pub unit: IntervalUnit,
}

/// Time part of a [`PresetDraft`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeDraft {
    #[serde(default)]
    pub hour: Option<i64>,
    #[serde(default)]
    pub minute: Option<i64>,
}

/// Loosely typed form input for [`build_cron_from_preset`]
///
/// Mirrors what a dialog holds: every field is present, only those relevant
/// to `preset` are read, and any of them may be missing or out of range.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetDraft {
    #[serde(default)]
    pub preset: PresetKind,
    #[serde(default)]
    pub interval: Option<IntervalDraft>,
    #[serde(default)]
    pub time: Option<TimeDraft>,
    #[serde(default)]
    pub week_days: Vec<i64>,
    #[serde(default)]
    pub day_of_month: Option<i64>,
}

impl PresetDraft {
    /// Draft that rebuilds `preset`, or `None` for the raw cron fallback
    pub fn from_preset(preset: &SchedulePreset) -> Option<Self> {
        let mut draft = Self {
            preset: preset.kind()?,
            ..Self::default()
        };
        if let Some(time) = preset.time() {
            draft.time = Some(TimeDraft {
                hour: Some(time.hour.into()),
                minute: Some(time.minute.into()),
            });
        }
        match preset {
            SchedulePreset::Interval(interval) => {
                draft.interval = Some(IntervalDraft {
                    value: Some(interval.value().into()),
                    unit: interval.unit(),
                });
                if let Interval::Hours { at_minute, .. } = interval {
                    draft.time = Some(TimeDraft {
                        hour: None,
                        minute: Some((*at_minute).into()),
                    });
                }
            }
            SchedulePreset::Weekly { days, .. } => {
                draft.week_days = days.iter().map(i64::from).collect();
            }
            SchedulePreset::Monthly { day, .. } => {
                draft.day_of_month = Some((*day).into());
            }
            SchedulePreset::Daily(_) | SchedulePreset::Cron(_) => {}
        }
        Some(draft)
    }

    /// Fill in defaults and clamp every value into range
    pub fn resolve(&self) -> SchedulePreset {
        let time = self.time.unwrap_or_default();
        let time = TimeOfDay {
            hour: clamp_or(time.hour, 0, 23, DEFAULT_HOUR),
            minute: clamp_or(time.minute, 0, 59, DEFAULT_MINUTE),
        };

        match self.preset {
            PresetKind::Interval => {
                let interval = self.interval.unwrap_or_default();
                let every = clamp_or(interval.value, 1, u32::MAX, DEFAULT_INTERVAL);
                SchedulePreset::Interval(match interval.unit {
                    IntervalUnit::Minute => Interval::Minutes(every),
                    IntervalUnit::Hour => Interval::Hours {
                        every,
                        at_minute: time.minute,
                    },
                })
            }
            PresetKind::Daily => SchedulePreset::Daily(time),
            PresetKind::Weekly => {
                let mut days: WeekdaySet = self
                    .week_days
                    .iter()
                    .filter_map(|&day| u32::try_from(day).ok())
                    .collect();
                if days.is_empty() {
                    days.insert(DEFAULT_WEEKDAY);
                }
                SchedulePreset::Weekly { days, time }
            }
            PresetKind::Monthly => SchedulePreset::Monthly {
                day: clamp_or(self.day_of_month, 1, 31, DEFAULT_DAY_OF_MONTH),
                time,
            },
        }
    }
}

fn clamp_or(value: Option<i64>, min: u32, max: u32, default: u32) -> u32 {
    match value {
        Some(v) => v.clamp(i64::from(min), i64::from(max)) as u32,
        None => default,
    }
}

/// Build the cron string for a dialog draft
///
/// Total: missing or out-of-range inputs fall back to defaults (09:00,
/// every 5 minutes, Monday, day 1) or are clamped into range.
pub fn build_cron_from_preset(draft: &PresetDraft) -> String {
    draft.resolve().to_cron()
}
