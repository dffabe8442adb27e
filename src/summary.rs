//! One-line, localized description of a schedule preset

use crate::i18n::{Translate, KEY_PREFIX};
use crate::preset::{Interval, SchedulePreset, WeekdaySet};

/// Render a preset as a short sentence such as "every 5 minutes" or
/// "every Mon, Wed at 09:00"
///
/// The raw cron fallback is returned unchanged.
pub fn format_schedule_summary<T>(preset: &SchedulePreset, t: &T) -> String
where
    T: Translate + ?Sized,
{
    let key = |name: &str| format!("{}.{}", KEY_PREFIX, name);

    match preset {
        SchedulePreset::Interval(Interval::Minutes(every)) => {
            let count = every.to_string();
            t.translate(&plural_key("summary.everyMinutes", *every), &[("count", &count)])
        }
        SchedulePreset::Interval(Interval::Hours { every, at_minute }) => {
            let count = every.to_string();
            if *at_minute == 0 {
                t.translate(&plural_key("summary.everyHours", *every), &[("count", &count)])
            } else {
                let minute = at_minute.to_string();
                t.translate(
                    &plural_key("summary.everyHoursAt", *every),
                    &[("count", &count), ("minute", &minute)],
                )
            }
        }
        SchedulePreset::Daily(time) => {
            let time = time.to_string();
            t.translate(&key("summary.daily"), &[("time", &time)])
        }
        SchedulePreset::Weekly { days, time } => {
            let days = weekday_list(days, t);
            let time = time.to_string();
            t.translate(&key("summary.weekly"), &[("days", &days), ("time", &time)])
        }
        SchedulePreset::Monthly { day, time } => {
            let day = day.to_string();
            let time = time.to_string();
            t.translate(&key("summary.monthly"), &[("day", &day), ("time", &time)])
        }
        SchedulePreset::Cron(raw) => raw.clone(),
    }
}

/// Summary wrapped in the localized preview line, e.g. "Runs daily at 09:00"
pub fn format_schedule_preview<T>(preset: &SchedulePreset, t: &T) -> String
where
    T: Translate + ?Sized,
{
    let summary = format_schedule_summary(preset, t);
    t.translate(&format!("{}.preview", KEY_PREFIX), &[("summary", &summary)])
}

fn plural_key(name: &str, count: u32) -> String {
    let form = if count == 1 { "one" } else { "other" };
    format!("{}.{}_{}", KEY_PREFIX, name, form)
}

fn weekday_list<T>(days: &WeekdaySet, t: &T) -> String
where
    T: Translate + ?Sized,
{
    let separator = t.translate(&format!("{}.summary.listSeparator", KEY_PREFIX), &[]);
    days.iter_monday_first()
        .map(|day| t.translate(&format!("{}.weekdays.short.{}", KEY_PREFIX, day), &[]))
        .collect::<Vec<_>>()
        .join(&separator)
}
