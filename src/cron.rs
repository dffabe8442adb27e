//! Five-field cron expression evaluator
//!
//! Validates stored schedules and computes the next run time in a task's
//! timezone. Supports the usual syntax:
//!
//! ```text
//! ┌───────────── minute (0-59)
//! │ ┌───────────── hour (0-23)
//! │ │ ┌───────────── day of month (1-31)
//! │ │ │ ┌───────────── month (1-12)
//! │ │ │ │ ┌───────────── day of week (0-7, 0 and 7 are Sunday)
//! │ │ │ │ │
//! * * * * *
//! ```
//!
//! Lists (`1,3,5`), ranges (`1-5`) and steps (`*/5`, `0-30/10`) may be
//! combined. When both day-of-month and day-of-week are restricted a time
//! matches if either one does.

use crate::error::{Result, ScheduleError};
use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use std::collections::BTreeSet;

/// How far ahead `next_after` searches before giving up
const SEARCH_DAYS: i64 = 4 * 366;

/// Longest repeated wall-clock span a DST fall-back can produce
const FOLD_WINDOW_MINUTES: i64 = 120;

/// A parsed cron expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    minutes: BTreeSet<u32>,
    hours: BTreeSet<u32>,
    days: BTreeSet<u32>,
    months: BTreeSet<u32>,
    weekdays: BTreeSet<u32>,
    days_restricted: bool,
    weekdays_restricted: bool,
}

impl CronExpression {
    /// Parse a cron expression string
    ///
    /// # Examples
    ///
    /// ```
    /// use poco_schedule::CronExpression;
    ///
    /// assert!(CronExpression::parse("*/5 * * * *").is_ok());
    /// assert!(CronExpression::parse("30 9 * * 1-5").is_ok());
    /// assert!(CronExpression::parse("61 * * * *").is_err());
    /// ```
    pub fn parse(expression: &str) -> Result<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ScheduleError::InvalidExpression(format!(
                "expected 5 fields, got {}",
                fields.len()
            )));
        }

        let mut weekdays = expand_field(fields[4], 0, 7, "weekday")?;
        if weekdays.remove(&7) {
            weekdays.insert(0);
        }

        Ok(Self {
            source: fields.join(" "),
            minutes: expand_field(fields[0], 0, 59, "minute")?,
            hours: expand_field(fields[1], 0, 23, "hour")?,
            days: expand_field(fields[2], 1, 31, "day of month")?,
            months: expand_field(fields[3], 1, 12, "month")?,
            weekdays,
            days_restricted: !fields[2].starts_with('*'),
            weekdays_restricted: !fields[4].starts_with('*'),
        })
    }

    /// The expression with whitespace normalized to single spaces
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check whether a datetime falls on this schedule, using its wall clock
    pub fn matches<Z: TimeZone>(&self, dt: &DateTime<Z>) -> bool {
        let local = dt.naive_local();
        self.minutes.contains(&local.minute())
            && self.hours.contains(&local.hour())
            && self.date_matches(local.date())
    }

    /// Next matching minute strictly after `after`, in UTC
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_after_in(&after)
    }

    /// Next matching minute strictly after `after`, evaluated in `tz` and
    /// returned in UTC
    pub fn next_after_tz(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        self.next_after_in(&after.with_timezone(&tz))
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Next matching minute strictly after `after`, in `after`'s timezone
    ///
    /// Local times skipped by a DST transition never match. When the hour
    /// field is `*`, a repeated hour runs in both passes; otherwise a
    /// repeated local time runs once, at the earliest instant after `after`.
    pub fn next_after_in<Z: TimeZone>(&self, after: &DateTime<Z>) -> Option<DateTime<Z>> {
        let tz = after.timezone();

        if self.hours.len() == 24 {
            // Walk real instants first so the second pass of a repeated hour
            // is not lost to the wall-clock walk below
            let first = after.timestamp().div_euclid(60) * 60 + 60;
            for step in 0..FOLD_WINDOW_MINUTES {
                let instant = Utc
                    .timestamp_opt(first + step * 60, 0)
                    .single()?
                    .with_timezone(&tz);
                if self.matches(&instant) {
                    return Some(instant);
                }
            }
        }

        let local = after.naive_local();
        let mut current = truncate_to_minute(local)? + Duration::minutes(1);
        let limit = current + Duration::days(SEARCH_DAYS);

        while current <= limit {
            if !self.date_matches(current.date()) {
                current = current.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.hours.contains(&current.hour()) {
                current = current.date().and_hms_opt(current.hour(), 0, 0)? + Duration::hours(1);
                continue;
            }
            if self.minutes.contains(&current.minute()) {
                match tz.from_local_datetime(&current) {
                    LocalResult::Single(dt) => return Some(dt),
                    LocalResult::Ambiguous(early, late) => {
                        if early > *after {
                            return Some(early);
                        }
                        if late > *after {
                            return Some(late);
                        }
                    }
                    LocalResult::None => {}
                }
            }
            current += Duration::minutes(1);
        }

        None
    }

    /// Plain English description, used for logs and the CLI
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();

        match (self.minutes.len(), self.hours.len()) {
            (60, 24) => parts.push("every minute".to_string()),
            (1, 1) => {
                let minute = first(&self.minutes);
                let hour = first(&self.hours);
                parts.push(format!("at {:02}:{:02}", hour, minute));
            }
            (1, 24) => parts.push(format!("at minute {} of every hour", first(&self.minutes))),
            _ => {
                parts.push(format!("at minutes {}", join(&self.minutes)));
                if self.hours.len() < 24 {
                    parts.push(format!("during hours {}", join(&self.hours)));
                }
            }
        }

        if self.days.len() < 31 {
            parts.push(format!("on day {} of the month", join(&self.days)));
        }
        if self.months.len() < 12 {
            parts.push(format!("in months {}", join(&self.months)));
        }
        if self.weekdays.len() < 7 {
            let names: Vec<&str> = self.weekdays.iter().map(|&d| weekday_name(d)).collect();
            let either = self.days_restricted && self.weekdays_restricted;
            let joiner = if either { "or on" } else { "on" };
            parts.push(format!("{} {}", joiner, names.join(", ")));
        }

        parts.join(", ")
    }

    fn date_matches(&self, date: NaiveDate) -> bool {
        if !self.months.contains(&date.month()) {
            return false;
        }
        let day = self.days.contains(&date.day());
        let weekday = self
            .weekdays
            .contains(&date.weekday().num_days_from_sunday());
        // Fields written with a leading `*` only decide OR vs AND; their
        // sets (`*/2` included) still filter
        if self.days_restricted && self.weekdays_restricted {
            day || weekday
        } else {
            day && weekday
        }
    }
}

impl std::fmt::Display for CronExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for CronExpression {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Short English weekday name, 0=Sunday
pub(crate) fn weekday_name(day: u32) -> &'static str {
    match day {
        0 | 7 => "Sun",
        1 => "Mon",
        2 => "Tue",
        3 => "Wed",
        4 => "Thu",
        5 => "Fri",
        6 => "Sat",
        _ => "?",
    }
}

fn truncate_to_minute(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    dt.date().and_hms_opt(dt.hour(), dt.minute(), 0)
}

fn first(set: &BTreeSet<u32>) -> u32 {
    set.iter().next().copied().unwrap_or_default()
}

fn join(set: &BTreeSet<u32>) -> String {
    set.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Expand one field into the set of values it allows
fn expand_field(field: &str, min: u32, max: u32, name: &str) -> Result<BTreeSet<u32>> {
    let invalid = |detail: String| ScheduleError::InvalidExpression(format!("{} in {}", detail, name));
    let mut values = BTreeSet::new();

    for item in field.split(',') {
        if item.is_empty() {
            return Err(invalid("empty list item".to_string()));
        }

        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| invalid(format!("invalid step '{}'", step)))?;
                if step == 0 {
                    return Err(invalid("step must be at least 1".to_string()));
                }
                (range, step)
            }
            None => (item, 1),
        };

        let (start, end) = if range == "*" {
            (min, max)
        } else if let Some((lo, hi)) = range.split_once('-') {
            (parse_value(lo, min, max, &invalid)?, parse_value(hi, min, max, &invalid)?)
        } else {
            let value = parse_value(range, min, max, &invalid)?;
            // `5/15` means "from 5 to the end, every 15"
            if item.contains('/') {
                (value, max)
            } else {
                (value, value)
            }
        };

        if start > end {
            return Err(invalid(format!("inverted range {}-{}", start, end)));
        }

        values.extend((start..=end).step_by(step as usize));
    }

    Ok(values)
}

fn parse_value(
    raw: &str,
    min: u32,
    max: u32,
    invalid: &impl Fn(String) -> ScheduleError,
) -> Result<u32> {
    let value: u32 = raw
        .parse()
        .map_err(|_| invalid(format!("invalid value '{}'", raw)))?;
    if value < min || value > max {
        return Err(invalid(format!(
            "value {} out of range ({}-{})",
            value, min, max
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_parse_wildcards() {
        let expr = CronExpression::parse("* * * * *").unwrap();
        assert_eq!(expr.minutes.len(), 60);
        assert_eq!(expr.hours.len(), 24);
        assert_eq!(expr.days.len(), 31);
        assert_eq!(expr.months.len(), 12);
        assert_eq!(expr.weekdays.len(), 7);
        assert!(!expr.days_restricted);
        assert!(!expr.weekdays_restricted);
    }

    #[test]
    fn test_parse_steps_ranges_lists() {
        let expr = CronExpression::parse("0-30/10 9-11 1,15 */6 1-5").unwrap();
        assert_eq!(expr.minutes, BTreeSet::from([0, 10, 20, 30]));
        assert_eq!(expr.hours, BTreeSet::from([9, 10, 11]));
        assert_eq!(expr.days, BTreeSet::from([1, 15]));
        assert_eq!(expr.months, BTreeSet::from([1, 7]));
        assert_eq!(expr.weekdays, BTreeSet::from([1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_parse_offset_step() {
        let expr = CronExpression::parse("5/20 * * * *").unwrap();
        assert_eq!(expr.minutes, BTreeSet::from([5, 25, 45]));
    }

    #[test]
    fn test_sunday_as_seven() {
        let expr = CronExpression::parse("0 9 * * 7").unwrap();
        assert_eq!(expr.weekdays, BTreeSet::from([0]));
    }

    #[test]
    fn test_normalizes_whitespace() {
        let expr = CronExpression::parse("  0   9 * *\t1 ").unwrap();
        assert_eq!(expr.as_str(), "0 9 * * 1");
        assert_eq!(expr.to_string(), "0 9 * * 1");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "* * *",
            "* * * * * *",
            "60 * * * *",
            "* 24 * * *",
            "* * 0 * *",
            "* * * 13 *",
            "* * * * 8",
            "*/0 * * * *",
            "30-10 * * * *",
            "1,,2 * * * *",
            "a * * * *",
        ] {
            assert!(CronExpression::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_next_after_hourly() {
        let expr = CronExpression::parse("0 * * * *").unwrap();
        let next = expr.next_after(utc(2026, 2, 5, 10, 30)).unwrap();
        assert_eq!(next, utc(2026, 2, 5, 11, 0));
    }

    #[test]
    fn test_next_after_is_strict() {
        let expr = CronExpression::parse("30 14 * * *").unwrap();
        let next = expr.next_after(utc(2026, 2, 5, 14, 30)).unwrap();
        assert_eq!(next, utc(2026, 2, 6, 14, 30));
    }

    #[test]
    fn test_next_after_ignores_seconds() {
        let expr = CronExpression::parse("* * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 2, 5, 10, 0, 45).unwrap();
        assert_eq!(expr.next_after(after).unwrap(), utc(2026, 2, 5, 10, 1));
    }

    #[test]
    fn test_next_after_monthly_skips_short_months() {
        let expr = CronExpression::parse("0 9 31 * *").unwrap();
        let next = expr.next_after(utc(2026, 4, 1, 0, 0)).unwrap();
        assert_eq!(next, utc(2026, 5, 31, 9, 0));
    }

    #[test]
    fn test_next_after_day_or_weekday() {
        // 2026-02-02 is a Monday
        let expr = CronExpression::parse("0 9 15 * 1").unwrap();
        let next = expr.next_after(utc(2026, 2, 1, 12, 0)).unwrap();
        assert_eq!(next, utc(2026, 2, 2, 9, 0));
    }

    #[test]
    fn test_next_after_impossible_date() {
        let expr = CronExpression::parse("0 0 30 2 *").unwrap();
        assert!(expr.next_after(utc(2026, 1, 1, 0, 0)).is_none());
    }

    #[test]
    fn test_next_after_in_timezone() {
        let expr = CronExpression::parse("0 9 * * *").unwrap();
        let tz: Tz = "Asia/Shanghai".parse().unwrap();
        // 02:00 UTC is 10:00 in Shanghai, so the next 09:00 local is tomorrow
        let next = expr.next_after_tz(utc(2026, 3, 10, 2, 0), tz).unwrap();
        assert_eq!(next, utc(2026, 3, 11, 1, 0));
    }

    #[test]
    fn test_next_after_skips_dst_gap() {
        // 2026-03-08 02:30 does not exist in New York
        let expr = CronExpression::parse("30 2 * * *").unwrap();
        let tz: Tz = "America/New_York".parse().unwrap();
        let next = expr.next_after_tz(utc(2026, 3, 8, 5, 0), tz).unwrap();
        assert_eq!(next.with_timezone(&tz).day(), 9);
    }

    #[test]
    fn test_next_after_dst_overlap() {
        // 2026-11-01 01:30 happens twice in New York (EDT then EST)
        let expr = CronExpression::parse("30 1 * * *").unwrap();
        let tz: Tz = "America/New_York".parse().unwrap();

        let next = expr.next_after_tz(utc(2026, 11, 1, 4, 0), tz).unwrap();
        assert_eq!(next, utc(2026, 11, 1, 5, 30));

        // Runs once per wall-clock day
        let following = expr.next_after_tz(next, tz).unwrap();
        assert_eq!(following, utc(2026, 11, 2, 6, 30));

        // From inside the repeated hour, only the later instant is ahead
        let next = expr.next_after_tz(utc(2026, 11, 1, 6, 10), tz).unwrap();
        assert_eq!(next, utc(2026, 11, 1, 6, 30));
    }

    #[test]
    fn test_next_after_dst_overlap_sub_hourly() {
        // Every 30 minutes keeps firing through both passes of 01:00-02:00
        let expr = CronExpression::parse("*/30 * * * *").unwrap();
        let tz: Tz = "America/New_York".parse().unwrap();

        let mut after = utc(2026, 11, 1, 5, 0);
        let mut runs = Vec::new();
        for _ in 0..4 {
            after = expr.next_after_tz(after, tz).unwrap();
            runs.push(after);
        }
        assert_eq!(
            runs,
            vec![
                utc(2026, 11, 1, 5, 30),
                utc(2026, 11, 1, 6, 0),
                utc(2026, 11, 1, 6, 30),
                utc(2026, 11, 1, 7, 0),
            ]
        );
    }

    #[test]
    fn test_day_of_month_step() {
        let expr = CronExpression::parse("0 9 */2 * *").unwrap();
        assert!(!expr.matches(&utc(2026, 3, 2, 9, 0)));
        assert!(expr.matches(&utc(2026, 3, 3, 9, 0)));
        let next = expr.next_after(utc(2026, 3, 1, 9, 0)).unwrap();
        assert_eq!(next, utc(2026, 3, 3, 9, 0));
    }

    #[test]
    fn test_day_of_week_step() {
        // */2 is Sun, Tue, Thu, Sat; 2026-03-02 is a Monday
        let expr = CronExpression::parse("0 9 * * */2").unwrap();
        assert!(!expr.matches(&utc(2026, 3, 2, 9, 0)));
        let next = expr.next_after(utc(2026, 3, 1, 9, 0)).unwrap();
        assert_eq!(next, utc(2026, 3, 3, 9, 0));
    }

    #[test]
    fn test_step_field_combines_with_and() {
        // Day-of-month step with a weekday list: both must hold
        let expr = CronExpression::parse("0 9 */2 * 1").unwrap();
        // Monday 2026-03-02 is an even day, Monday 2026-03-09 is odd
        assert!(!expr.matches(&utc(2026, 3, 2, 9, 0)));
        assert!(expr.matches(&utc(2026, 3, 9, 9, 0)));
    }

    #[test]
    fn test_matches() {
        let expr = CronExpression::parse("30 14 * * 1").unwrap();
        assert!(expr.matches(&utc(2026, 2, 2, 14, 30)));
        assert!(!expr.matches(&utc(2026, 2, 3, 14, 30)));
    }

    #[test]
    fn test_describe() {
        let desc = CronExpression::parse("0 9 * * 1-5").unwrap().describe();
        assert_eq!(desc, "at 09:00, on Mon, Tue, Wed, Thu, Fri");

        let desc = CronExpression::parse("* * * * *").unwrap().describe();
        assert_eq!(desc, "every minute");

        let desc = CronExpression::parse("15 * * * *").unwrap().describe();
        assert_eq!(desc, "at minute 15 of every hour");
    }
}
