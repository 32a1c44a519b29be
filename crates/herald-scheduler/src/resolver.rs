//! Start-time parsing and hour arithmetic.
//!
//! Event start times arrive as wall-clock strings, `DD/MM/YYYY HH:MM`, written
//! in the organisation's local zone. Parsing never fails loudly: anything that
//! does not have that exact shape resolves to `None` and the record is skipped
//! for the cycle.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use herald_config::CalendarPolicy;

/// Converts raw start strings into instants in a fixed zone.
#[derive(Debug, Clone, Copy)]
pub struct EventTimeResolver {
    tz: Tz,
    policy: CalendarPolicy,
}

impl EventTimeResolver {
    pub fn new(tz: Tz, policy: CalendarPolicy) -> Self {
        Self { tz, policy }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse `day/month/year hour:minute` into an absolute instant.
    ///
    /// Returns `None` for empty input, a token count other than two, or any
    /// component that is not all digits. Under [`CalendarPolicy::Lenient`]
    /// out-of-range fields roll over (month 13 is January of the next year);
    /// under [`CalendarPolicy::Strict`] they are rejected. Local times that
    /// fall in a DST gap are rejected; ambiguous ones take the earlier instant.
    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        let fields = split_fields(raw)?;
        let local = match self.policy {
            CalendarPolicy::Lenient => lenient_datetime(fields)?,
            CalendarPolicy::Strict => strict_datetime(fields)?,
        };
        let resolved = self.tz.from_local_datetime(&local).earliest()?;
        Some(resolved.with_timezone(&Utc))
    }
}

/// Whole hours from `now` until `start`, floored toward negative infinity.
///
/// A start 24h59m away yields 24; one 30 minutes in the past yields -1.
pub fn hours_until(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (start - now).num_milliseconds().div_euclid(3_600_000)
}

/// Human-readable start: `"25/12/2024 a las 10:00"`.
pub fn format_start(raw: &str) -> String {
    let mut tokens = raw.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(date), Some(time)) => format!("{date} a las {time}"),
        _ => raw.trim().to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fields {
    day: u32,
    month: u32,
    year: i32,
    hour: u32,
    minute: u32,
}

fn split_fields(raw: &str) -> Option<Fields> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let [date, time] = tokens.as_slice() else {
        return None;
    };

    let date: Vec<&str> = date.split('/').collect();
    let time: Vec<&str> = time.split(':').collect();
    let [day, month, year] = date.as_slice() else {
        return None;
    };
    let [hour, minute] = time.as_slice() else {
        return None;
    };

    Some(Fields {
        day: number(day)?,
        month: number(month)?,
        year: number(year)?,
        hour: number(hour)?,
        minute: number(minute)?,
    })
}

/// Digits only; no sign, no whitespace, no empty string.
fn number<T: std::str::FromStr>(part: &str) -> Option<T> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn strict_datetime(f: Fields) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(f.year, f.month, f.day)?;
    let time = NaiveTime::from_hms_opt(f.hour, f.minute, 0)?;
    Some(date.and_time(time))
}

/// Roll every field over into the next unit, starting from the first of the
/// (normalized) month.
fn lenient_datetime(f: Fields) -> Option<NaiveDateTime> {
    let months = i64::from(f.year) * 12 + i64::from(f.month) - 1;
    let year = i32::try_from(months.div_euclid(12)).ok()?;
    let month = u32::try_from(months.rem_euclid(12)).ok()? + 1;

    let first = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    let offset = Duration::days(i64::from(f.day) - 1)
        + Duration::hours(i64::from(f.hour))
        + Duration::minutes(i64::from(f.minute));
    first.checked_add_signed(offset)
}
