//! Lightweight UTC timestamps (no chrono dependency).
//!
//! Uses Howard Hinnant's civil date algorithms for conversion between Unix
//! time and calendar fields.

use std::fmt;
use std::sync::LazyLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;
use serde::{Serialize, Serializer};

const MICROS_PER_SEC: i64 = 1_000_000;
const SECS_PER_DAY: i64 = 86_400;

static ISO8601: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})(?:[T ](\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,6}))?)?)?(?:Z|[+-]00:?00)?$",
    )
    .unwrap()
});

/// Instant with microsecond precision, counted from the Unix epoch (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_unix_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(MICROS_PER_SEC))
    }

    pub fn now() -> Self {
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(i64::try_from(since.as_micros()).unwrap_or(i64::MAX))
    }

    pub fn saturating_sub(self, d: Duration) -> Self {
        let micros = i64::try_from(d.as_micros()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(micros))
    }

    /// Build from calendar fields; `None` when any field is out of range.
    pub fn from_civil(
        year: i64,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        micros: u32,
    ) -> Option<Self> {
        if !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
            || second > 59
            || micros > 999_999
        {
            return None;
        }
        let days = days_from_civil(year, month, day);
        let secs = days * SECS_PER_DAY + (hour * 3600 + minute * 60 + second) as i64;
        Some(Self(secs * MICROS_PER_SEC + micros as i64))
    }

    /// Parse the `YYYYMMDD_HHMMSS_micros` stamp used in history file names.
    pub fn parse_file_stamp(date: &str, time: &str, micros: &str) -> Option<Self> {
        if date.len() != 8 || time.len() != 6 {
            return None;
        }
        let year = date.get(0..4)?.parse().ok()?;
        let month = date.get(4..6)?.parse().ok()?;
        let day = date.get(6..8)?.parse().ok()?;
        let hour = time.get(0..2)?.parse().ok()?;
        let minute = time.get(2..4)?.parse().ok()?;
        let second = time.get(4..6)?.parse().ok()?;
        let micros = micros.parse().ok()?;
        Self::from_civil(year, month, day, hour, minute, second, micros)
    }

    /// Parse `YYYY-MM-DD[THH:MM[:SS[.ffffff]]]` as UTC. A trailing `Z` or a
    /// zero offset is accepted; other offsets are not. A bare date means
    /// midnight.
    pub fn parse_iso8601(text: &str) -> Option<Self> {
        let caps = ISO8601.captures(text.trim())?;
        let field = |i: usize| caps.get(i).map_or(Some(0), |m| m.as_str().parse::<u32>().ok());
        let micros = match caps.get(7) {
            Some(m) => format!("{:0<6}", m.as_str()).parse().ok()?,
            None => 0,
        };
        Self::from_civil(
            caps[1].parse().ok()?,
            field(2)?,
            field(3)?,
            field(4)?,
            field(5)?,
            field(6)?,
            micros,
        )
    }

    fn fields(self) -> (i64, u32, u32, u32, u32, u32, u32) {
        let secs = self.0.div_euclid(MICROS_PER_SEC);
        let micros = self.0.rem_euclid(MICROS_PER_SEC) as u32;
        let days = secs.div_euclid(SECS_PER_DAY);
        let tod = secs.rem_euclid(SECS_PER_DAY) as u32;
        let (y, m, d) = civil_from_days(days);
        (y, m, d, tod / 3600, (tod % 3600) / 60, tod % 60, micros)
    }

    /// `YYYYMMDD_HHMMSS_ffffff`, the inverse of [`Timestamp::parse_file_stamp`].
    pub fn to_file_stamp(self) -> String {
        let (y, m, d, hh, mm, ss, us) = self.fields();
        format!("{y:04}{m:02}{d:02}_{hh:02}{mm:02}{ss:02}_{us:06}")
    }

    /// ISO-8601 in UTC, seconds precision.
    pub fn to_iso8601(self) -> String {
        let (y, m, d, hh, mm, ss, _) = self.fields();
        format!("{y:04}-{m:02}-{d:02}T{hh:02}:{mm:02}:{ss:02}Z")
    }

    /// True when `self` lies in `[now - window, now]`, both ends inclusive.
    pub fn within(self, now: Timestamp, window: Duration) -> bool {
        now.saturating_sub(window) <= self && self <= now
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Howard Hinnant's days_from_civil: (year, month, day) → Unix epoch days.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = (if month > 2 { month - 3 } else { month + 9 }) as u64;
    let doy = (153 * mp + 2) / 5 + day as u64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719468
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}
