//! Date parsing and formatting for `(unixtime, tz_offset)` tuples, as used
//! throughout CVS log output.
//!
//! A `Date` is a `(unixtime, offset)` pair where `unixtime` is true UTC
//! seconds since the epoch and `offset` is the number of seconds *west* of
//! UTC for the zone the date was recorded in (so `unixtime - offset` is the
//! local wall-clock instant). This mirrors Mercurial's `dateutil` module,
//! which this crate is a direct port of.

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// `(unixtime, tz_offset_seconds)`.
pub type Date = (i64, i32);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    Abort(String),
}

/// Format strings tried in order by [`parse_date`] when no explicit format
/// list is given, most specific first.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H%M%S",
    "%Y-%m-%dT%H%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H%M%S",
    "%Y-%m-%d %H%M",
    "%Y-%m-%d %I:%M:%S%p",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M%p",
    "%Y-%m-%d",
    "%m-%d",
    "%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%a %b %d %H:%M:%S %Y",
    "%a %b %d %I:%M:%S%p %Y",
    "%a, %d %b %Y %H:%M:%S",
    "%b %d %H:%M:%S %Y",
    "%b %d %I:%M:%S%p %Y",
    "%b %d %H:%M:%S",
    "%b %d %I:%M:%S%p",
    "%b %d %H:%M",
    "%b %d %I:%M%p",
    "%b %d %Y",
    "%b %d",
    "%H:%M:%S",
    "%I:%M:%S%p",
    "%H:%M",
    "%I:%M%p",
];

const I32_MAX: i64 = i32::MAX as i64;
const I32_MIN: i64 = i32::MIN as i64;

/// Returns the given timestamp (or, if absent, the current time) as a
/// `(unixtime, offset)` tuple based on the local timezone.
pub fn make_date(timestamp: Option<i64>) -> Result<Date, Error> {
    let timestamp = match timestamp {
        Some(t) => t,
        None => Utc::now().timestamp(),
    };
    if timestamp < 0 {
        return Err(Error::Abort(format!("negative timestamp: {}", timestamp)));
    }
    let local_minus_utc = Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.offset().local_minus_utc())
        .unwrap_or(0);
    Ok((timestamp, -local_minus_utc))
}

/// Represents a `(unixtime, offset)` tuple as a localized time string.
///
/// `%1`, `%2`, and `%z` in `format` are replaced with the sign+hour and
/// minutes of the timezone offset before the rest of `format` is applied as
/// a strftime-style pattern.
pub fn date_str(date: Date, format: &str) -> String {
    let (t, tz) = date;
    let mut format = format.to_string();
    if format.contains("%1") || format.contains("%2") || format.contains("%z") {
        let sign = if tz > 0 { '-' } else { '+' };
        let minutes = tz.unsigned_abs() / 60;
        let (q, r) = (minutes / 60, minutes % 60);
        format = format.replace("%z", "%1%2");
        format = format.replace("%1", &format!("{}{:02}", sign, q));
        format = format.replace("%2", &format!("{:02}", r));
    }

    let mut d = t - tz as i64;
    if d > I32_MAX {
        d = I32_MAX;
    } else if d < I32_MIN {
        d = I32_MIN;
    }

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let dt = epoch + chrono::Duration::seconds(d);
    dt.format(&format).to_string()
}

/// Finds a trailing timezone in `s`, returning the offset in seconds (west
/// of UTC) and the remainder of the string with the timezone stripped.
pub fn parse_timezone(s: &str) -> (Option<i32>, &str) {
    if let Some(rest) = s.strip_suffix("GMT").or_else(|| s.strip_suffix("UTC")) {
        return (Some(0), rest.trim_end());
    }

    let bytes = s.as_bytes();
    let len = bytes.len();

    // Unix-style timezones [+-]hhmm
    if len >= 5 {
        let sign_byte = bytes[len - 5];
        let tail = &s[len - 4..];
        if (sign_byte == b'+' || sign_byte == b'-') && tail.bytes().all(|b| b.is_ascii_digit()) {
            let sign: i32 = if sign_byte == b'+' { 1 } else { -1 };
            let hours: i32 = s[len - 4..len - 2].parse().unwrap();
            let minutes: i32 = s[len - 2..].parse().unwrap();
            return (
                Some(-sign * (hours * 60 + minutes) * 60),
                s[..len - 5].trim_end(),
            );
        }
    }

    // ISO8601 trailing Z
    if let Some(rest) = s.strip_suffix('Z') {
        if rest.bytes().last().map(|b| b.is_ascii_digit()).unwrap_or(false) {
            return (Some(0), rest);
        }
    }

    // ISO8601-style [+-]hh:mm
    if len >= 6 {
        let sign_byte = bytes[len - 6];
        if (sign_byte == b'+' || sign_byte == b'-')
            && bytes[len - 3] == b':'
            && s[len - 5..len - 3].bytes().all(|b| b.is_ascii_digit())
            && s[len - 2..].bytes().all(|b| b.is_ascii_digit())
        {
            let sign: i32 = if sign_byte == b'+' { 1 } else { -1 };
            let hours: i32 = s[len - 5..len - 3].parse().unwrap();
            let minutes: i32 = s[len - 2..].parse().unwrap();
            return (Some(-sign * (hours * 60 + minutes) * 60), &s[..len - 6]);
        }
    }

    (None, s)
}

/// Parses a localized time string with an explicit strftime-style format,
/// filling in the less-specific fields (down to seconds) from `defaults`
/// when `format` doesn't mention them.
fn strdate(s: &str, format: &str, defaults: &[(&str, (String, String))]) -> Result<Date, Error> {
    let (offset, remainder) = parse_timezone(s);

    let mut date = remainder.to_string();
    let mut format = format.to_string();
    let mut usenow = false;

    for (part, (bias, now)) in defaults {
        let found = part.chars().any(|p| format.contains(&format!("%{}", p)));
        if !found {
            date.push('@');
            date.push_str(if usenow { now } else { bias });
            format.push_str(&format!("@%{}", part.chars().next().unwrap()));
        } else {
            usenow = true;
        }
    }

    let naive = NaiveDateTime::parse_from_str(&date, &format)
        .map_err(|e| Error::Abort(format!("invalid date: {:?} ({})", s, e)))?;

    let local_unixtime = naive.timestamp();
    let (unixtime, offset) = match offset {
        Some(offset) => (local_unixtime + offset as i64, offset),
        None => {
            // Interpret the parsed wall-clock time in the local zone.
            let local = Local
                .from_local_datetime(&naive)
                .single()
                .unwrap_or_else(|| Local.from_utc_datetime(&naive));
            let unixtime = local.timestamp();
            (unixtime, (unixtime - local_unixtime) as i32)
        }
    };

    Ok((unixtime, offset))
}

/// Parses a localized date/time and returns a `(unixtime, offset)` tuple.
///
/// The date may be a `"unixtime offset"` string, or match one of `formats`
/// (the default ranked list is used when `formats` is empty).
pub fn parse_date(date: &str, formats: &[&str]) -> Result<Date, Error> {
    if date.is_empty() {
        return Ok((0, 0));
    }

    let date = date.trim();
    let formats: &[&str] = if formats.is_empty() {
        DEFAULT_DATE_FORMATS
    } else {
        formats
    };

    if let Some((when, offset)) = parse_unixtime_offset(date) {
        return validate(when, offset);
    }

    let now = make_date(None)?;
    let defaults = build_defaults(now);

    for format in formats {
        if let Ok(result) = strdate(date, format, &defaults) {
            return validate(result.0, result.1);
        }
    }

    Err(Error::Abort(format!("invalid date: {:?}", date)))
}

fn parse_unixtime_offset(date: &str) -> Option<(i64, i32)> {
    let mut parts = date.split(' ');
    let when = parts.next()?.parse::<i64>().ok()?;
    let offset = parts.next()?.parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((when, offset))
}

fn validate(when: i64, offset: i32) -> Result<Date, Error> {
    if !(I32_MIN..=I32_MAX).contains(&when) {
        return Err(Error::Abort(format!("date exceeds 32 bits: {}", when)));
    }
    if !(-50400..=43200).contains(&offset) {
        return Err(Error::Abort(format!(
            "impossible time zone offset: {}",
            offset
        )));
    }
    Ok((when, offset))
}

fn build_defaults(now: Date) -> Vec<(&'static str, (String, String))> {
    let parts = ["S", "M", "HI", "d", "mb", "yY"];
    parts
        .iter()
        .map(|&part| {
            let unit = &part[0..1];
            let bias = if "HMS".contains(unit) {
                "00".to_string()
            } else {
                "0".to_string()
            };
            let now_value = date_str(now, &format!("%{}", unit));
            (part, (bias, now_value))
        })
        .collect()
}
