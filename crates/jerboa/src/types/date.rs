//! Date arithmetic over milliseconds-since-epoch doubles.
//!
//! Calendar splitting uses proleptic Gregorian day counts (the civil
//! algorithms), so no time crate is involved in the math itself; `chrono`
//! supplies only the wall clock and the local UTC offset.

use chrono::{Local, Offset, TimeZone};

pub(crate) const MS_PER_DAY: f64 = 86_400_000.0;
pub(crate) const MS_PER_HOUR: f64 = 3_600_000.0;
pub(crate) const MS_PER_MINUTE: f64 = 60_000.0;
pub(crate) const MS_PER_SECOND: f64 = 1000.0;

/// Largest representable time value, per the classic ±100,000,000 days.
const MAX_TIME_MS: f64 = 8.64e15;

#[derive(Debug, Clone, Copy)]
pub(crate) struct DateParts {
    pub year: i64,
    /// 0-based month.
    pub month: u32,
    /// 1-based day of month.
    pub day: u32,
    /// 0 = Sunday.
    pub weekday: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub millis: u32,
}

pub(crate) fn now_ms() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

/// Seconds east of UTC for the local zone at the given instant.
pub(crate) fn local_offset_seconds(ms: f64) -> i64 {
    if !ms.is_finite() {
        return 0;
    }
    match Local.timestamp_millis_opt(ms as i64) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            i64::from(dt.offset().fix().local_minus_utc())
        }
        chrono::LocalResult::None => 0,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian civil date.
pub(crate) fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = year - i64::from(month <= 2);
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let m = i64::from(month);
    let doy = ((153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5) as u64 + u64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe as i64 - 719_468
}

/// Civil date from days since the epoch.
pub(crate) fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (y + i64::from(m <= 2), m, d)
}

/// Splits a (possibly zone-shifted) millisecond value into calendar parts.
/// The caller is responsible for adding the local offset first when local
/// parts are wanted.
pub(crate) fn ms_to_parts(ms: f64) -> Option<DateParts> {
    if !ms.is_finite() || ms.abs() > MAX_TIME_MS {
        return None;
    }
    let days = (ms / MS_PER_DAY).floor() as i64;
    let mut rem = ms - days as f64 * MS_PER_DAY;
    if rem < 0.0 {
        rem += MS_PER_DAY;
    }
    let rem = rem as u64;
    let (year, month, day) = civil_from_days(days);
    let weekday = ((days % 7) + 11) as u32 % 7; // day 0 was a Thursday
    Some(DateParts {
        year,
        month: month - 1,
        day,
        weekday,
        hours: (rem / 3_600_000) as u32,
        minutes: (rem / 60_000 % 60) as u32,
        seconds: (rem / 1000 % 60) as u32,
        millis: (rem % 1000) as u32,
    })
}

/// Builds a UTC millisecond value from calendar fields. Out-of-range fields
/// carry over arithmetically (month 12 is January of the next year).
pub(crate) fn parts_to_ms(
    year: f64,
    month: f64,
    day: f64,
    hours: f64,
    minutes: f64,
    seconds: f64,
    millis: f64,
) -> f64 {
    if [year, month, day, hours, minutes, seconds, millis]
        .iter()
        .any(|v| !v.is_finite())
    {
        return f64::NAN;
    }
    let month_index = month.trunc() as i64;
    let carried_year = year.trunc() as i64 + month_index.div_euclid(12);
    let normalized_month = month_index.rem_euclid(12) as u32 + 1;
    let days = days_from_civil(carried_year, normalized_month, 1);
    let total = (days as f64 + (day.trunc() - 1.0)) * MS_PER_DAY
        + hours.trunc() * MS_PER_HOUR
        + minutes.trunc() * MS_PER_MINUTE
        + seconds.trunc() * MS_PER_SECOND
        + millis.trunc();
    if total.abs() > MAX_TIME_MS {
        f64::NAN
    } else {
        total
    }
}

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Canonical `"Www Mmm dd yyyy hh:mm:ss GMT"` rendering.
pub(crate) fn format_utc(ms: f64) -> String {
    let Some(parts) = ms_to_parts(ms) else {
        return "Invalid Date".to_owned();
    };
    format!(
        "{} {} {:02} {} {:02}:{:02}:{:02} GMT",
        WEEKDAYS[parts.weekday as usize],
        MONTHS[parts.month as usize],
        parts.day,
        parts.year,
        parts.hours,
        parts.minutes,
        parts.seconds,
    )
}

/// `yyyy-mm-ddThh:mm:ss.sssZ`.
pub(crate) fn format_iso(ms: f64) -> Option<String> {
    let parts = ms_to_parts(ms)?;
    Some(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        parts.year,
        parts.month + 1,
        parts.day,
        parts.hours,
        parts.minutes,
        parts.seconds,
        parts.millis,
    ))
}

/// `Date.parse`: the restricted ISO-8601 subset and the canonical UTC form
/// produced by `format_utc`. Anything else is NaN.
pub(crate) fn parse_date(text: &str) -> f64 {
    let trimmed = text.trim();
    if let Some(ms) = parse_iso(trimmed) {
        return ms;
    }
    if let Some(ms) = parse_canonical(trimmed) {
        return ms;
    }
    f64::NAN
}

fn parse_iso(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    if bytes.len() < 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let year: i64 = text.get(0..4)?.parse().ok()?;
    let month: u32 = text.get(5..7)?.parse().ok()?;
    let day: u32 = text.get(8..10)?.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    let mut hours = 0u32;
    let mut minutes = 0u32;
    let mut seconds = 0u32;
    let mut millis = 0u32;
    let rest = &text[10..];
    if !rest.is_empty() {
        let time = rest.strip_prefix('T').or_else(|| rest.strip_prefix(' '))?;
        let time = time.strip_suffix('Z').unwrap_or(time);
        let mut fields = time.split(':');
        hours = fields.next()?.parse().ok()?;
        minutes = fields.next()?.parse().ok()?;
        if let Some(second_field) = fields.next() {
            match second_field.split_once('.') {
                Some((s, frac)) => {
                    seconds = s.parse().ok()?;
                    let frac = &frac[..frac.len().min(3)];
                    millis = frac.parse::<u32>().ok()?
                        * 10u32.pow(3 - frac.len().min(3) as u32);
                }
                None => seconds = second_field.parse().ok()?,
            }
        }
        if fields.next().is_some() || hours > 23 || minutes > 59 || seconds > 59 {
            return None;
        }
    }
    Some(parts_to_ms(
        year as f64,
        f64::from(month - 1),
        f64::from(day),
        f64::from(hours),
        f64::from(minutes),
        f64::from(seconds),
        f64::from(millis),
    ))
}

fn parse_canonical(text: &str) -> Option<f64> {
    // "Www Mmm dd yyyy hh:mm:ss GMT"
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.len() != 6 || fields[5] != "GMT" {
        return None;
    }
    if !WEEKDAYS.contains(&fields[0]) {
        return None;
    }
    let month = MONTHS.iter().position(|&m| m == fields[1])? as u32;
    let day: u32 = fields[2].parse().ok()?;
    let year: i64 = fields[3].parse().ok()?;
    let mut time = fields[4].split(':');
    let hours: u32 = time.next()?.parse().ok()?;
    let minutes: u32 = time.next()?.parse().ok()?;
    let seconds: u32 = time.next()?.parse().ok()?;
    if time.next().is_some() {
        return None;
    }
    Some(parts_to_ms(
        year as f64,
        f64::from(month),
        f64::from(day),
        f64::from(hours),
        f64::from(minutes),
        f64::from(seconds),
        0.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_parts() {
        let parts = ms_to_parts(0.0).unwrap();
        assert_eq!(parts.year, 1970);
        assert_eq!(parts.month, 0);
        assert_eq!(parts.day, 1);
        assert_eq!(parts.weekday, 4); // Thursday
    }

    #[test]
    fn civil_round_trip() {
        for days in [-719_468, -1, 0, 1, 19_000, 2_932_896] {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, m, d), days);
        }
    }

    #[test]
    fn parts_round_trip() {
        let ms = parts_to_ms(2024.0, 1.0, 29.0, 13.0, 45.0, 30.0, 250.0);
        let parts = ms_to_parts(ms).unwrap();
        assert_eq!(parts.year, 2024);
        assert_eq!(parts.month, 1);
        assert_eq!(parts.day, 29);
        assert_eq!(parts.hours, 13);
        assert_eq!(parts.millis, 250);
    }

    #[test]
    fn month_overflow_carries() {
        // month 12 of 1999 is January 2000
        let ms = parts_to_ms(1999.0, 12.0, 1.0, 0.0, 0.0, 0.0, 0.0);
        let parts = ms_to_parts(ms).unwrap();
        assert_eq!((parts.year, parts.month, parts.day), (2000, 0, 1));
    }

    #[test]
    fn canonical_format_round_trips_through_parse() {
        let ms = parts_to_ms(2001.0, 8.0, 9.0, 1.0, 46.0, 40.0, 0.0);
        let text = format_utc(ms);
        assert_eq!(parse_date(&text), ms);
    }

    #[test]
    fn iso_parsing() {
        assert_eq!(parse_date("1970-01-01"), 0.0);
        assert_eq!(parse_date("1970-01-02T00:00:00Z"), MS_PER_DAY);
        assert_eq!(parse_date("1970-01-01T00:00:01.500Z"), 1500.0);
        assert!(parse_date("not a date").is_nan());
        assert!(parse_date("1970-13-01").is_nan());
    }

    #[test]
    fn negative_times_split_correctly() {
        let parts = ms_to_parts(-1.0).unwrap();
        assert_eq!(parts.year, 1969);
        assert_eq!(parts.month, 11);
        assert_eq!(parts.day, 31);
        assert_eq!(parts.hours, 23);
        assert_eq!(parts.millis, 999);
    }
}
