// src/dates.rs
//
// Date and time primitives shared by the whole engine. Dates travel as
// `YYYY-MM-DD` strings on the wire (lexicographic order == calendar order),
// times as `HH:MM`; everything that needs arithmetic converts here.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// The cafe runs on Japan Standard Time; punches are stamped in JST
/// regardless of where the server happens to run.
pub fn jst_now() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(9 * 3600).expect("JST offset is valid");
    Utc::now().with_timezone(&offset)
}

/// Parses a date string into a `NaiveDate`.
///
/// Tolerates the artifacts the spreadsheet backend produces: a leading
/// apostrophe, full ISO datetimes (reduced to their date part), and the
/// 1899/1900 epoch garbage that shows up when a cell was never a date
/// (rejected along with everything before 1901).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let mut s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(stripped) = s.strip_prefix('\'') {
        s = stripped;
    }
    if let Some((date_part, _)) = s.split_once('T') {
        s = date_part;
    }

    let mut parts = s.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;

    if year < 1901 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse-then-format, returning the canonical `YYYY-MM-DD` form.
pub fn normalize_date_str(raw: &str) -> Option<String> {
    parse_date(raw).map(format_date)
}

/// Converts `H:MM` / `HH:MM` (optionally with a `:SS` tail) into minutes
/// since midnight.
pub fn time_to_minutes(raw: &str) -> Option<u32> {
    let s = raw.trim();
    let mut parts = s.splitn(3, ':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn minutes_to_time(total: u32) -> String {
    format!("{:02}:{:02}", (total / 60) % 24, total % 60)
}

/// Canonicalizes a clock time to zero-padded `HH:MM`, stripping seconds.
pub fn normalize_time_str(raw: &str) -> Option<String> {
    time_to_minutes(raw).map(minutes_to_time)
}

/// Monday of the week containing `date`. Sunday belongs to the *previous*
/// week (offset -6), matching the week-key convention of the shift data.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday() as i64;
    date - Duration::days(back)
}

const WEEKDAY_NAMES_JA: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

/// Japanese single-character weekday name, indexed Sunday=0.
pub fn weekday_name_ja(date: NaiveDate) -> &'static str {
    WEEKDAY_NAMES_JA[date.weekday().num_days_from_sunday() as usize]
}

/// Display form used in reports, e.g. `1/15（木）`. Unparseable input
/// renders as an empty string rather than an error.
pub fn format_date_display(date_str: &str) -> String {
    match parse_date(date_str) {
        Some(d) => format!("{}/{}（{}）", d.month(), d.day(), weekday_name_ja(d)),
        None => String::new(),
    }
}

/// Record identifier: millisecond timestamp plus a short random suffix.
pub fn generate_id() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{}_{}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_dates() {
        assert_eq!(
            parse_date("2026-01-21"),
            NaiveDate::from_ymd_opt(2026, 1, 21)
        );
    }

    #[test]
    fn strips_spreadsheet_artifacts() {
        assert_eq!(
            parse_date("'2026-01-21"),
            NaiveDate::from_ymd_opt(2026, 1, 21)
        );
        assert_eq!(
            parse_date("2026-01-21T05:00:00.000Z"),
            NaiveDate::from_ymd_opt(2026, 1, 21)
        );
    }

    #[test]
    fn rejects_epoch_garbage() {
        assert_eq!(parse_date("1899-12-30"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not-a-date"), None);
        assert_eq!(parse_date("2026-13-01"), None);
    }

    #[test]
    fn time_conversions() {
        assert_eq!(time_to_minutes("14:40"), Some(880));
        assert_eq!(time_to_minutes("9:05"), Some(545));
        assert_eq!(time_to_minutes("16:10:30"), Some(970));
        assert_eq!(time_to_minutes("25:00"), None);
        assert_eq!(normalize_time_str("9:05"), Some("09:05".to_string()));
    }

    #[test]
    fn monday_computation() {
        // 2026-01-21 is a Wednesday; 2026-01-25 a Sunday.
        let wed = NaiveDate::from_ymd_opt(2026, 1, 21).unwrap();
        let sun = NaiveDate::from_ymd_opt(2026, 1, 25).unwrap();
        assert_eq!(format_date(monday_of(wed)), "2026-01-19");
        assert_eq!(format_date(monday_of(sun)), "2026-01-19");
    }

    #[test]
    fn display_format() {
        assert_eq!(format_date_display("2026-01-22"), "1/22（木）");
        assert_eq!(format_date_display("garbage"), "");
    }
}
