//! Conversions between stored timestamp strings and `time` types, plus the
//! display formats used by the HTML views.
//!
//! Timestamps are stored as naive ISO-8601 text, e.g.
//! "2025-03-05T14:30:00.000000". Older records written by other clients may
//! carry a trailing "Z" or "+00:00", which is stripped before parsing. A bare
//! date is read as midnight.

use time::{
    Date, Duration, OffsetDateTime, PrimitiveDateTime, Time,
    format_description::BorrowedFormatItem, macros::format_description,
};

use crate::Error;

const TIMESTAMP_WITH_SUBSECOND: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const TIMESTAMP: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const TIMESTAMP_WITHOUT_SECONDS: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const DATE: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Drop the part of `date_time` finer than a microsecond, which persisted
/// timestamps cannot hold.
pub fn truncate_to_microseconds(date_time: PrimitiveDateTime) -> PrimitiveDateTime {
    date_time - sub_microsecond(date_time.nanosecond())
}

/// The current UTC time at the precision timestamps are persisted with.
pub fn utc_now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - sub_microsecond(now.nanosecond())
}

fn sub_microsecond(nanosecond: u32) -> Duration {
    Duration::nanoseconds(i64::from(nanosecond % 1_000))
}

/// Format `date_time` the way it is persisted.
pub fn format_timestamp(date_time: PrimitiveDateTime) -> String {
    format!(
        "{}T{:02}:{:02}:{:02}.{:06}",
        format_date_for_input(date_time.date()),
        date_time.hour(),
        date_time.minute(),
        date_time.second(),
        date_time.microsecond()
    )
}

/// Format a UTC timestamp the way it is persisted.
pub fn format_utc_timestamp(date_time: OffsetDateTime) -> String {
    let utc = date_time.to_offset(time::UtcOffset::UTC);
    format_timestamp(PrimitiveDateTime::new(utc.date(), utc.time()))
}

/// Parse a persisted timestamp.
///
/// # Errors
///
/// Returns [Error::InvalidDate] if `raw` is not a timestamp or a date.
pub fn parse_timestamp(raw: &str) -> Result<PrimitiveDateTime, Error> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix("+00:00"))
        .unwrap_or(trimmed);

    PrimitiveDateTime::parse(trimmed, TIMESTAMP_WITH_SUBSECOND)
        .or_else(|_| PrimitiveDateTime::parse(trimmed, TIMESTAMP))
        .or_else(|_| PrimitiveDateTime::parse(trimmed, TIMESTAMP_WITHOUT_SECONDS))
        .or_else(|_| Date::parse(trimmed, DATE).map(|date| date.midnight()))
        .map_err(|_| Error::InvalidDate(raw.to_owned()))
}

/// Parse a persisted timestamp that is known to be in UTC.
pub fn parse_utc_timestamp(raw: &str) -> Result<OffsetDateTime, Error> {
    parse_timestamp(raw).map(PrimitiveDateTime::assume_utc)
}

/// Parse a date from an HTML date input, e.g. "2025-03-05".
///
/// # Errors
///
/// Returns [Error::InvalidDate] if `raw` is not in the form YYYY-MM-DD.
pub fn parse_date(raw: &str) -> Result<Date, Error> {
    Date::parse(raw.trim(), DATE).map_err(|_| Error::InvalidDate(raw.to_owned()))
}

/// Parse an optional date filter, treating an empty string as no filter.
pub fn parse_optional_date(raw: Option<&str>) -> Result<Option<Date>, Error> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_date(raw).map(Some),
    }
}

/// Combine a date picked in a form with the current local time of day, so
/// that expenses entered on the same day keep their entry order.
pub fn date_with_time(date: Date, time: Time) -> PrimitiveDateTime {
    PrimitiveDateTime::new(date, time)
}

/// Format a date for an HTML date input, e.g. "2025-03-05".
pub fn format_date_for_input(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Format a date for display, e.g. "March 05, 2025".
pub fn format_date_display(date: Date) -> String {
    format!("{} {:02}, {}", date.month(), date.day(), date.year())
}

/// Format a date and time for display, e.g. "March 05, 2025 at 02:30 PM".
pub fn format_datetime_display(date_time: PrimitiveDateTime) -> String {
    let (hour, meridiem) = match date_time.hour() {
        0 => (12, "AM"),
        hour @ 1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        hour => (hour - 12, "PM"),
    };

    format!(
        "{} at {:02}:{:02} {}",
        format_date_display(date_time.date()),
        hour,
        date_time.minute(),
        meridiem
    )
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use crate::Error;

    use super::{
        format_date_display, format_date_for_input, format_datetime_display, format_timestamp,
        format_utc_timestamp, parse_date, parse_optional_date, parse_timestamp,
        parse_utc_timestamp, truncate_to_microseconds, utc_now,
    };

    #[test]
    fn timestamp_survives_storage_format() {
        let want = datetime!(2025-03-05 14:30:15.123456);

        let got = parse_timestamp(&format_timestamp(want)).unwrap();

        assert_eq!(want, got);
    }

    #[test]
    fn truncated_timestamp_survives_storage_format() {
        let date_time = datetime!(2025-03-05 14:30:15.123456789);

        let truncated = truncate_to_microseconds(date_time);

        assert_eq!(truncated, datetime!(2025-03-05 14:30:15.123456));
        assert_eq!(parse_timestamp(&format_timestamp(truncated)).unwrap(), truncated);
    }

    #[test]
    fn utc_now_survives_storage_format() {
        let now = utc_now();

        assert_eq!(now.nanosecond() % 1_000, 0);
        assert_eq!(parse_utc_timestamp(&format_utc_timestamp(now)).unwrap(), now);
    }

    #[test]
    fn midnight_is_formatted_with_two_digit_hours() {
        let formatted = format_timestamp(datetime!(2025-01-01 00:00:00));

        assert_eq!(formatted, "2025-01-01T00:00:00.000000");
    }

    #[test]
    fn parse_strips_utc_suffixes() {
        let want = datetime!(2025-03-05 14:30:00);

        assert_eq!(parse_timestamp("2025-03-05T14:30:00Z").unwrap(), want);
        assert_eq!(parse_timestamp("2025-03-05T14:30:00+00:00").unwrap(), want);
        assert_eq!(
            parse_timestamp("2025-03-05T14:30:00.000000+00:00").unwrap(),
            want
        );
    }

    #[test]
    fn parse_accepts_bare_date() {
        assert_eq!(
            parse_timestamp("2025-03-05").unwrap(),
            datetime!(2025-03-05 00:00:00)
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(
            parse_timestamp("yesterday"),
            Err(Error::InvalidDate("yesterday".to_owned()))
        );
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert!(parse_date("05/03/2025").is_err());
        assert_eq!(parse_date("2025-03-05").unwrap(), date!(2025 - 03 - 05));
    }

    #[test]
    fn empty_date_filter_is_ignored() {
        assert_eq!(parse_optional_date(Some("")).unwrap(), None);
        assert_eq!(parse_optional_date(None).unwrap(), None);
    }

    #[test]
    fn display_formats() {
        assert_eq!(format_date_for_input(date!(2025 - 03 - 05)), "2025-03-05");
        assert_eq!(format_date_display(date!(2025 - 03 - 05)), "March 05, 2025");
        assert_eq!(
            format_datetime_display(datetime!(2025-03-05 14:30:00)),
            "March 05, 2025 at 02:30 PM"
        );
        assert_eq!(
            format_datetime_display(datetime!(2025-03-05 00:05:00)),
            "March 05, 2025 at 12:05 AM"
        );
    }
}
