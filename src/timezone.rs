use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::{Error, datetime::truncate_to_microseconds};

pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// The current wall-clock time in `canonical_timezone`.
///
/// "This month" and "today" are decided by this time, not UTC.
///
/// # Errors
///
/// Returns [Error::InvalidTimezoneError] if `canonical_timezone` is not a
/// known timezone name.
pub fn local_now(canonical_timezone: &str) -> Result<PrimitiveDateTime, Error> {
    let offset = get_local_offset(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))?;
    let now = OffsetDateTime::now_utc().to_offset(offset);

    Ok(truncate_to_microseconds(PrimitiveDateTime::new(now.date(), now.time())))
}
