//! Resolves the configured timezone so that "today" matches the organisation's calendar.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in `canonical_timezone`.
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the timezone name is not known.
pub fn local_today(canonical_timezone: &str) -> Result<Date, Error> {
    let offset = get_local_offset(canonical_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {canonical_timezone}");
        Error::InvalidTimezoneError(canonical_timezone.to_owned())
    })?;

    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}

#[cfg(test)]
mod timezone_tests {
    use crate::Error;

    use super::{get_local_offset, local_today};

    #[test]
    fn kolkata_is_five_and_a_half_hours_ahead() {
        let offset = get_local_offset("Asia/Kolkata").unwrap();

        assert_eq!(offset.whole_minutes(), 330);
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        assert_eq!(
            local_today("Mars/Olympus_Mons"),
            Err(Error::InvalidTimezoneError("Mars/Olympus_Mons".to_owned()))
        );
    }
}
