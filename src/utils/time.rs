use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

/// `YYYYMMDD_HHMMSS`, used to name sessions saved without an explicit name.
const SESSION_STAMP: &[FormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");

/// Returns the current time in the local offset, or UTC if the local offset
/// cannot be determined.
pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Formats `datetime` as a session name.
pub fn session_stamp(datetime: OffsetDateTime) -> String {
    datetime
        .format(SESSION_STAMP)
        .unwrap_or_else(|_| datetime.unix_timestamp().to_string())
}
