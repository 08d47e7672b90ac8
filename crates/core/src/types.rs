/// Backend timestamps are nanoseconds since the Unix epoch.
pub type Time = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Convert a backend [`Time`] into a UTC timestamp.
pub fn to_timestamp(time: Time) -> Timestamp {
    Timestamp::from_timestamp_nanos(time)
}

/// Current wall-clock time in backend units.
///
/// Saturates at `i64::MAX` after the year 2262.
pub fn now() -> Time {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
