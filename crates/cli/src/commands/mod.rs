pub mod inspect;
pub mod timeline;
pub mod verify;

/// Nanoseconds since the epoch as RFC 3339, second precision.
pub(crate) fn format_nanos(nanos: u64) -> String {
    let secs = (nanos / 1_000_000_000) as i64;
    let subsec = (nanos % 1_000_000_000) as u32;
    chrono::DateTime::from_timestamp(secs, subsec)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
