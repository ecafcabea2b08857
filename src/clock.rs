use std::time::SystemTime;

/// Milliseconds since the UNIX epoch, saturating to zero if the clock is
/// set before 1970.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
