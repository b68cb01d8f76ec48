//! Wall-clock helpers.

/// Current unix timestamp in seconds.
///
/// # Panics
///
/// Panics if the system clock is set to before the Unix epoch (January 1,
/// 1970). This indicates a severely misconfigured system and is not
/// recoverable.
#[must_use]
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time before Unix epoch")
        .as_secs() as i64
}
