//! Human-readable time formatting
//!
//! Track and remix durations are shown as a clock (`M:SS`), matching the
//! timeline and export displays.

/// Format seconds as `M:SS`
///
/// Fractional seconds are truncated. Negative and non-finite values format
/// as `0:00`.
///
/// # Examples
///
/// ```
/// use remix_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(65.9), "1:05");
/// assert_eq!(format_clock(360.0), "6:00");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format a byte count as megabytes with two decimals (e.g. `6.00 MB`)
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}
