//! Compact duration strings
//!
//! Layout and music lengths are stored the way submitters type them:
//! `"1h3min2s"`, `"2min45s"`, `"14s"`. This module converts between that
//! form and whole seconds, and sums lists of them for the
//! `total_time_built` counter.

const SECS_PER_HOUR: u64 = 3600;
const SECS_PER_MINUTE: u64 = 60;

/// Parse a compact duration string into seconds.
///
/// Scans for repeated `<integer><unit>` groups where unit is `h`, `min`
/// or `s`. Anything that does not form such a group is skipped, so
/// `"abc"` and `""` both parse to 0.
///
/// # Examples
///
/// ```
/// use gpdb_common::duration::parse_duration;
///
/// assert_eq!(parse_duration("1h3min2s"), 3782);
/// assert_eq!(parse_duration("2min45s"), 165);
/// assert_eq!(parse_duration("garbage"), 0);
/// ```
pub fn parse_duration(text: &str) -> u64 {
    let bytes = text.as_bytes();
    let mut total: u64 = 0;
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let digits = &text[start..i];
        let rest = &text[i..];

        let (multiplier, unit_len) = if rest.starts_with('h') {
            (SECS_PER_HOUR, 1)
        } else if rest.starts_with("min") {
            (SECS_PER_MINUTE, 3)
        } else if rest.starts_with('s') {
            (1, 1)
        } else {
            // Digits without a unit are ignored
            continue;
        };

        // Saturate instead of failing on absurdly long digit runs
        let value = digits.parse::<u64>().unwrap_or(u64::MAX);
        total = total.saturating_add(value.saturating_mul(multiplier));
        i += unit_len;
    }

    total
}

/// Format seconds as a compact duration string.
///
/// Only non-zero components are emitted, without separators. Zero is
/// rendered as `"0s"`.
///
/// # Examples
///
/// ```
/// use gpdb_common::duration::format_duration;
///
/// assert_eq!(format_duration(3661), "1h1min1s");
/// assert_eq!(format_duration(120), "2min");
/// assert_eq!(format_duration(0), "0s");
/// ```
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / SECS_PER_HOUR;
    let minutes = (seconds % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let secs = seconds % SECS_PER_MINUTE;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}min", minutes));
    }
    if secs > 0 {
        out.push_str(&format!("{}s", secs));
    }

    if out.is_empty() {
        "0s".to_string()
    } else {
        out
    }
}

/// Add any number of duration strings and format the total.
///
/// # Examples
///
/// ```
/// use gpdb_common::duration::sum_durations;
///
/// assert_eq!(sum_durations(["1h", "30min", "30s"]), "1h30min30s");
/// assert_eq!(sum_durations(Vec::<&str>::new()), "0s");
/// ```
pub fn sum_durations<I, S>(durations: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let total = durations
        .into_iter()
        .map(|d| parse_duration(d.as_ref()))
        .fold(0u64, u64::saturating_add);
    format_duration(total)
}
