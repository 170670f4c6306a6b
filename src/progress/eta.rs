use std::time::Duration;

/// Estimates longer than this are considered too noisy to display.
pub const DEFAULT_ETA_CEILING: Duration = Duration::from_secs(300);

/// Seconds left until 100%, extrapolated from the average rate since the clock origin.
///
/// Returns `None` when no rate can be derived: `percent` outside `(0, 100)`,
/// zero elapsed time, or a non-finite result.
pub fn estimate_remaining(percent: f64, elapsed: Duration) -> Option<f64> {
    let elapsed = elapsed.as_secs_f64();
    if !(percent > 0.0 && percent < 100.0) || elapsed <= 0.0 {
        return None;
    }

    // (100 - p) / (p / elapsed), multiplied out to keep whole inputs exact
    let remaining = (100.0 - percent) * elapsed / percent;

    remaining.is_finite().then_some(remaining)
}

/// `Xm Ys` from one minute up, `Ys` below. Zero, negative and non-finite input yield "".
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return String::new();
    }

    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;

    if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// ` • 10s left`, or "" when there is nothing credible to show.
pub fn eta_suffix(remaining: Option<f64>, ceiling: Option<Duration>) -> String {
    let Some(remaining) = remaining else {
        return String::new();
    };

    if let Some(ceiling) = ceiling {
        if remaining >= ceiling.as_secs_f64() {
            return String::new();
        }
    }

    let formatted = format_time(remaining);
    if formatted.is_empty() {
        formatted
    } else {
        format!(" • {} left", formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_follows_average_rate() {
        // 5%/s
        assert_eq!(estimate_remaining(50.0, Duration::from_secs(10)), Some(10.0));
        // 0.2%/s
        assert_eq!(estimate_remaining(10.0, Duration::from_secs(50)), Some(450.0));
        assert_eq!(estimate_remaining(80.0, Duration::from_secs(8)), Some(2.0));
    }

    #[test]
    fn test_remaining_needs_a_rate() {
        assert_eq!(estimate_remaining(0.0, Duration::from_secs(30)), None);
        assert_eq!(estimate_remaining(100.0, Duration::from_secs(30)), None);
        assert_eq!(estimate_remaining(40.0, Duration::ZERO), None);
        assert_eq!(estimate_remaining(f64::NAN, Duration::from_secs(3)), None);
        assert_eq!(estimate_remaining(-5.0, Duration::from_secs(3)), None);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(75.0), "1m 15s");
        assert_eq!(format_time(45.0), "45s");
        assert_eq!(format_time(45.9), "45s");
        assert_eq!(format_time(0.0), "");
        assert_eq!(format_time(-3.0), "");
        assert_eq!(format_time(f64::INFINITY), "");
        assert_eq!(format_time(f64::NAN), "");
    }

    #[test]
    fn test_suffix_respects_ceiling() {
        assert_eq!(eta_suffix(Some(10.0), Some(DEFAULT_ETA_CEILING)), " • 10s left");
        assert_eq!(eta_suffix(Some(299.0), Some(DEFAULT_ETA_CEILING)), " • 4m 59s left");
        assert_eq!(eta_suffix(Some(300.0), Some(DEFAULT_ETA_CEILING)), "");
        assert_eq!(eta_suffix(Some(450.0), Some(DEFAULT_ETA_CEILING)), "");
        assert_eq!(eta_suffix(Some(450.0), None), " • 7m 30s left");
        assert_eq!(eta_suffix(None, None), "");
    }
}
