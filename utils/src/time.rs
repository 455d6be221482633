//! Duration formatting for log lines.

use tribunal_types::Timestamp;

/// Format a duration in seconds as its two most significant units.
pub fn format_duration(secs: u64) -> String {
    const DAY: u64 = 86_400;
    const HOUR: u64 = 3_600;
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < HOUR => format!("{}m {}s", s / 60, s % 60),
        s if s < DAY => format!("{}h {}m", s / HOUR, (s % HOUR) / 60),
        s => format!("{}d {}h", s / DAY, (s % DAY) / HOUR),
    }
}

/// Time left until `deadline`, or `"expired"` once it has passed.
pub fn format_remaining(deadline: Timestamp, now: Timestamp) -> String {
    if deadline.is_passed(now) {
        "expired".to_string()
    } else {
        format_duration(now.elapsed_since(deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_magnitude() {
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(61), "1m 1s");
        assert_eq!(format_duration(3 * 3600 + 120), "3h 2m");
        assert_eq!(format_duration(2 * 86_400 + 5 * 3600), "2d 5h");
    }

    #[test]
    fn remaining_counts_down_to_expired() {
        let deadline = Timestamp::new(1_000);
        assert_eq!(format_remaining(deadline, Timestamp::new(940)), "1m 0s");
        assert_eq!(format_remaining(deadline, deadline), "0s");
        assert_eq!(format_remaining(deadline, Timestamp::new(1_001)), "expired");
    }
}
