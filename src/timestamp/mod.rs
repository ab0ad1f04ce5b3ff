//! Clock-style timestamp codec.
//!
//! Parses user input such as `12:30` or `1:23:45` into an offset in
//! milliseconds and renders offsets back as `M:SS` / `H:MM:SS`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_HOURS: u32 = 99;
pub const MAX_MINUTES: u32 = 59;
pub const MAX_SECONDS: u32 = 59;

// Hours take any number of digits so an out-of-range hour reports its own
// reason. Every other component is one or two digits.
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([0-9]+):([0-9]{1,2}):([0-9]{1,2})|([0-9]{1,2}):([0-9]{1,2}))$").unwrap()
});

/// Why a timestamp string was rejected. The message is shown to the user verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Invalid format. Use HH:MM:SS or MM:SS")]
    InvalidFormat,

    #[error("Hours must be 99 or less")]
    HoursOutOfRange,

    #[error("Minutes must be 59 or less")]
    MinutesOutOfRange,

    #[error("Seconds must be 59 or less")]
    SecondsOutOfRange,
}

/// A validated playback offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub milliseconds: u64,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Timestamp {
    /// Total offset rebuilt from the hour/minute/second fields.
    pub fn components_millis(&self) -> u64 {
        (u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds))
            * 1000
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(self.milliseconds))
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse `MM:SS` or `HH:MM:SS`.
///
/// Range checks run hours, then minutes, then seconds; the first failure wins.
pub fn parse(text: &str) -> Result<Timestamp, TimestampError> {
    let caps = TIMESTAMP_RE
        .captures(text.trim())
        .ok_or(TimestampError::InvalidFormat)?;

    let component = |i: usize| -> u32 {
        caps.get(i)
            // digits only, so a failed parse can only be overflow
            .map(|m| m.as_str().parse().unwrap_or(u32::MAX))
            .unwrap_or(0)
    };

    let (hours, minutes, seconds) = if caps.get(1).is_some() {
        (component(1), component(2), component(3))
    } else {
        (0, component(4), component(5))
    };

    if hours > MAX_HOURS {
        return Err(TimestampError::HoursOutOfRange);
    }
    if minutes > MAX_MINUTES {
        return Err(TimestampError::MinutesOutOfRange);
    }
    if seconds > MAX_SECONDS {
        return Err(TimestampError::SecondsOutOfRange);
    }

    let total_seconds =
        u64::from(hours) * 3600 + u64::from(minutes) * 60 + u64::from(seconds);

    Ok(Timestamp {
        milliseconds: total_seconds * 1000,
        hours,
        minutes,
        seconds,
    })
}

/// Render an offset as `H:MM:SS`, or `M:SS` under an hour.
pub fn format(milliseconds: u64) -> String {
    let total_seconds = milliseconds / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minutes_seconds() {
        let ts = parse("12:30").unwrap();
        assert_eq!(
            ts,
            Timestamp {
                milliseconds: 750_000,
                hours: 0,
                minutes: 12,
                seconds: 30,
            }
        );
    }

    #[test]
    fn test_parse_hours_minutes_seconds() {
        assert_eq!(parse("1:23:45").unwrap().milliseconds, 5_025_000);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse("  05:07 \n").unwrap().milliseconds, 307_000);
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(parse("0:00").unwrap().milliseconds, 0);
    }

    #[test]
    fn test_parse_boundaries() {
        assert_eq!(parse("99:59:59").unwrap().milliseconds, 359_999_000);
        assert_eq!(parse("100:00:00"), Err(TimestampError::HoursOutOfRange));
    }

    #[test]
    fn test_parse_out_of_range_messages() {
        assert_eq!(
            parse("12:60").unwrap_err().to_string(),
            "Minutes must be 59 or less"
        );
        assert_eq!(
            parse("1:00:60").unwrap_err().to_string(),
            "Seconds must be 59 or less"
        );
        assert_eq!(
            parse("100:00:00").unwrap_err().to_string(),
            "Hours must be 99 or less"
        );
    }

    #[test]
    fn test_parse_reports_first_violation() {
        // hours, minutes and seconds all out of range
        assert_eq!(parse("120:75:80"), Err(TimestampError::HoursOutOfRange));
        assert_eq!(parse("1:75:80"), Err(TimestampError::MinutesOutOfRange));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for input in [
            "abc", "", "12", "12:", ":30", "1:2:3:4", "12:345", "1.5:00", "-1:00", "12:30.5",
            "1 2:30", "١٢:٣٠",
        ] {
            assert_eq!(
                parse(input),
                Err(TimestampError::InvalidFormat),
                "input {:?}",
                input
            );
        }
        assert_eq!(
            parse("abc").unwrap_err().to_string(),
            "Invalid format. Use HH:MM:SS or MM:SS"
        );
    }

    #[test]
    fn test_parse_huge_leading_component() {
        assert_eq!(
            parse("99999999999:00:00"),
            Err(TimestampError::HoursOutOfRange)
        );
    }

    #[test]
    fn test_parse_rejects_long_minutes_without_hours() {
        for input in ["123:00", "100:00", "007:30"] {
            assert_eq!(
                parse(input),
                Err(TimestampError::InvalidFormat),
                "input {:?}",
                input
            );
        }
        assert_eq!(parse("100:00:00"), Err(TimestampError::HoursOutOfRange));
        assert_eq!(parse("007:30:00").unwrap().milliseconds, 27_000_000);
    }

    #[test]
    fn test_components_round_trip() {
        for input in ["0:00", "59:59", "1:00:00", "12:05:09", "99:59:59", "7:3"] {
            let ts = parse(input).unwrap();
            assert_eq!(ts.components_millis(), ts.milliseconds, "input {}", input);
        }
    }

    #[test]
    fn test_format() {
        assert_eq!(format(0), "0:00");
        assert_eq!(format(3_661_000), "1:01:01");
        assert_eq!(format(750_000), "12:30");
        assert_eq!(format(59_999), "0:59");
        assert_eq!(format(360_000_000), "100:00:00");
    }

    #[test]
    fn test_format_reparse_stable() {
        for input in ["12:30", "1:23:45", "00:07", "10:00:00", "99:59:59"] {
            let ms = parse(input).unwrap().milliseconds;
            assert_eq!(parse(&format(ms)).unwrap().milliseconds, ms);
        }
    }

    #[test]
    fn test_display_uses_format() {
        let ts = parse("1:01:01").unwrap();
        assert_eq!(ts.to_string(), "1:01:01");
    }

    #[test]
    fn test_from_str() {
        let ts: Timestamp = "2:03".parse().unwrap();
        assert_eq!(ts.milliseconds, 123_000);
        assert!("nope".parse::<Timestamp>().is_err());
    }
}
