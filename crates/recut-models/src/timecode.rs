//! Timecode parsing and formatting utilities.
//!
//! Planner output and caller requests may express time as `HH:MM:SS`,
//! `HH:MM:SS.mmm`, `MM:SS`, or bare seconds; internally everything is
//! seconds-from-start as `f64`.

use thiserror::Error;

/// Maximum reasonable source duration (24 hours in seconds).
pub const MAX_DURATION_SECS: f64 = 86_400.0;

#[derive(Debug, Error, PartialEq)]
pub enum TimecodeError {
    #[error("empty timecode")]
    Empty,

    #[error("negative component in timecode")]
    Negative,

    #[error("invalid {0} component: {1}")]
    InvalidComponent(&'static str, String),

    #[error("unrecognised timecode format: {0}")]
    InvalidFormat(String),
}

/// Parse a timecode string to total seconds.
///
/// # Examples
/// ```
/// use recut_models::timecode::parse_timecode;
/// assert_eq!(parse_timecode("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timecode("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timecode("90.25").unwrap(), 90.25);
/// ```
pub fn parse_timecode(ts: &str) -> Result<f64, TimecodeError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimecodeError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let parse = |name: &'static str, raw: &str| -> Result<f64, TimecodeError> {
        raw.parse::<f64>()
            .map_err(|_| TimecodeError::InvalidComponent(name, raw.to_string()))
    };

    let total = match parts.len() {
        1 => parse("seconds", parts[0])?,
        2 => parse("minutes", parts[0])? * 60.0 + parse("seconds", parts[1])?,
        3 => {
            parse("hours", parts[0])? * 3600.0
                + parse("minutes", parts[1])? * 60.0
                + parse("seconds", parts[2])?
        }
        _ => return Err(TimecodeError::InvalidFormat(ts.to_string())),
    };

    if parts.iter().any(|p| p.trim_start().starts_with('-')) || total < 0.0 {
        return Err(TimecodeError::Negative);
    }

    Ok(total)
}

/// Format seconds as `HH:MM:SS` or `HH:MM:SS.mmm`.
pub fn format_seconds(total_secs: f64) -> String {
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}

/// Round a timestamp to millisecond precision.
pub fn round_ms(t: f64) -> f64 {
    (t * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!(parse_timecode("00:00:12").unwrap(), 12.0);
        assert_eq!(parse_timecode("02:15").unwrap(), 135.0);
        assert_eq!(parse_timecode("7").unwrap(), 7.0);
        assert_eq!(parse_timecode("00:01:02.500").unwrap(), 62.5);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("-5").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
        assert!(parse_timecode("abc").is_err());
    }

    #[test]
    fn test_format_round_trip() {
        assert_eq!(format_seconds(5400.0), "01:30:00");
        assert_eq!(format_seconds(62.5), "00:01:02.500");
        assert_eq!(parse_timecode(&format_seconds(62.5)).unwrap(), 62.5);
    }

    #[test]
    fn test_round_ms() {
        assert_eq!(round_ms(1.23456), 1.235);
        assert_eq!(round_ms(10.0004), 10.0);
        assert_eq!(round_ms(round_ms(1.23456)), round_ms(1.23456));
    }
}
