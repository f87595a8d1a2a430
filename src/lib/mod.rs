//! Misc

pub mod call;
pub mod cookies;
pub mod events;
pub mod player;
pub mod youtube;

use std::time::Duration;

use crate::error::UserError;

/// Helper function to format a duration.
pub fn format_duration(dur: &Duration) -> String {
    let total_secs = dur.as_secs();
    let total_mins = total_secs / 60;

    let hours = total_mins / 60;
    let mins = total_mins % 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("[{hours:02}h:{mins:02}m:{secs:02}s]")
    } else {
        format!("[{mins:02}m:{secs:02}s]")
    }
}

/// Parse a `mm:ss` (or `m:ss`) timestamp into an offset from the start of a track.
pub fn parse_timestamp(input: &str) -> Result<Duration, UserError> {
    let bad = || UserError::BadTimestamp {
        input: input.to_string(),
    };

    let (mins, secs) = input.trim().split_once(':').ok_or_else(bad)?;
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(mins) || !all_digits(secs) || secs.len() != 2 {
        return Err(bad());
    }

    let mins: u64 = mins.parse().map_err(|_| bad())?;
    let secs: u64 = secs.parse().map_err(|_| bad())?;
    if secs >= 60 {
        return Err(bad());
    }

    let total = mins
        .checked_mul(60)
        .and_then(|m| m.checked_add(secs))
        .ok_or_else(bad)?;
    Ok(Duration::from_secs(total))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn formats_short_and_long() {
        assert_eq!(format_duration(&Duration::from_secs(61)), "[01m:01s]");
        assert_eq!(format_duration(&Duration::from_secs(3725)), "[01h:02m:05s]");
    }

    #[test]
    fn parses_timestamps() {
        assert_eq!(parse_timestamp("1:30").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_timestamp("01:05").unwrap(), Duration::from_secs(65));
        assert_eq!(parse_timestamp("0:00").unwrap(), Duration::ZERO);
        assert_eq!(parse_timestamp("75:00").unwrap(), Duration::from_secs(4500));
    }

    #[test]
    fn rejects_malformed_timestamps() {
        for input in [
            "",
            "90",
            "1:5",
            "1:60",
            "-1:00",
            "a:bc",
            "1:30:00",
            ":30",
            "1:3x",
            // Minutes overflow once converted to seconds.
            "307445734561825861:00",
        ] {
            assert!(
                matches!(parse_timestamp(input), Err(UserError::BadTimestamp { .. })),
                "{input} should be rejected"
            );
        }
    }
}
