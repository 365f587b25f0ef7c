use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    constants::{THIS_IS_A_BUG, VALID_REGEX},
    errors::ParseError,
};

lazy_static! {
    static ref DURATION_RE: Regex =
        Regex::new(r"^(?:(?P<hours>\d+)h)?(?:(?P<minutes>\d+)m)?(?:(?P<seconds>\d+)s)?$")
            .expect(&format!("{VALID_REGEX}{THIS_IS_A_BUG}"));
    static ref SECONDS_RE: Regex =
        Regex::new(r"^(?P<seconds>\d+)$").expect(&format!("{VALID_REGEX}{THIS_IS_A_BUG}"));
}

/// Parse a duration string in the format `<hours>h<minutes>m<seconds>s`.
///
/// Any subset of the components may be present (`1h`, `30m`, `1h15s`, ...),
/// but the order is fixed. A bare number is interpreted as seconds.
pub fn parse_duration_string(text: &str) -> Result<Duration, ParseError> {
    if let Some(captures) = SECONDS_RE.captures(text) {
        let seconds = parse_component(text, &captures, "seconds")?;
        return Ok(Duration::from_secs(seconds));
    }
    let captures = DURATION_RE
        .captures(text)
        .ok_or_else(|| ParseError::InvalidDuration(text.to_owned()))?;
    if captures.name("hours").is_none()
        && captures.name("minutes").is_none()
        && captures.name("seconds").is_none()
    {
        return Err(ParseError::InvalidDuration(text.to_owned()));
    }
    let hours = parse_component(text, &captures, "hours")?;
    let minutes = parse_component(text, &captures, "minutes")?;
    let seconds = parse_component(text, &captures, "seconds")?;
    hours
        .checked_mul(3600)
        .and_then(|total| minutes.checked_mul(60).and_then(|m| total.checked_add(m)))
        .and_then(|total| total.checked_add(seconds))
        .map(Duration::from_secs)
        .ok_or_else(|| ParseError::InvalidDuration(text.to_owned()))
}

/// Format a duration as `<hours>h<minutes>m<seconds>s`, omitting zero
/// components. The inverse of [`parse_duration_string`]; zero formats as `0s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 || out.is_empty() {
        out.push_str(&format!("{seconds}s"));
    }
    out
}

fn parse_component(
    text: &str,
    captures: &regex::Captures<'_>,
    name: &str,
) -> Result<u64, ParseError> {
    captures.name(name).map_or(Ok(0), |component| {
        component
            .as_str()
            .parse()
            .map_err(|_| ParseError::InvalidDuration(text.to_owned()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_should_accept_bare_seconds() {
        assert_eq!(
            parse_duration_string("30").unwrap(),
            Duration::from_secs(30)
        );
        assert_eq!(parse_duration_string("0").unwrap(), Duration::from_secs(0));
    }

    #[test]
    fn parse_should_accept_any_subset_of_components() {
        assert_eq!(
            parse_duration_string("1h").unwrap(),
            Duration::from_secs(3600)
        );
        assert_eq!(
            parse_duration_string("30m").unwrap(),
            Duration::from_secs(1800)
        );
        assert_eq!(
            parse_duration_string("15s").unwrap(),
            Duration::from_secs(15)
        );
        assert_eq!(
            parse_duration_string("1h30m").unwrap(),
            Duration::from_secs(5400)
        );
        assert_eq!(
            parse_duration_string("1h30m15s").unwrap(),
            Duration::from_secs(5415)
        );
        assert_eq!(
            parse_duration_string("2h5s").unwrap(),
            Duration::from_secs(7205)
        );
    }

    #[test]
    fn parse_should_reject_garbage() {
        assert!(parse_duration_string("").is_err());
        assert!(parse_duration_string("xyz").is_err());
        assert!(parse_duration_string("30x").is_err());
        assert!(parse_duration_string("m30").is_err());
        // components out of order
        assert!(parse_duration_string("30m1h").is_err());
    }

    #[test]
    fn format_should_round_trip_through_parse() {
        for duration in [
            Duration::from_secs(0),
            Duration::from_secs(15),
            Duration::from_secs(60),
            Duration::from_secs(3600),
            Duration::from_secs(5400),
            Duration::from_secs(5415),
            Duration::from_secs(7205),
        ] {
            let formatted = format_duration(duration);
            assert_eq!(
                parse_duration_string(&formatted).unwrap(),
                duration,
                "round trip failed for '{formatted}'"
            );
        }
    }

    #[test]
    fn format_should_render_zero_as_seconds() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
    }
}
