//! generalized time and duration literals as used in task entries

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chumsky::prelude::*;
use std::time::Duration;
use thiserror::Error;

/// the format used when writing generalized time values
const GENERALIZED_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// error which can occur while parsing a generalized time value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneralizedTimeError {
    /// the value does not end in `Z`, only UTC values are supported
    #[error("generalized time value {0} is not in UTC")]
    NotUtc(String),
    /// the date and time part could not be parsed
    #[error("could not parse generalized time value {value}: {reason}")]
    Unparsable {
        /// the offending value
        value: String,
        /// the underlying parser message
        reason: String,
    },
}

/// encode a timestamp as generalized time in the format `yyyyMMddHHmmss'Z'`
///
/// fractional seconds are dropped
pub fn encode_generalized_time(timestamp: &DateTime<Utc>) -> String {
    format!("{}Z", timestamp.format(GENERALIZED_TIME_FORMAT))
}

/// decode a UTC generalized time value
///
/// accepts `yyyyMMddHHmmss'Z'` with an optional fraction of a second
/// (`.SSS`) before the `Z`
pub fn decode_generalized_time(value: &str) -> Result<DateTime<Utc>, GeneralizedTimeError> {
    let Some(without_zone) = value.strip_suffix('Z').or_else(|| value.strip_suffix('z')) else {
        return Err(GeneralizedTimeError::NotUtc(value.to_string()));
    };
    let (seconds_part, fraction) = match without_zone.split_once(|c| c == '.' || c == ',') {
        Some((s, f)) => (s, Some(f)),
        None => (without_zone, None),
    };
    let unparsable = |reason: String| GeneralizedTimeError::Unparsable {
        value: value.to_string(),
        reason,
    };
    if seconds_part.len() != 14 || !seconds_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unparsable("expected 14 digits yyyyMMddHHmmss".to_string()));
    }
    let naive = NaiveDateTime::parse_from_str(seconds_part, GENERALIZED_TIME_FORMAT)
        .map_err(|e| unparsable(e.to_string()))?;
    let mut timestamp = Utc.from_utc_datetime(&naive);
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unparsable("invalid fraction of a second".to_string()));
        }
        let digits: String = fraction.chars().chain(std::iter::repeat('0')).take(9).collect();
        let nanos: i64 = digits.parse().map_err(|e: std::num::ParseIntError| unparsable(e.to_string()))?;
        timestamp += chrono::Duration::nanoseconds(nanos);
    }
    Ok(timestamp)
}

/// error which can occur while parsing a duration literal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse {source_text:?} as a duration: {message}")]
pub struct DurationParseError {
    /// the text that failed to parse
    pub source_text: String,
    /// the combined parser messages
    pub message: String,
}

/// the length of one unit in milliseconds, indexed by its accepted names
fn unit_millis(unit: &str) -> Option<u64> {
    match unit.to_lowercase().as_str() {
        "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => Some(1),
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1_000),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60_000),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(3_600_000),
        "d" | "day" | "days" => Some(86_400_000),
        "w" | "week" | "weeks" => Some(604_800_000),
        _ => None,
    }
}

/// parser for a duration literal like `7 days` or `90s`
fn duration_parser() -> impl Parser<char, Duration, Error = Simple<char>> {
    text::int::<char, Simple<char>>(10)
        .padded()
        .then(text::ident::<char, Simple<char>>().padded())
        .then_ignore(end())
        .try_map(|(amount, unit): (String, String), span| {
            let amount: u64 = amount
                .parse()
                .map_err(|e| Simple::custom(span.clone(), format!("{}", e)))?;
            let millis = unit_millis(&unit)
                .ok_or_else(|| Simple::custom(span.clone(), format!("unknown unit {}", unit)))?;
            amount
                .checked_mul(millis)
                .map(Duration::from_millis)
                .ok_or_else(|| Simple::custom(span, "duration out of range"))
        })
}

/// parse a duration literal consisting of an integer and a unit
/// (milliseconds, seconds, minutes, hours, days or weeks)
pub fn parse_duration(src: &str) -> Result<Duration, DurationParseError> {
    duration_parser()
        .parse(src)
        .map_err(|errs| DurationParseError {
            source_text: src.to_string(),
            message: itertools::join(errs.iter().map(|e| e.to_string()), "; "),
        })
}

/// format a duration using the largest unit which represents it exactly
pub fn format_duration(duration: &Duration) -> String {
    let millis = duration.as_millis();
    for (singular, plural, length) in [
        ("week", "weeks", 604_800_000u128),
        ("day", "days", 86_400_000),
        ("hour", "hours", 3_600_000),
        ("minute", "minutes", 60_000),
        ("second", "seconds", 1_000),
    ] {
        if millis != 0 && millis % length == 0 {
            let count = millis / length;
            return format!("{} {}", count, if count == 1 { singular } else { plural });
        }
    }
    format!("{} milliseconds", millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn generalized_time_is_written_without_fraction() {
        let timestamp = Utc.with_ymd_and_hms(2024, 2, 29, 13, 5, 9).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(encode_generalized_time(&timestamp), "20240229130509Z");
    }

    #[rstest]
    #[case::plain("20240229130509Z", 0)]
    #[case::millis("20240229130509.123Z", 123_000_000)]
    #[case::short_fraction("20240229130509.5Z", 500_000_000)]
    fn generalized_time_decodes(#[case] value: &str, #[case] nanos: i64) {
        let expected = Utc.with_ymd_and_hms(2024, 2, 29, 13, 5, 9).unwrap()
            + chrono::Duration::nanoseconds(nanos);
        assert_eq!(decode_generalized_time(value), Ok(expected));
    }

    #[rstest]
    #[case::no_zone("20240229130509")]
    #[case::garbage("yesterday")]
    #[case::short("202402291305Z")]
    #[case::bad_month("20241329130509Z")]
    #[case::empty_fraction("20240229130509.Z")]
    fn generalized_time_rejects(#[case] value: &str) {
        assert!(decode_generalized_time(value).is_err());
    }

    #[rstest]
    #[case("7 days", Duration::from_secs(7 * 86_400))]
    #[case("90s", Duration::from_secs(90))]
    #[case(" 2 weeks ", Duration::from_secs(14 * 86_400))]
    #[case("250 ms", Duration::from_millis(250))]
    fn durations_parse(#[case] src: &str, #[case] expected: Duration) {
        assert_eq!(parse_duration(src), Ok(expected));
    }

    #[rstest]
    #[case("seven days")]
    #[case("7 fortnights")]
    #[case("7")]
    #[case("")]
    fn durations_reject(#[case] src: &str) {
        assert!(parse_duration(src).is_err());
    }

    #[test]
    fn durations_format_with_largest_exact_unit() {
        assert_eq!(format_duration(&Duration::from_secs(7 * 86_400)), "1 week");
        assert_eq!(format_duration(&Duration::from_secs(3 * 86_400)), "3 days");
        assert_eq!(format_duration(&Duration::from_millis(1_500)), "1500 milliseconds");
        assert_eq!(format_duration(&Duration::ZERO), "0 milliseconds");
        let d = Duration::from_secs(36 * 3_600);
        assert_eq!(parse_duration(&format_duration(&d)), Ok(d));
    }
}
