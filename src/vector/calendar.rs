//! Calendar parsing and rendering helpers shared by date and timestamp vectors.
//!
//! All text is interpreted in UTC.

use chrono::format::ParseErrorKind;
use chrono::{DateTime, NaiveDate, NaiveDateTime, ParseError, Timelike};

use crate::error::{Result, VectorError};

pub(crate) const SECONDS_PER_DAY: i64 = 86_400;
pub(crate) const MICROS_PER_SECOND: i64 = 1_000_000;
pub(crate) const MICROS_PER_MILLI: i64 = 1_000;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Byte layout of the accepted text; `d` is any ASCII digit, anything else
/// must match exactly.
const DATE_SHAPE: &[u8] = b"dddd-dd-dd";
const DATETIME_SHAPE: &[u8] = b"dddd-dd-dd dd:dd:dd";

fn has_shape(bytes: &[u8], shape: &[u8]) -> bool {
    bytes.len() == shape.len()
        && bytes.iter().zip(shape).all(|(&b, &s)| match s {
            b'd' => b.is_ascii_digit(),
            _ => b == s,
        })
}

/// Maps a chrono parse failure onto the crate taxonomy: fields that parse but
/// name no real date or time are conversion errors, everything else is a
/// format error.
pub(crate) fn classify(err: &ParseError, value: &str, expected: &str) -> VectorError {
    match err.kind() {
        ParseErrorKind::OutOfRange | ParseErrorKind::Impossible => {
            VectorError::ConversionError(format!("'{value}' is not a valid calendar value: {err}"))
        }
        _ => VectorError::FormatError(format!("Invalid format '{value}'. Expected: {expected}")),
    }
}

/// Parses `YYYY-MM-DD` and returns seconds since the epoch at midnight UTC.
pub(crate) fn parse_date_seconds(value: &str) -> Result<i64> {
    if !has_shape(value.as_bytes(), DATE_SHAPE) {
        return Err(VectorError::FormatError(format!(
            "Invalid format '{value}'. Expected: YYYY-MM-DD"
        )));
    }
    let date = NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|err| classify(&err, value, "YYYY-MM-DD"))?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
        VectorError::ConversionError(format!("Failed to convert '{value}' to a timestamp"))
    })?;
    Ok(midnight.and_utc().timestamp())
}

/// Parses the mandatory `YYYY-MM-DD HH:MM:SS` prefix, returning the epoch
/// seconds and the unparsed remainder.
pub(crate) fn parse_datetime_prefix(value: &str) -> Result<(i64, &str)> {
    const EXPECTED: &str = "YYYY-MM-DD HH:MM:SS[.millis[.micros]]";
    let prefix_len = DATETIME_SHAPE.len();
    let bytes = value.as_bytes();
    if bytes.len() < prefix_len || !has_shape(&bytes[..prefix_len], DATETIME_SHAPE) {
        return Err(VectorError::FormatError(format!(
            "Invalid format '{value}'. Expected: {EXPECTED}"
        )));
    }
    // The prefix is ASCII, so `prefix_len` is a char boundary.
    let (prefix, rest) = value.split_at(prefix_len);
    let datetime = NaiveDateTime::parse_from_str(prefix, DATETIME_FORMAT)
        .map_err(|err| classify(&err, value, EXPECTED))?;
    // chrono encodes second 60 as a leap second on top of second 59.
    if datetime.nanosecond() >= 1_000_000_000 {
        return Err(VectorError::ConversionError(format!(
            "'{value}' is not a valid calendar value: leap seconds are not supported"
        )));
    }
    Ok((datetime.and_utc().timestamp(), rest))
}

/// Parses an optional `.ddd` group (1 to 3 digits) from the front of `rest`.
pub(crate) fn parse_fraction_group<'a>(value: &str, rest: &'a str) -> Result<(i64, &'a str)> {
    let Some(after_dot) = rest.strip_prefix('.') else {
        return Ok((0, rest));
    };
    let digits = after_dot.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 3 {
        return Err(VectorError::FormatError(format!(
            "Invalid sub-second group in '{value}'. Expected 1 to 3 digits after '.'"
        )));
    }
    let (group, remainder) = after_dot.split_at(digits);
    let parsed = group
        .parse::<i64>()
        .map_err(|err| VectorError::FormatError(format!("Invalid digits in '{value}': {err}")))?;
    Ok((parsed, remainder))
}

/// Renders a day count since the epoch as `YYYY-MM-DD`.
pub(crate) fn format_date(epoch_days: i64) -> Option<String> {
    let seconds = epoch_days.checked_mul(SECONDS_PER_DAY)?;
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.format(DATE_FORMAT).to_string())
}

/// Renders epoch microseconds as `YYYY-MM-DD HH:MM:SS.ffffff`.
pub(crate) fn format_timestamp(micros: i64) -> Option<String> {
    let seconds = micros.div_euclid(MICROS_PER_SECOND);
    let nanos = u32::try_from(micros.rem_euclid(MICROS_PER_SECOND) * 1_000).ok()?;
    DateTime::from_timestamp(seconds, nanos)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_seconds() {
        assert_eq!(parse_date_seconds("1970-01-01"), Ok(0));
        assert_eq!(parse_date_seconds("1970-01-02"), Ok(86_400));
        assert_eq!(parse_date_seconds("1969-12-31"), Ok(-86_400));
    }

    #[test]
    fn test_date_errors_are_classified() {
        assert!(matches!(
            parse_date_seconds("not a date"),
            Err(VectorError::FormatError(_))
        ));
        assert!(matches!(
            parse_date_seconds("2023-01-01 trailing"),
            Err(VectorError::FormatError(_))
        ));
        assert!(matches!(
            parse_date_seconds("2023-02-30"),
            Err(VectorError::ConversionError(_))
        ));
    }

    #[test]
    fn test_date_shape_is_strict() {
        for bad in [" 2023-01-01", "2023-01-01 ", "2023-1-5", "+2023-01-01", "2023/01/01", "20230-1-01"] {
            assert!(
                matches!(parse_date_seconds(bad), Err(VectorError::FormatError(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_datetime_shape_is_strict() {
        for bad in [
            "2023-12-23  10:00:00",
            "2023-12-23 1:2:3",
            "2023-12-23T10:00:00",
            " 2023-12-23 10:00:00",
            "2023-12-23 10:00",
            "2023-12-23 10:00:0é",
        ] {
            assert!(
                matches!(parse_datetime_prefix(bad), Err(VectorError::FormatError(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_datetime_invalid_fields() {
        assert!(matches!(
            parse_datetime_prefix("2023-12-23 10:00:60"),
            Err(VectorError::ConversionError(_))
        ));
        assert!(matches!(
            parse_datetime_prefix("2023-12-23 24:00:00"),
            Err(VectorError::ConversionError(_))
        ));
    }

    #[test]
    fn test_datetime_prefix_remainder() {
        let (secs, rest) = parse_datetime_prefix("1970-01-01 00:01:00.5").unwrap();
        assert_eq!(secs, 60);
        assert_eq!(rest, ".5");
    }

    #[test]
    fn test_fraction_group() {
        assert_eq!(parse_fraction_group("x", ".500.250"), Ok((500, ".250")));
        assert_eq!(parse_fraction_group("x", ""), Ok((0, "")));
        assert_eq!(parse_fraction_group("x", ".7"), Ok((7, "")));
        assert!(parse_fraction_group("x", ".").is_err());
        assert!(parse_fraction_group("x", ".1234").is_err());
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_date(0).as_deref(), Some("1970-01-01"));
        assert_eq!(format_date(-1).as_deref(), Some("1969-12-31"));
        assert_eq!(
            format_timestamp(-500_000).as_deref(),
            Some("1969-12-31 23:59:59.500000")
        );
    }
}
