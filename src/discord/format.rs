//! Conversions between Discord wire formats and attribute strings.

use chrono::{DateTime, SecondsFormat, Utc};

/// Length of a snowflake rendered in decimal.
const SNOWFLAKE_LEN: usize = 18;

/// Returns true if `s` looks like a Discord snowflake: exactly 18 ASCII digits.
///
/// Only used to tell IDs from names in import identifiers, so a name made of
/// 18 digits is treated as an ID.
pub fn is_snowflake(s: &str) -> bool {
    s.len() == SNOWFLAKE_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

/// Formats an RGB integer as `#RRGGBB`.
pub fn hex_color(color: i64) -> String {
    format!("#{:06X}", color)
}

/// Parses `#RRGGBB` into an RGB integer. Malformed input yields 0.
pub fn parse_hex_color(s: &str) -> i64 {
    s.strip_prefix('#')
        .filter(|digits| !digits.is_empty() && digits.len() <= 6)
        .and_then(|digits| i64::from_str_radix(digits, 16).ok())
        .unwrap_or(0)
}

/// Renders a Discord ISO 8601 timestamp as RFC 3339 in UTC.
///
/// Missing timestamps render as an empty string; unparseable ones are passed through.
pub fn timestamp(ts: Option<&str>) -> String {
    match ts {
        None => String::new(),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| {
                t.with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Secs, true)
            })
            .unwrap_or_else(|_| raw.to_string()),
    }
}

/// The current time in RFC 850 format, used for `last_updated`.
pub fn now_rfc850() -> String {
    Utc::now().format("%A, %d-%b-%y %H:%M:%S %Z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_snowflake() {
        assert!(is_snowflake("123456789012345678"));
        assert!(!is_snowflake("12345"));
        assert!(!is_snowflake("12345678901234567a"));
        assert!(!is_snowflake("1234567890123456789"));
        assert!(!is_snowflake("general"));
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color(0xFF8800), "#FF8800");
        assert_eq!(hex_color(0), "#000000");
        assert_eq!(parse_hex_color("#ff8800"), 0xFF8800);
        assert_eq!(parse_hex_color("#FF8800"), 0xFF8800);
        assert_eq!(parse_hex_color("FF8800"), 0);
        assert_eq!(parse_hex_color("#zzzzzz"), 0);
        assert_eq!(parse_hex_color("#"), 0);
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(timestamp(None), "");
        assert_eq!(
            timestamp(Some("2021-03-04T05:06:07.123000+00:00")),
            "2021-03-04T05:06:07Z"
        );
        assert_eq!(
            timestamp(Some("2021-03-04T07:06:07+02:00")),
            "2021-03-04T05:06:07Z"
        );
        assert_eq!(timestamp(Some("yesterday")), "yesterday");
    }

    #[test]
    fn test_now_rfc850_shape() {
        let now = now_rfc850();
        assert!(now.ends_with(" UTC"), "{now}");
        assert_eq!(now.matches(':').count(), 2);
        assert!(now.contains(", "));
    }
}
