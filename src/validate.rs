use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const MAX_LIMIT: u32 = 1000;

static CHANNEL_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[CG][A-Z0-9]+$").expect("valid channel id regex"));
static USER_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[UW][A-Z0-9]+$").expect("valid user id regex"));
static TIMESTAMP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+$").expect("valid timestamp regex"));
static URL_TIMESTAMP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/p(\d{16})(?:\?|$)").expect("valid message url regex"));
static P_TIMESTAMP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^p(\d{16})$").expect("valid p-form timestamp regex"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid channel ID {0:?}: must start with C or G (e.g., C01234ABCDE)")]
    ChannelId(String),

    #[error("invalid user ID {0:?}: must start with U or W (e.g., U01234ABCDE)")]
    UserId(String),

    #[error(
        "invalid timestamp {0:?}: must be format 1234567890.123456, p1234567890123456, or a Slack message URL"
    )]
    Timestamp(String),

    #[error("invalid limit {0}: must be between 1 and {MAX_LIMIT}")]
    Limit(i64),

    #[error("invalid date format {0:?}: expected YYYY-MM-DD")]
    Date(String),

    #[error("invalid scope {0:?}: must be one of all, public, private, dm, mpim")]
    Scope(String),

    #[error("{0}")]
    Input(String),
}

pub fn validate_channel_id(id: &str) -> Result<(), ValidationError> {
    if CHANNEL_ID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(ValidationError::ChannelId(id.to_string()))
    }
}

pub fn validate_user_id(id: &str) -> Result<(), ValidationError> {
    if USER_ID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(ValidationError::UserId(id.to_string()))
    }
}

/// Reduces a message identifier to the `<seconds>.<micros>` API form.
///
/// Accepts the API form itself, the `p<16 digits>` form used in message
/// links, and a full message URL. Anything else is returned trimmed but
/// otherwise untouched so that [`validate_timestamp`] can report it.
pub fn normalize_timestamp(input: &str) -> String {
    let input = input.trim();

    if let Some(caps) = URL_TIMESTAMP_REGEX.captures(input) {
        return split_p_digits(&caps[1]);
    }
    if let Some(caps) = P_TIMESTAMP_REGEX.captures(input) {
        return split_p_digits(&caps[1]);
    }

    input.to_string()
}

fn split_p_digits(digits: &str) -> String {
    let (seconds, micros) = digits.split_at(10);
    format!("{seconds}.{micros}")
}

pub fn validate_timestamp(ts: &str) -> Result<(), ValidationError> {
    if TIMESTAMP_REGEX.is_match(&normalize_timestamp(ts)) {
        Ok(())
    } else {
        Err(ValidationError::Timestamp(ts.to_string()))
    }
}

/// Validates and normalizes in one step; the form every handler dispatches with.
pub fn canonical_timestamp(ts: &str) -> Result<String, ValidationError> {
    validate_timestamp(ts)?;
    Ok(normalize_timestamp(ts))
}

pub fn normalize_emoji(emoji: &str) -> String {
    emoji.trim_matches(':').to_string()
}

pub fn validate_limit(limit: i64) -> Result<u32, ValidationError> {
    if (1..=i64::from(MAX_LIMIT)).contains(&limit) {
        Ok(limit as u32)
    } else {
        Err(ValidationError::Limit(limit))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("C01234ABCDE" ; "public channel")]
    #[test_case("G0123" ; "private group")]
    fn channel_ids_accepted(id: &str) {
        assert!(validate_channel_id(id).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("C" ; "prefix only")]
    #[test_case("c0123" ; "lowercase prefix")]
    #[test_case("D0123" ; "dm prefix")]
    #[test_case("C01-23" ; "punctuation")]
    #[test_case("#general" ; "channel name")]
    fn channel_ids_rejected(id: &str) {
        let err = validate_channel_id(id).unwrap_err();
        assert!(err.to_string().contains("invalid channel ID"));
        assert!(err.to_string().contains(id));
    }

    #[test]
    fn accepted_channel_ids_have_expected_shape() {
        for id in ["C1", "GABC123", "C0ZZZ9"] {
            validate_channel_id(id).unwrap();
            let mut chars = id.chars();
            assert!(matches!(chars.next(), Some('C' | 'G')));
            assert!(chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn user_ids() {
        assert!(validate_user_id("U01234").is_ok());
        assert!(validate_user_id("W01234").is_ok());
        assert!(validate_user_id("B01234").is_err());
        assert!(validate_user_id("u01234").is_err());
    }

    #[test_case("1234567890.123456", "1234567890.123456" ; "api form")]
    #[test_case("p1234567890123456", "1234567890.123456" ; "p form")]
    #[test_case("  p1234567890123456 ", "1234567890.123456" ; "p form with whitespace")]
    #[test_case(
        "https://acme.slack.com/archives/C01/p1234567890123456",
        "1234567890.123456" ; "message url"
    )]
    #[test_case(
        "https://acme.slack.com/archives/C01/p1234567890123456?thread_ts=1.2&cid=C01",
        "1234567890.123456" ; "message url with query"
    )]
    #[test_case("p123", "p123" ; "short p form untouched")]
    #[test_case("hello", "hello" ; "garbage untouched")]
    fn timestamp_normalization(input: &str, expected: &str) {
        assert_eq!(normalize_timestamp(input), expected);
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in [
            "1234567890.123456",
            "p1234567890123456",
            "https://x.slack.com/archives/C1/p1234567890123456",
            "nonsense",
            "  p12 ",
        ] {
            let once = normalize_timestamp(input);
            assert_eq!(normalize_timestamp(&once), once);
        }
    }

    #[test]
    fn accepted_timestamps_normalize_to_api_form() {
        for input in [
            "1.2",
            "1234567890.123456",
            "p1234567890123456",
            "https://acme.slack.com/archives/C01/p1234567890123456",
        ] {
            validate_timestamp(input).unwrap();
            assert!(TIMESTAMP_REGEX.is_match(&normalize_timestamp(input)));
        }
    }

    #[test]
    fn rejected_timestamp_reports_original_input() {
        let err = validate_timestamp("yesterday").unwrap_err();
        assert_eq!(err, ValidationError::Timestamp("yesterday".to_string()));
        assert!(validate_timestamp("1234567890").is_err());
        assert!(validate_timestamp("https://acme.slack.com/archives/C01/p123").is_err());
    }

    #[test]
    fn emoji_colons_are_stripped() {
        assert_eq!(normalize_emoji(":thumbsup:"), "thumbsup");
        assert_eq!(normalize_emoji("::tada::"), "tada");
        assert_eq!(normalize_emoji("rocket"), "rocket");
        for s in ["wave", ":x", "a:b", ""] {
            let once = normalize_emoji(s);
            assert_eq!(normalize_emoji(&once), once);
            assert_eq!(normalize_emoji(&format!(":{s}:")), normalize_emoji(s));
        }
    }

    #[test_case(1 ; "lower bound")]
    #[test_case(1000 ; "upper bound")]
    fn limits_accepted(limit: i64) {
        assert_eq!(validate_limit(limit).unwrap() as i64, limit);
    }

    #[test_case(0 ; "zero")]
    #[test_case(-5 ; "negative")]
    #[test_case(1001 ; "over max")]
    fn limits_rejected(limit: i64) {
        assert_eq!(validate_limit(limit), Err(ValidationError::Limit(limit)));
    }
}
