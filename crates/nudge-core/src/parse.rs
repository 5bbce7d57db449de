//! Request parser — turns inbound chat text into a scheduled notification.
//!
//! The accepted shape is a 16-character date-time token, one whitespace
//! separator, then the notification text:
//!
//! ```text
//! 24.12.2030 18:30 wrap the presents
//! ```

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

/// Calendar format of the date-time token (`dd.MM.yyyy HH:mm`).
pub const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Whole-string request grammar, compiled once at first use.
///
/// - group 1: exactly 16 characters drawn from digits, dots, colons and
///   whitespace — the coarse shape of `dd.MM.yyyy HH:mm`;
/// - one whitespace separator;
/// - group 2: the payload — anything, as long as it does not begin with
///   whitespace. Dotall so multi-line payloads stay in one piece.
static REQUEST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A([0-9.:\s]{16})\s(\S.*)\z").expect("grammar is a valid pattern"));

/// A successfully parsed notification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    /// Requested delivery time, minute precision (seconds are always zero).
    pub scheduled_at: NaiveDateTime,
    /// Text to deliver, never empty.
    pub payload: String,
}

/// Why a message was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The message does not have the `<date-time> <text>` shape at all.
    #[error("message does not match `dd.MM.yyyy HH:mm <text>`")]
    MalformedFormat,

    /// The token had the right shape but is not a real calendar date-time.
    #[error("`{0}` is not a valid `dd.MM.yyyy HH:mm` date-time")]
    InvalidDateTime(String),
}

/// Parse `text` into a [`ParsedRequest`].
///
/// Pure function: no logging, no side effects — callers decide how loudly
/// to report a rejection.
pub fn parse(text: &str) -> Result<ParsedRequest, ParseError> {
    let caps = REQUEST_PATTERN
        .captures(text)
        .ok_or(ParseError::MalformedFormat)?;

    let token = &caps[1];
    let scheduled_at = NaiveDateTime::parse_from_str(token, DATE_TIME_FORMAT)
        .map_err(|_| ParseError::InvalidDateTime(token.to_string()))?;

    Ok(ParsedRequest {
        scheduled_at,
        payload: caps[2].to_string(),
    })
}
