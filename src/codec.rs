//! Hex, timestamp and digest helpers shared by the transaction lifecycle
//!
//! These are pure functions. `hex_fix` deliberately does not validate its
//! input; callers that need a guarantee use [`is_hex`] at the boundary.

use crate::clock::Clock;
use crate::error::{NotaryError, NotaryResult};

use chrono::{DateTime, NaiveDateTime, Utc};
use sha2::{Digest, Sha256};

/// Timestamp layout expected by the gateway: `YYYY:MM:DD-HH:MM:SS`, UTC
pub const TIMESTAMP_FORMAT: &str = "%Y:%m:%d-%H:%M:%S";

/// Strip a single leading `0x`/`0X` prefix
pub fn hex_fix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// True when `s` is non-empty hex once the prefix is removed
pub fn is_hex(s: &str) -> bool {
    let body = hex_fix(s);
    !body.is_empty() && body.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// UTF-8 bytes of `s`, lowercase hex, no prefix
pub fn string_to_hex(s: &str) -> String {
    hex::encode(s.as_bytes())
}

pub fn hex_to_bytes(h: &str) -> NotaryResult<Vec<u8>> {
    hex::decode(hex_fix(h)).map_err(|e| NotaryError::Decode(e.to_string()))
}

pub fn hex_to_string(h: &str) -> NotaryResult<String> {
    let bytes = hex_to_bytes(h)?;
    String::from_utf8(bytes).map_err(|e| NotaryError::Decode(e.to_string()))
}

/// Single SHA-256 pass, hex encoded
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn formatted_timestamp(clock: &dyn Clock) -> String {
    format_timestamp(clock.now())
}

pub fn parse_timestamp(s: &str) -> NotaryResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| NotaryError::Decode(format!("bad timestamp {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;

    #[test]
    fn test_hex_fix() {
        assert_eq!(hex_fix("0xabc"), "abc");
        assert_eq!(hex_fix("0Xabc"), "abc");
        assert_eq!(hex_fix("abc"), "abc");
        assert_eq!(hex_fix("0x"), "");
        // Only one prefix is removed and nothing is validated
        assert_eq!(hex_fix("0x0xzz"), "0xzz");
    }

    #[test]
    fn test_is_hex() {
        assert!(is_hex("0xdeadBEEF"));
        assert!(is_hex("00"));
        assert!(!is_hex("0x"));
        assert!(!is_hex(""));
        assert!(!is_hex("0xnothex"));
    }

    #[test]
    fn test_hex_string_roundtrip() {
        for s in ["", "hello", "ünïcödé ✓", "line\nbreak\0nul"] {
            assert_eq!(hex_to_string(&string_to_hex(s)).unwrap(), s);
        }
        assert_eq!(string_to_hex("hello"), "68656c6c6f");
        assert_eq!(hex_to_string("0x68656c6c6f").unwrap(), "hello");
    }

    #[test]
    fn test_hex_to_string_errors() {
        assert!(matches!(hex_to_string("abc"), Err(NotaryError::Decode(_))));
        assert!(matches!(hex_to_string("zz"), Err(NotaryError::Decode(_))));
        // valid hex, invalid UTF-8
        assert!(matches!(hex_to_string("ff"), Err(NotaryError::Decode(_))));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_timestamp_format_and_roundtrip() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 4, 5, 9).unwrap();
        let clock = FixedClock::new(at);
        let formatted = formatted_timestamp(&clock);
        assert_eq!(formatted, "2024:03:07-04:05:09");
        assert_eq!(formatted.len(), 19);
        assert_eq!(parse_timestamp(&formatted).unwrap(), at);
    }

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let earlier = format_timestamp(Utc.with_ymd_and_hms(2024, 9, 30, 23, 59, 59).unwrap());
        let later = format_timestamp(Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap());
        assert!(earlier < later);
    }
}
