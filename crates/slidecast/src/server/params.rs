//! Navigation parameters from paths and query strings.
//!
//! Any integer is accepted. Values past the `i64` range saturate, so the
//! clamp in `live::nav` sees them like any other out-of-range input.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

/// Parse an optionally signed run of digits, saturating on overflow.
pub fn parse_saturating(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Some(n);
    }
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

struct SaturatingVisitor;

impl Visitor<'_> for SaturatingVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        Ok(i64::try_from(v).unwrap_or(i64::MAX))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        parse_saturating(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

pub fn saturating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    deserializer.deserialize_any(SaturatingVisitor)
}

/// For use with `#[serde(default)]`: absent stays `None`.
pub fn saturating_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    saturating(deserializer).map(Some)
}

/// `{idx}` segment of the goto routes.
#[derive(Debug, Deserialize)]
pub struct SlidePath {
    #[serde(deserialize_with = "saturating")]
    pub idx: i64,
}
