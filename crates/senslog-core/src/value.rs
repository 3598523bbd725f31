//! Value types — timestamped fixed-point measurements.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de};

use crate::{Error, Result};

// ─── Measurement ─────────────────────────────────────────────────────────────

/// A fixed-point sensor reading: at most [`Self::MAX_DIGITS`] digits in
/// total, of which exactly one is fractional. Stored as a signed count of
/// tenths.
///
/// Serialises as a decimal string with exactly one fractional digit
/// (`"22.3"`); deserialises from either a JSON number or a string.
/// Sub-tenth precision is rejected rather than silently rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Measurement(i64);

impl Measurement {
  /// Maximum total digits, integer and fractional combined.
  pub const MAX_DIGITS: u32 = 10;

  /// Exclusive bound on the magnitude, counted in tenths.
  const LIMIT: i64 = 10_i64.pow(Self::MAX_DIGITS);

  /// Build a measurement from a raw count of tenths.
  pub fn from_tenths(tenths: i64) -> Result<Self> {
    if tenths <= -Self::LIMIT || tenths >= Self::LIMIT {
      return Err(Error::ValueOutOfRange(format!(
        "{} tenths exceeds {} total digits",
        tenths,
        Self::MAX_DIGITS
      )));
    }
    Ok(Self(tenths))
  }

  /// The raw count of tenths.
  pub fn tenths(self) -> i64 { self.0 }

  /// Convert from a binary float, rejecting anything that is not a whole
  /// number of tenths (within float tolerance).
  pub fn from_f64(v: f64) -> Result<Self> {
    if !v.is_finite() {
      return Err(Error::InvalidValue(format!("not a finite number: {v}")));
    }
    let scaled  = v * 10.0;
    let rounded = scaled.round();
    if (scaled - rounded).abs() > 1e-6 {
      return Err(Error::InvalidValue(format!(
        "{v} has more than one fractional digit"
      )));
    }
    if rounded <= -(Self::LIMIT as f64) || rounded >= Self::LIMIT as f64 {
      return Err(Error::ValueOutOfRange(format!(
        "{v} exceeds {} total digits",
        Self::MAX_DIGITS
      )));
    }
    Ok(Self(rounded as i64))
  }

  /// Parse the canonical decimal rendering: optional sign, integer digits,
  /// optionally a dot and exactly one fractional digit.
  pub fn parse(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidValue(format!("not a decimal: {s:?}"));

    let (sign, rest) = match s.strip_prefix('-') {
      Some(rest) => (-1_i64, rest),
      None       => (1_i64, s),
    };

    let (int_part, frac_part) = match rest.split_once('.') {
      Some((i, f)) => (i, Some(f)),
      None         => (rest, None),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
      return Err(invalid());
    }

    let frac: i64 = match frac_part {
      None    => 0,
      Some(f) => {
        if f.len() != 1 || !f.bytes().all(|b| b.is_ascii_digit()) {
          return Err(Error::InvalidValue(format!(
            "expected exactly one fractional digit: {s:?}"
          )));
        }
        f.parse().map_err(|_| invalid())?
      }
    };

    // A length check before parsing keeps the arithmetic below overflow-free.
    if int_part.trim_start_matches('0').len() as u32 > Self::MAX_DIGITS {
      return Err(Error::ValueOutOfRange(format!(
        "{s:?} exceeds {} total digits",
        Self::MAX_DIGITS
      )));
    }

    let whole: i64 = int_part.parse().map_err(|_| invalid())?;
    Self::from_tenths(sign * (whole * 10 + frac))
  }
}

impl fmt::Display for Measurement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if self.0 < 0 { "-" } else { "" };
    let abs  = self.0.unsigned_abs();
    write!(f, "{sign}{}.{}", abs / 10, abs % 10)
  }
}

impl FromStr for Measurement {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl Serialize for Measurement {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Measurement {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    struct MeasurementVisitor;

    impl de::Visitor<'_> for MeasurementVisitor {
      type Value = Measurement;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal with at most one fractional digit")
      }

      fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Measurement::parse(v).map_err(E::custom)
      }

      fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
        Measurement::from_f64(v).map_err(E::custom)
      }

      fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        let tenths = v
          .checked_mul(10)
          .ok_or_else(|| E::custom(format!("value out of range: {v}")))?;
        Measurement::from_tenths(tenths).map_err(E::custom)
      }

      fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        let signed =
          i64::try_from(v).map_err(|_| E::custom(format!("value out of range: {v}")))?;
        self.visit_i64(signed)
      }
    }

    deserializer.deserialize_any(MeasurementVisitor)
  }
}

// ─── Wire timestamps ─────────────────────────────────────────────────────────

/// Serde helpers for wire timestamps: RFC 3339 with microsecond precision
/// and a `Z` suffix, e.g. `2020-02-26T12:29:05.059173Z`.
pub mod timestamp {
  use chrono::{DateTime, SecondsFormat, Utc};
  use serde::{Deserialize, Deserializer, Serializer, de};

  pub fn serialize<S>(
    dt: &DateTime<Utc>,
    serializer: S,
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Micros, true))
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>,
  {
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(de::Error::custom)
  }
}

// ─── Value ───────────────────────────────────────────────────────────────────

/// One timestamped measurement belonging to an attribute-subscription.
/// Immutable once created; deleted only via the subscription cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
  #[serde(with = "timestamp")]
  pub timestamp: DateTime<Utc>,
  pub value:     Measurement,
}

/// Input to [`LogStore::submit_values`]: a value addressed by the external
/// attribute id it belongs to.
///
/// [`LogStore::submit_values`]: crate::store::LogStore::submit_values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewValue {
  #[serde(rename = "attribute")]
  pub attribute_id: i64,
  #[serde(with = "timestamp")]
  pub timestamp:    DateTime<Utc>,
  pub value:        Measurement,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_and_render() {
    assert_eq!(Measurement::parse("22.3").unwrap().tenths(), 223);
    assert_eq!(Measurement::parse("22").unwrap().tenths(), 220);
    assert_eq!(Measurement::parse("-0.5").unwrap().tenths(), -5);
    assert_eq!(Measurement::parse("0.0").unwrap().tenths(), 0);

    assert_eq!(Measurement::parse("22.3").unwrap().to_string(), "22.3");
    assert_eq!(Measurement::parse("22").unwrap().to_string(), "22.0");
    assert_eq!(Measurement::parse("-0.5").unwrap().to_string(), "-0.5");
  }

  #[test]
  fn parse_rejects_garbage() {
    for bad in ["", ".", "1.", ".5", "abc", "1,5", "1.5.5", "--1", "1e3"] {
      assert!(Measurement::parse(bad).is_err(), "accepted {bad:?}");
    }
  }

  #[test]
  fn parse_rejects_two_fractional_digits() {
    assert!(matches!(
      Measurement::parse("22.35"),
      Err(Error::InvalidValue(_))
    ));
  }

  #[test]
  fn digit_limit() {
    // 999_999_999.9 is the largest representable value.
    assert!(Measurement::parse("999999999.9").is_ok());
    assert!(matches!(
      Measurement::parse("1000000000.0"),
      Err(Error::ValueOutOfRange(_))
    ));
    assert!(Measurement::from_tenths(-10_000_000_000).is_err());
    assert!(Measurement::from_tenths(i64::MIN).is_err());
  }

  #[test]
  fn from_f64_rejects_sub_tenth_precision() {
    assert_eq!(Measurement::from_f64(22.3).unwrap().tenths(), 223);
    assert!(Measurement::from_f64(22.34).is_err());
    assert!(Measurement::from_f64(f64::NAN).is_err());
  }

  #[test]
  fn serde_accepts_number_and_string() {
    let from_number: Measurement = serde_json::from_str("22.3").unwrap();
    let from_string: Measurement = serde_json::from_str("\"22.3\"").unwrap();
    let from_int: Measurement = serde_json::from_str("22").unwrap();

    assert_eq!(from_number, from_string);
    assert_eq!(from_int.tenths(), 220);
  }

  #[test]
  fn serde_renders_string_with_one_fractional_digit() {
    let m = Measurement::from_f64(22.0).unwrap();
    assert_eq!(serde_json::to_string(&m).unwrap(), "\"22.0\"");
  }

  #[test]
  fn wire_timestamp_round_trip() {
    let v: Value =
      serde_json::from_str(r#"{"timestamp":"2020-02-26T12:29:05.059173Z","value":22.3}"#)
        .unwrap();
    assert_eq!(
      serde_json::to_value(v).unwrap(),
      serde_json::json!({"timestamp": "2020-02-26T12:29:05.059173Z", "value": "22.3"})
    );
  }
}
