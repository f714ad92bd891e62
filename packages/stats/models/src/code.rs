//! Administrative code normalization.
//!
//! Department and municipality codes arrive in whatever shape the serving
//! layer happened to use: zero-padded strings (`"05"`), bare numbers (`5`),
//! floats out of a JSON number (`5.0`) or whitespace-padded text
//! (`" 5 "`). [`normalize`] folds all of them onto one canonical
//! [`AdminCode`], and it is the only function allowed to do so. Both sides
//! of every join go through it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical administrative code: the smallest non-negative integer the raw
/// representation round-trips to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AdminCode(u32);

impl AdminCode {
    /// Wraps an already-canonical integer code.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the integer value of this code.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Formats the code zero-padded to `width` digits (e.g. `05` for
    /// Antioquia at width 2), the form the boundary service expects in URLs.
    #[must_use]
    pub fn padded(self, width: usize) -> String {
        format!("{:0width$}", self.0)
    }
}

impl fmt::Display for AdminCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when text cannot be normalized into an [`AdminCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid administrative code: {input:?}")]
pub struct InvalidCodeError {
    /// The text that was rejected.
    pub input: String,
}

impl FromStr for AdminCode {
    type Err = InvalidCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_text(s).ok_or_else(|| InvalidCodeError {
            input: s.to_string(),
        })
    }
}

/// An administrative code exactly as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCode {
    /// Integral JSON number.
    Integer(i64),
    /// Non-integral (or exponent-form) JSON number.
    Float(f64),
    /// Any string form, possibly padded with zeros or whitespace.
    Text(String),
}

impl RawCode {
    /// Normalizes this raw code. See [`normalize`].
    #[must_use]
    pub fn normalize(&self) -> Option<AdminCode> {
        match self {
            Self::Integer(value) => u32::try_from(*value).ok().map(AdminCode),
            Self::Float(value) => normalize_float(*value),
            Self::Text(text) => normalize_text(text),
        }
    }

    /// Extracts a raw code from a JSON scalar. Objects, arrays, booleans
    /// and `null` yield `None`.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            _ => None,
        }
    }
}

impl From<AdminCode> for RawCode {
    fn from(code: AdminCode) -> Self {
        Self::Integer(i64::from(code.0))
    }
}

impl From<&str> for RawCode {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for RawCode {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Normalizes a possibly-missing raw code into its canonical form.
///
/// Strings are trimmed and parsed base-10; they must consist of ASCII
/// digits only (no sign, no letters). Numbers must be non-negative and
/// integral. Empty, missing or unparseable input yields `None`.
///
/// `"05"`, `"5"`, `5` and `" 5 "` all normalize to the same code, and
/// normalizing an already-normalized code is the identity.
#[must_use]
pub fn normalize(raw: Option<&RawCode>) -> Option<AdminCode> {
    raw.and_then(RawCode::normalize)
}

/// Normalizes a JSON scalar holding a code. See [`normalize`].
#[must_use]
pub fn normalize_json(value: &serde_json::Value) -> Option<AdminCode> {
    RawCode::from_json(value).as_ref().and_then(RawCode::normalize)
}

fn normalize_text(text: &str) -> Option<AdminCode> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<u32>().ok().map(AdminCode)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
fn normalize_float(value: f64) -> Option<AdminCode> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(AdminCode(value as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCode {
        RawCode::Text(s.to_string())
    }

    #[test]
    fn representation_invariant() {
        let expected = Some(AdminCode::new(5));
        assert_eq!(normalize(Some(&text("05"))), expected);
        assert_eq!(normalize(Some(&text("5"))), expected);
        assert_eq!(normalize(Some(&RawCode::Integer(5))), expected);
        assert_eq!(normalize(Some(&text(" 5 "))), expected);
        assert_eq!(normalize(Some(&RawCode::Float(5.0))), expected);
    }

    #[test]
    fn idempotent() {
        for raw in [text("05"), text("00123"), RawCode::Integer(76), text(" 8\t")] {
            let once = normalize(Some(&raw)).unwrap();
            let twice = normalize(Some(&RawCode::from(once))).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn rejects_unparseable() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some(&text(""))), None);
        assert_eq!(normalize(Some(&text("   "))), None);
        assert_eq!(normalize(Some(&text("5a"))), None);
        assert_eq!(normalize(Some(&text("-5"))), None);
        assert_eq!(normalize(Some(&text("+5"))), None);
        assert_eq!(normalize(Some(&RawCode::Integer(-1))), None);
        assert_eq!(normalize(Some(&RawCode::Float(5.5))), None);
        assert_eq!(normalize(Some(&RawCode::Float(f64::NAN))), None);
    }

    #[test]
    fn zero_is_a_valid_code() {
        assert_eq!(normalize(Some(&text("000"))), Some(AdminCode::new(0)));
    }

    #[test]
    fn from_json_scalars() {
        assert_eq!(normalize_json(&serde_json::json!("05")), Some(AdminCode::new(5)));
        assert_eq!(normalize_json(&serde_json::json!(5)), Some(AdminCode::new(5)));
        assert_eq!(normalize_json(&serde_json::json!(null)), None);
        assert_eq!(normalize_json(&serde_json::json!({"code": 5})), None);
    }

    #[test]
    fn untagged_deserialization() {
        let codes: Vec<RawCode> = serde_json::from_str(r#"["05", 5, 5.0]"#).unwrap();
        assert_eq!(codes[0], text("05"));
        assert_eq!(codes[1], RawCode::Integer(5));
        assert_eq!(codes[2], RawCode::Float(5.0));
        assert!(codes.iter().all(|c| c.normalize() == Some(AdminCode::new(5))));
    }

    #[test]
    fn padded_and_parsed() {
        assert_eq!(AdminCode::new(5).padded(2), "05");
        assert_eq!(AdminCode::new(5001).padded(5), "05001");
        assert_eq!("05".parse::<AdminCode>(), Ok(AdminCode::new(5)));
        assert!("x5".parse::<AdminCode>().is_err());
    }
}
