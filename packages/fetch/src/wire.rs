//! Decoding of statistic rows from the JSON the backend serves.
//!
//! Rows come in several shapes depending on the endpoint: department rows
//! carry `department_code`, municipality indicator rows carry
//! `muncipality_code` (sic), time rows carry `year` or `month`, and the
//! breakdown label key changes with the crime variable (`gender`,
//! `age_group`, `weapons_types`). Decoding is lenient: a row that is not an
//! object is skipped, a missing total is zero, and a body without the
//! expected envelope array is an empty result.

use geostats_stats_models::{BreakdownEntry, RawCode, StatRow};
use serde_json::{Map, Value};

/// Envelope key of the crime endpoints.
pub const CRIME_ENVELOPE: &str = "data";

/// Envelope key of the indicator endpoints.
pub const INDICATOR_ENVELOPE: &str = "results";

/// Properties that may hold a row's code, most specific first.
const CODE_KEYS: &[&str] = &[
    "muncipality_code",
    "municipality_code",
    "MPIO_CCDGO",
    "department_code",
    "DPTO_CCDGO",
    "code",
    "month",
    "year",
];

/// Properties that may hold a row's display label, most specific first.
const LABEL_KEYS: &[&str] = &["municipality", "department", "name", "month", "year"];

/// Extracts every decodable row from `body[envelope]`.
///
/// A bare top-level array is accepted as well.
#[must_use]
pub fn rows_from_envelope(body: &Value, envelope: &str) -> Vec<StatRow> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(object) => match object.get(envelope) {
            Some(Value::Array(items)) => items,
            _ => {
                log::warn!("response has no `{envelope}` array, treating as empty");
                return Vec::new();
            }
        },
        _ => {
            log::warn!("response is neither an object nor an array, treating as empty");
            return Vec::new();
        }
    };

    let rows: Vec<StatRow> = items.iter().filter_map(row_from_json).collect();
    if rows.len() < items.len() {
        log::warn!(
            "skipped {} of {} rows that were not objects",
            items.len() - rows.len(),
            items.len()
        );
    }
    rows
}

/// Decodes a single row. Returns `None` if `value` is not an object.
#[must_use]
pub fn row_from_json(value: &Value) -> Option<StatRow> {
    let object = value.as_object()?;

    let code = CODE_KEYS
        .iter()
        .find_map(|key| property(object, key).and_then(RawCode::from_json));

    let label = LABEL_KEYS
        .iter()
        .find_map(|key| property(object, key).and_then(scalar_text));

    let total = property(object, "total").map_or(0.0, number);

    let breakdown = property(object, "breakdown")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(breakdown_entry).collect())
        .unwrap_or_default();

    Some(StatRow {
        code,
        label,
        total,
        breakdown,
    })
}

fn breakdown_entry(value: &Value) -> Option<BreakdownEntry> {
    let object = value.as_object()?;
    let label = object
        .iter()
        .find(|(key, _)| !key.eq_ignore_ascii_case("total"))
        .map(|(_, value)| scalar_text(value).unwrap_or_default())?;
    let total = property(object, "total").map_or(0.0, number);
    Some(BreakdownEntry { label, total })
}

/// Looks up `name` exactly, then case-insensitively.
pub(crate) fn property<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
