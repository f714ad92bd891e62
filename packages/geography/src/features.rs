//! Reduction of boundary-service GeoJSON to [`GeoFeature`]s.
//!
//! The department layer names its code `DPTO_CCDGO` (older extracts use
//! `DPTO`), the municipality layer `MPIO_CCDGO` or the five-digit
//! `MPIO_CDPMP`. Property names are matched case-insensitively.

use geojson::{Feature, GeoJson, JsonObject, JsonValue};
use geostats_geography_models::FeatureLevel;
use geostats_geography_models::divipola;
use geostats_stats_models::{AdminCode, RawCode};
use serde::Serialize;

use crate::GeoError;

const DEPARTMENT_CODE_KEYS: &[&str] = &["DPTO_CCDGO", "DPTO", "code"];
const DEPARTMENT_NAME_KEYS: &[&str] = &["DPTO_CNMBR", "NOM_DPTO", "name"];
const MUNICIPALITY_CODE_KEYS: &[&str] = &["MPIO_CCDGO", "MPIO_CDPMP", "code"];
const MUNICIPALITY_NAME_KEYS: &[&str] = &["MPIO_CNMBR", "NOM_MPIO", "name"];

/// A polygon feature reduced to what the join needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoFeature {
    /// Administrative code exactly as the layer carried it.
    pub code: Option<RawCode>,
    /// Display name.
    pub name: String,
    /// Polygon, when the layer had one.
    pub geometry: Option<geojson::Geometry>,
}

impl GeoFeature {
    /// The normalized code of this feature.
    #[must_use]
    pub fn admin_code(&self) -> Option<AdminCode> {
        self.code.as_ref().and_then(RawCode::normalize)
    }
}

/// Parses a GeoJSON document into features of `level`.
///
/// A bare `Feature` is accepted as a collection of one.
///
/// # Errors
///
/// * [`GeoError::GeoJson`] if `value` is not GeoJSON
/// * [`GeoError::Conversion`] if it is a bare geometry
pub fn features_from_json(value: JsonValue, level: FeatureLevel) -> Result<Vec<GeoFeature>, GeoError> {
    let document = GeoJson::from_json_value(value).map_err(Box::new)?;
    let features = match document {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(GeoError::Conversion {
                message: format!("expected a {level} feature collection, got a bare geometry"),
            });
        }
    };
    Ok(features.into_iter().map(|f| reduce(f, level)).collect())
}

fn reduce(feature: Feature, level: FeatureLevel) -> GeoFeature {
    let (code_keys, name_keys) = match level {
        FeatureLevel::Department => (DEPARTMENT_CODE_KEYS, DEPARTMENT_NAME_KEYS),
        FeatureLevel::Municipality => (MUNICIPALITY_CODE_KEYS, MUNICIPALITY_NAME_KEYS),
    };
    let properties = feature.properties.unwrap_or_default();

    let code = code_keys
        .iter()
        .find_map(|key| property(&properties, key).and_then(RawCode::from_json));

    let name = name_keys
        .iter()
        .find_map(|key| property(&properties, key).and_then(JsonValue::as_str))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| fallback_name(level, code.as_ref()))
        .unwrap_or_default();

    GeoFeature {
        code,
        name,
        geometry: feature.geometry,
    }
}

fn fallback_name(level: FeatureLevel, code: Option<&RawCode>) -> Option<String> {
    let code = code.and_then(RawCode::normalize)?;
    match level {
        FeatureLevel::Department => divipola::department_name(code).map(str::to_string),
        FeatureLevel::Municipality => None,
    }
}

fn property<'a>(properties: &'a JsonObject, name: &str) -> Option<&'a JsonValue> {
    properties.get(name).or_else(|| {
        properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}
