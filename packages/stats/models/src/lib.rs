#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistic families, administrative codes, filters and drill-down levels.
//!
//! The dashboard shows three independent statistic families (crime
//! incidents, census "fundamental" counts and derived "primary" rate
//! indicators) over Colombian departments and municipalities. This crate
//! holds the plain data those families exchange: the rows they fetch, the
//! filters that select them, and the canonical administrative codes used
//! to join rows to map polygons.

pub mod code;
pub mod level;
pub mod pivot;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use code::{AdminCode, RawCode, normalize};
pub use level::{GeoLevel, LevelParseError, TimeLevel};
pub use pivot::{Pivot, PivotRecord, pivot, pivot_with};

/// The statistic family currently driving the map and charts.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ViewMode {
    /// Crime incident counts.
    #[default]
    Crime,
    /// Census fundamental counts (population, dwellings, ...).
    Fundamental,
    /// Derived primary rate indicators.
    Primary,
}

impl ViewMode {
    /// Every family, in display order.
    pub const ALL: [Self; 3] = [Self::Crime, Self::Fundamental, Self::Primary];
}

/// Which variable crime incidents are broken down by.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CrimeVariable {
    /// Victim gender.
    #[default]
    Gender,
    /// Victim age group.
    AgeGroup,
    /// Weapon type used.
    WeaponsTypes,
}

impl CrimeVariable {
    /// Label normalizer applied to this variable's breakdown before
    /// pivoting.
    #[must_use]
    pub fn label_normalizer(self) -> fn(&str) -> String {
        match self {
            Self::Gender => normalize_gender_label,
            Self::AgeGroup | Self::WeaponsTypes => trim_label,
        }
    }
}

fn trim_label(label: &str) -> String {
    label.trim().to_string()
}

/// Folds gender labels into `FEMENINO`, `MASCULINO` or `NO REPORTADO`.
#[must_use]
pub fn normalize_gender_label(label: &str) -> String {
    match label.trim().to_uppercase().as_str() {
        "FEMENINO" => "FEMENINO".to_string(),
        "MASCULINO" => "MASCULINO".to_string(),
        _ => "NO REPORTADO".to_string(),
    }
}

/// Which hierarchy a drill-down operation moves along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Axis {
    /// Country → department → municipality.
    Geography,
    /// Years → year → month.
    Time,
}

/// One labeled sub-total of a [`StatRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    /// Category label (e.g. `FEMENINO`, `18-25`, `ARMA BLANCA`).
    pub label: String,
    /// Sub-total for the category.
    pub total: f64,
}

/// A statistic row as returned by any family's endpoint.
///
/// `code` is kept exactly as received; it must go through
/// [`normalize`] before it is used as a join key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    /// Administrative code (or period number for time rows), raw.
    pub code: Option<RawCode>,
    /// Display label (department name, municipality name, year, ...).
    pub label: Option<String>,
    /// Row total.
    pub total: f64,
    /// Labeled sub-totals in server order.
    #[serde(default)]
    pub breakdown: Vec<BreakdownEntry>,
}

impl StatRow {
    /// The normalized code of this row, if it has a usable one.
    #[must_use]
    pub fn admin_code(&self) -> Option<AdminCode> {
        normalize(self.code.as_ref())
    }
}

/// Filter of the crime family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrimeFilter {
    /// Crime type key (e.g. `HURTO_PERSONAS`).
    pub crime_type: String,
    /// Breakdown variable.
    pub variable: CrimeVariable,
    /// Selected year, when drilled into the time hierarchy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Selected month (1-12), when drilled below a year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    /// Selected department.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_code: Option<AdminCode>,
    /// Selected municipality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality_code: Option<AdminCode>,
}

impl CrimeFilter {
    /// A country-wide, all-years filter.
    #[must_use]
    pub fn new(crime_type: impl Into<String>, variable: CrimeVariable) -> Self {
        Self {
            crime_type: crime_type.into(),
            variable,
            year: None,
            month: None,
            department_code: None,
            municipality_code: None,
        }
    }
}

impl Default for CrimeFilter {
    fn default() -> Self {
        Self::new("HURTO_PERSONAS", CrimeVariable::Gender)
    }
}

/// Filter of the fundamental and primary indicator families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorFilter {
    /// Indicator column (e.g. `male_count`, `unemployment_rate`).
    pub column: String,
    /// Selected department; `None` means country-wide.
    pub department_code: Option<AdminCode>,
    /// Selected municipality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality_code: Option<AdminCode>,
}

impl IndicatorFilter {
    /// A country-wide filter on `column`.
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            department_code: None,
            municipality_code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_mode_text_forms() {
        assert_eq!(ViewMode::Fundamental.to_string(), "fundamental");
        assert_eq!("PRIMARY".parse::<ViewMode>(), Ok(ViewMode::Primary));
        assert_eq!(ViewMode::default(), ViewMode::Crime);
    }

    #[test]
    fn crime_filter_body_omits_unset_fields() {
        let body = serde_json::to_value(CrimeFilter::default()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"crime_type": "HURTO_PERSONAS", "variable": "gender"})
        );

        let mut filter = CrimeFilter::new("HOMICIDIOS", CrimeVariable::WeaponsTypes);
        filter.department_code = Some(AdminCode::new(5));
        let body = serde_json::to_value(filter).unwrap();
        assert_eq!(body["department_code"], 5);
        assert_eq!(body["variable"], "weapons_types");
    }

    #[test]
    fn indicator_filter_sends_null_department() {
        let body = serde_json::to_value(IndicatorFilter::new("male_count")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"column": "male_count", "department_code": null})
        );
    }

    #[test]
    fn gender_labels_fold() {
        assert_eq!(normalize_gender_label(" femenino"), "FEMENINO");
        assert_eq!(normalize_gender_label("Masculino"), "MASCULINO");
        assert_eq!(normalize_gender_label("NO REPORTA"), "NO REPORTADO");
        assert_eq!(CrimeVariable::AgeGroup.label_normalizer()(" 18-25 "), "18-25");
    }

    #[test]
    fn row_code_is_normalized_on_demand() {
        let row = StatRow {
            code: Some(RawCode::from("05")),
            label: Some("ANTIOQUIA".to_string()),
            total: 10.0,
            breakdown: Vec::new(),
        };
        assert_eq!(row.admin_code(), Some(AdminCode::new(5)));
    }
}
