#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Choropleth scale and administrative division types.
//!
//! A [`BucketScale`] is the table-driven bucket function of one family at
//! one feature level: an ordered list of thresholds evaluated top-down,
//! first strictly-greater match wins, with a floor color below the last
//! threshold and an optional color for features without data.

pub mod divipola;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Level of the geographic layer being colored.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FeatureLevel {
    /// Department polygons (country view).
    Department,
    /// Municipality polygons of one department.
    Municipality,
}

impl FeatureLevel {
    /// Every level, outermost first.
    pub const ALL: [Self; 2] = [Self::Department, Self::Municipality];
}

/// One colored range: values strictly greater than `above` (and not
/// matched by an earlier bucket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Exclusive lower bound.
    pub above: f64,
    /// CSS color.
    pub color: String,
}

/// Which part of a [`BucketScale`] a value fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// Index into [`BucketScale::buckets`].
    Bucket(usize),
    /// At or below the last threshold.
    Floor,
    /// No value to classify.
    NoData,
}

/// Errors found while validating a [`BucketScale`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaleError {
    /// The scale has no thresholds at all.
    #[error("scale has no buckets")]
    NoBuckets,

    /// A threshold is NaN or infinite.
    #[error("bucket {index} threshold {value} is not finite")]
    NonFinite {
        /// Bucket index.
        index: usize,
        /// Offending threshold.
        value: f64,
    },

    /// Thresholds are not strictly descending.
    #[error("bucket {index} threshold {value} is not below previous threshold {previous}")]
    NotDescending {
        /// Bucket index.
        index: usize,
        /// Threshold of the bucket before it.
        previous: f64,
        /// Offending threshold.
        value: f64,
    },
}

/// Ordered thresholds and their colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BucketScale {
    /// Buckets from highest threshold to lowest.
    pub buckets: Vec<Bucket>,
    /// Color for values at or below the last threshold.
    pub floor: String,
    /// Color for features without data; the floor color when absent.
    #[serde(default)]
    pub no_data: Option<String>,
}

/// One line of a rendered legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendEntry {
    /// CSS color.
    pub color: String,
    /// Range label, e.g. `"60,000 - 100,000"`.
    pub label: String,
}

impl BucketScale {
    /// Builds a scale from `(threshold, color)` pairs, highest first.
    #[must_use]
    pub fn new<'a>(
        buckets: impl IntoIterator<Item = (f64, &'a str)>,
        floor: &str,
        no_data: Option<&str>,
    ) -> Self {
        Self {
            buckets: buckets
                .into_iter()
                .map(|(above, color)| Bucket {
                    above,
                    color: color.to_string(),
                })
                .collect(),
            floor: floor.to_string(),
            no_data: no_data.map(str::to_string),
        }
    }

    /// Checks that thresholds are finite and strictly descending.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScaleError`] found.
    pub fn validate(&self) -> Result<(), ScaleError> {
        if self.buckets.is_empty() {
            return Err(ScaleError::NoBuckets);
        }
        let mut previous: Option<f64> = None;
        for (index, bucket) in self.buckets.iter().enumerate() {
            if !bucket.above.is_finite() {
                return Err(ScaleError::NonFinite {
                    index,
                    value: bucket.above,
                });
            }
            match previous {
                Some(previous) if bucket.above >= previous => {
                    return Err(ScaleError::NotDescending {
                        index,
                        previous,
                        value: bucket.above,
                    });
                }
                _ => previous = Some(bucket.above),
            }
        }
        Ok(())
    }

    /// Classifies a value. `None` and NaN are [`Class::NoData`]; a value
    /// equal to a threshold belongs below it.
    #[must_use]
    pub fn classify(&self, value: Option<f64>) -> Class {
        let Some(value) = value.filter(|v| !v.is_nan()) else {
            return Class::NoData;
        };
        self.buckets
            .iter()
            .position(|bucket| value > bucket.above)
            .map_or(Class::Floor, Class::Bucket)
    }

    /// Color of a class.
    #[must_use]
    pub fn color(&self, class: Class) -> &str {
        match class {
            Class::Bucket(index) => self
                .buckets
                .get(index)
                .map_or(self.floor.as_str(), |bucket| bucket.color.as_str()),
            Class::Floor => &self.floor,
            Class::NoData => self.no_data_color(),
        }
    }

    /// Color of a value; the bucket function.
    #[must_use]
    pub fn color_for(&self, value: Option<f64>) -> &str {
        self.color(self.classify(value))
    }

    /// Color for features without data.
    #[must_use]
    pub fn no_data_color(&self) -> &str {
        self.no_data.as_deref().unwrap_or(&self.floor)
    }

    /// Legend entries, top bucket first, then the floor, then "No data"
    /// when it has its own color.
    #[must_use]
    pub fn legend(&self) -> Vec<LegendEntry> {
        let mut entries = Vec::with_capacity(self.buckets.len() + 2);
        let mut upper: Option<f64> = None;

        for bucket in &self.buckets {
            let label = upper.map_or_else(
                || format!("> {}", format_number(bucket.above)),
                |upper| {
                    format!(
                        "{} - {}",
                        format_number(bucket.above),
                        format_number(upper)
                    )
                },
            );
            entries.push(LegendEntry {
                color: bucket.color.clone(),
                label,
            });
            upper = Some(bucket.above);
        }

        let floor_label = match upper {
            Some(lowest) if lowest > 0.0 => format!("0 - {}", format_number(lowest)),
            Some(lowest) => format!("<= {}", format_number(lowest)),
            None => "All values".to_string(),
        };
        entries.push(LegendEntry {
            color: self.floor.clone(),
            label: floor_label,
        });

        if self.no_data_color() != self.floor {
            entries.push(LegendEntry {
                color: self.no_data_color().to_string(),
                label: "No data".to_string(),
            });
        }
        entries
    }
}

/// Formats a number with thousands separators and at most two decimals,
/// dropping trailing zeros (`1234567.891` → `"1,234,567.89"`, `12.5` →
/// `"12.5"`).
#[must_use]
pub fn format_number(value: f64) -> String {
    let text = format!("{:.2}", value.abs());
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut out = String::with_capacity(text.len() + integer.len() / 3 + 1);
    if value < 0.0 && text.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        out.push('-');
    }
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crime() -> BucketScale {
        BucketScale::new(
            [
                (100_000.0, "#FF0000"),
                (60_000.0, "#FF7F00"),
                (30_000.0, "#FFB84D"),
                (1_000.0, "#FFFF99"),
            ],
            "#FFFFFF",
            None,
        )
    }

    #[test]
    fn threshold_belongs_to_lower_bucket() {
        let scale = crime();
        assert_eq!(scale.classify(Some(100_000.0)), Class::Bucket(1));
        assert_eq!(scale.classify(Some(100_000.5)), Class::Bucket(0));
        assert_eq!(scale.color_for(Some(100_000.0)), "#FF7F00");
        assert_eq!(scale.classify(Some(1_000.0)), Class::Floor);
        assert_eq!(scale.classify(Some(0.0)), Class::Floor);
    }

    #[test]
    fn missing_value_is_no_data() {
        let scale = crime();
        assert_eq!(scale.classify(None), Class::NoData);
        assert_eq!(scale.classify(Some(f64::NAN)), Class::NoData);
        assert_eq!(scale.color_for(None), "#FFFFFF");

        let scale = BucketScale {
            no_data: Some("#CCCCCC".to_string()),
            ..crime()
        };
        assert_eq!(scale.color_for(None), "#CCCCCC");
    }

    #[test]
    fn legend_labels() {
        let labels: Vec<String> = crime().legend().into_iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec![
                "> 100,000",
                "60,000 - 100,000",
                "30,000 - 60,000",
                "1,000 - 30,000",
                "0 - 1,000",
            ]
        );
    }

    #[test]
    fn legend_lists_distinct_no_data_color() {
        let scale = BucketScale::new([(50.0, "#111111")], "#EEEEEE", Some("#FFFFFF"));
        let legend = scale.legend();
        assert_eq!(legend.len(), 3);
        assert_eq!(legend[2].label, "No data");
        assert_eq!(legend[2].color, "#FFFFFF");
    }

    #[test]
    fn validation() {
        assert_eq!(crime().validate(), Ok(()));
        assert_eq!(
            BucketScale::new([] as [(f64, &str); 0], "#FFFFFF", None).validate(),
            Err(ScaleError::NoBuckets)
        );
        assert!(matches!(
            BucketScale::new([(10.0, "a"), (10.0, "b")], "c", None).validate(),
            Err(ScaleError::NotDescending { index: 1, .. })
        ));
        assert!(matches!(
            BucketScale::new([(f64::INFINITY, "a")], "c", None).validate(),
            Err(ScaleError::NonFinite { index: 0, .. })
        ));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1_234_567.891), "1,234,567.89");
        assert_eq!(format_number(100_000.0), "100,000");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(-1_500.0), "-1,500");
        assert_eq!(format_number(-0.001), "0");
    }

    #[test]
    fn level_names() {
        assert_eq!(FeatureLevel::Municipality.to_string(), "municipality");
        assert_eq!(
            "Department".parse::<FeatureLevel>().unwrap(),
            FeatureLevel::Department
        );
    }
}
