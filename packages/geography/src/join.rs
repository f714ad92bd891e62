//! Statistic-to-polygon join.
//!
//! Both sides go through [`geostats_stats_models::normalize`]: rows once,
//! into a hash index, features once per lookup.

use std::collections::{BTreeMap, HashMap};

use geostats_geography_models::BucketScale;
use geostats_stats_models::{AdminCode, StatRow};
use serde::Serialize;

use crate::GeoFeature;

/// One feature's join result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Joined<C> {
    /// Normalized feature code.
    pub code: Option<AdminCode>,
    /// Feature name.
    pub name: String,
    /// Matching row total; `None` when no row matched.
    pub value: Option<f64>,
    /// Bucket assigned by the bucket function.
    pub class: C,
}

/// Indexes row totals by normalized code. Rows without a usable code are
/// skipped; when two rows share a code the first wins.
#[must_use]
pub fn value_index(rows: &[StatRow]) -> HashMap<AdminCode, f64> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        match row.admin_code() {
            Some(code) => {
                index.entry(code).or_insert(row.total);
            }
            None => log::trace!("row without a usable code skipped: {:?}", row.code),
        }
    }
    index
}

/// Joins `rows` onto `features` and buckets every feature with `bucket_fn`.
/// A feature without a matching row gets `value: None` and
/// `bucket_fn(None)`.
pub fn join<C>(
    features: &[GeoFeature],
    rows: &[StatRow],
    bucket_fn: impl Fn(Option<f64>) -> C,
) -> BTreeMap<usize, Joined<C>> {
    let index = value_index(rows);
    features
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            let code = feature.admin_code();
            let value = code.and_then(|code| index.get(&code).copied());
            let joined = Joined {
                code,
                name: feature.name.clone(),
                value,
                class: bucket_fn(value),
            };
            (i, joined)
        })
        .collect()
}

/// [`join`] with a palette scale as the bucket function; the class is the
/// feature's fill color.
#[must_use]
pub fn join_scale<'a>(
    features: &[GeoFeature],
    rows: &[StatRow],
    scale: &'a BucketScale,
) -> BTreeMap<usize, Joined<&'a str>> {
    join(features, rows, |value| scale.color_for(value))
}
