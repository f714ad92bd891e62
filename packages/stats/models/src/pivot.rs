//! Breakdown pivot.
//!
//! Turns "total + labeled breakdown list" rows into flat, category-keyed
//! records plus the ordered set of categories seen across the dataset.
//! Chart stacking and legend order both come from [`Pivot::categories`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::StatRow;
use crate::code::RawCode;

/// One row flattened so that each breakdown label is its own field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRecord {
    /// Code of the source row, untouched.
    pub code: Option<RawCode>,
    /// Display label of the source row (department name, year, ...).
    pub label: Option<String>,
    /// Row total.
    pub total: f64,
    /// Breakdown totals keyed by category label. Only labels present in
    /// this row's breakdown appear here.
    pub fields: BTreeMap<String, f64>,
}

impl PivotRecord {
    /// Returns the value of `category` if this row reported it.
    #[must_use]
    pub fn get(&self, category: &str) -> Option<f64> {
        self.fields.get(category).copied()
    }

    /// Returns the value of `category`, treating an absent key as zero.
    /// This is how renderers must read a record.
    #[must_use]
    pub fn value_or_zero(&self, category: &str) -> f64 {
        self.get(category).unwrap_or(0.0)
    }
}

/// Result of [`pivot`]: flat records and their categories in first-seen
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pivot {
    /// One record per input row, in input order.
    pub records: Vec<PivotRecord>,
    /// Every distinct breakdown label, in first-seen order across rows.
    pub categories: Vec<String>,
}

impl Pivot {
    /// Values of `record` in category order, missing categories as zero.
    /// This is one stacked bar.
    #[must_use]
    pub fn stacked<'a>(&'a self, record: &PivotRecord) -> Vec<(&'a str, f64)> {
        self.categories
            .iter()
            .map(|category| (category.as_str(), record.value_or_zero(category)))
            .collect()
    }
}

/// Pivots `rows` keeping breakdown labels as they are.
#[must_use]
pub fn pivot(rows: &[StatRow]) -> Pivot {
    pivot_with(rows, str::to_string)
}

/// Pivots `rows`, passing every breakdown label through `normalize_label`
/// first. Labels that collide after normalization are summed within a row.
#[must_use]
pub fn pivot_with<F>(rows: &[StatRow], normalize_label: F) -> Pivot
where
    F: Fn(&str) -> String,
{
    let mut categories = Vec::new();
    let mut seen = BTreeSet::new();

    let records = rows
        .iter()
        .map(|row| {
            let mut fields = BTreeMap::new();
            for entry in &row.breakdown {
                let label = normalize_label(&entry.label);
                if seen.insert(label.clone()) {
                    categories.push(label.clone());
                }
                *fields.entry(label).or_insert(0.0) += entry.total;
            }
            PivotRecord {
                code: row.code.clone(),
                label: row.label.clone(),
                total: row.total,
                fields,
            }
        })
        .collect();

    Pivot {
        records,
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BreakdownEntry, normalize_gender_label};

    fn row(code: &str, entries: &[(&str, f64)]) -> StatRow {
        StatRow {
            code: Some(RawCode::from(code)),
            label: Some(format!("area {code}")),
            total: entries.iter().map(|(_, v)| v).sum(),
            breakdown: entries
                .iter()
                .map(|(label, total)| BreakdownEntry {
                    label: (*label).to_string(),
                    total: *total,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_input() {
        let result = pivot(&[]);
        assert!(result.records.is_empty());
        assert!(result.categories.is_empty());
    }

    #[test]
    fn flattens_breakdown_into_fields() {
        let result = pivot(&[row("05", &[("FEMENINO", 10.0), ("MASCULINO", 4.0)])]);
        let record = &result.records[0];
        assert!((record.value_or_zero("FEMENINO") - 10.0).abs() < f64::EPSILON);
        assert!((record.value_or_zero("MASCULINO") - 4.0).abs() < f64::EPSILON);
        assert!((record.total - 14.0).abs() < f64::EPSILON);
        assert_eq!(record.label.as_deref(), Some("area 05"));
    }

    #[test]
    fn disjoint_labels_union_in_first_seen_order() {
        let rows = [
            row("05", &[("B", 1.0), ("A", 2.0)]),
            row("08", &[("C", 3.0)]),
            row("11", &[("A", 1.0), ("D", 1.0)]),
        ];
        let result = pivot(&rows);
        assert_eq!(result.categories, vec!["B", "A", "C", "D"]);
        assert_eq!(pivot(&rows), result, "pivot must be deterministic");
    }

    #[test]
    fn absent_keys_are_not_synthesized() {
        let rows = [row("05", &[("A", 2.0)]), row("08", &[("B", 3.0)])];
        let result = pivot(&rows);
        assert_eq!(result.records[0].get("B"), None);
        assert!(result.records[0].value_or_zero("B").abs() < f64::EPSILON);
        assert_eq!(result.records[0].fields.len(), 1);
    }

    #[test]
    fn stacked_follows_category_order() {
        let rows = [row("05", &[("A", 2.0)]), row("08", &[("B", 3.0), ("A", 1.0)])];
        let result = pivot(&rows);
        let stacked = result.stacked(&result.records[0]);
        assert_eq!(stacked, vec![("A", 2.0), ("B", 0.0)]);
    }

    #[test]
    fn normalized_labels_collide_and_sum() {
        let rows = [row(
            "05",
            &[("femenino ", 2.0), ("FEMENINO", 3.0), ("SIN DATO", 1.0), ("", 1.0)],
        )];
        let result = pivot_with(&rows, normalize_gender_label);
        assert_eq!(result.categories, vec!["FEMENINO", "NO REPORTADO"]);
        assert!((result.records[0].value_or_zero("FEMENINO") - 5.0).abs() < f64::EPSILON);
        assert!((result.records[0].value_or_zero("NO REPORTADO") - 2.0).abs() < f64::EPSILON);
    }
}
