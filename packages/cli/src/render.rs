//! Plain-text tables for the terminal.

use std::fmt::Write as _;

use geostats_dashboard::Choropleth;
use geostats_geography_models::format_number;
use geostats_stats_models::{PivotRecord, RawCode, StatRow, pivot_with};

/// Pivots `rows` and lays them out with one column per breakdown
/// category. Categories a row did not report print as 0.
#[must_use]
pub fn breakdown_table(rows: &[StatRow], normalize_label: impl Fn(&str) -> String) -> String {
    let pivot = pivot_with(rows, normalize_label);

    let mut header = vec!["AREA".to_string(), "TOTAL".to_string()];
    header.extend(pivot.categories.iter().cloned());

    let body = pivot.records.iter().map(|record| {
        let mut line = vec![record_label(record), format_number(record.total)];
        line.extend(
            pivot
                .stacked(record)
                .into_iter()
                .map(|(_, value)| format_number(value)),
        );
        line
    });

    table(std::iter::once(header).chain(body).collect())
}

/// Per-feature value and color, then the legend.
#[must_use]
pub fn choropleth_table(map: &Choropleth) -> String {
    let header = ["CODE", "NAME", "VALUE", "COLOR"].map(str::to_string).to_vec();
    let body = map.features.values().map(|joined| {
        vec![
            joined
                .code
                .map_or_else(|| "-".to_string(), |code| code.to_string()),
            joined.name.clone(),
            joined
                .value
                .map_or_else(|| "no data".to_string(), format_number),
            joined.class.clone(),
        ]
    });

    let mut out = table(std::iter::once(header).chain(body).collect());
    let _ = writeln!(out, "\n{} {} legend:", map.view_mode, map.level);
    for entry in &map.legend {
        let _ = writeln!(out, "  {}  {}", entry.color, entry.label);
    }
    out
}

fn record_label(record: &PivotRecord) -> String {
    if let Some(label) = &record.label {
        return label.clone();
    }
    match &record.code {
        Some(RawCode::Integer(code)) => code.to_string(),
        Some(RawCode::Float(code)) => code.to_string(),
        Some(RawCode::Text(code)) => code.clone(),
        None => "-".to_string(),
    }
}

fn table(lines: Vec<Vec<String>>) -> String {
    let columns = lines.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            lines
                .iter()
                .filter_map(|line| line.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for line in &lines {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geostats_stats_models::{BreakdownEntry, normalize_gender_label};

    fn row(label: &str, entries: &[(&str, f64)]) -> StatRow {
        StatRow {
            code: None,
            label: Some(label.to_string()),
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
    fn missing_categories_print_as_zero() {
        let rows = [
            row("ANTIOQUIA", &[("FEMENINO", 10.0), ("MASCULINO", 20.0)]),
            row("CALDAS", &[("masculino ", 5.0)]),
        ];
        let out = breakdown_table(&rows, normalize_gender_label);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "AREA       TOTAL  FEMENINO  MASCULINO");
        assert_eq!(lines[1], "ANTIOQUIA  30     10        20");
        assert_eq!(lines[2], "CALDAS     5      0         5");
    }

    #[test]
    fn rows_without_label_fall_back_to_code() {
        let rows = [StatRow {
            code: Some(RawCode::Integer(2022)),
            label: None,
            total: 1_500.0,
            breakdown: Vec::new(),
        }];
        let out = breakdown_table(&rows, str::to_string);
        assert_eq!(out.lines().nth(1), Some("2022  1,500"));
    }
}
