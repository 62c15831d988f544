use std::collections::BTreeMap;

use serde::Serialize;

use crate::monitoring::MonitoringTable;
use crate::table::normalize_header;

/// Relative span substituted when a parameter has a single distinct value.
const MIN_SPAN: f64 = 1e-6;

/// Observed (min, max) of one parameter; both absent when no row has a value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ParameterRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ParameterRange {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        values
            .into_iter()
            .fold(ParameterRange::default(), |range, v| ParameterRange {
                min: Some(range.min.map_or(v, |m| m.min(v))),
                max: Some(range.max.map_or(v, |m| m.max(v))),
            })
    }

    /// Bounds for a color scale. A degenerate range is widened so the span is
    /// never zero.
    pub fn scale_bounds(&self) -> Option<(f64, f64)> {
        let (min, max) = (self.min?, self.max?);
        if max > min {
            Some((min, max))
        } else {
            Some((min, min + (min.abs() * MIN_SPAN).max(MIN_SPAN)))
        }
    }
}

/// Per-parameter ranges keyed by normalized parameter name.
///
/// Parameters the table does not carry get an absent range. The table is only
/// read.
pub fn compute_ranges(
    table: &MonitoringTable,
    parameters: &[String],
) -> BTreeMap<String, ParameterRange> {
    parameters
        .iter()
        .map(|name| {
            let key = normalize_header(name);
            let range = ParameterRange::from_values(
                table
                    .records
                    .iter()
                    .filter_map(|record| record.values.get(&key).and_then(|m| m.value())),
            );
            (key, range)
        })
        .collect()
}

/// Ranges for every parameter column of the table.
pub fn all_ranges(table: &MonitoringTable) -> BTreeMap<String, ParameterRange> {
    let names: Vec<String> = table.parameters.iter().map(|c| c.key.clone()).collect();
    compute_ranges(table, &names)
}
