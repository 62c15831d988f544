//! Monitoring records: one sampling event per row of the concentration sheet.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::config::ConcentrationSource;
use crate::error::Result;
use crate::loader;
use crate::table::{CellValue, Column, Table, normalize_header};

static MISSING: Measurement = Measurement::Missing;

/// A parameter cell after numeric coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "raw", rename_all = "snake_case")]
pub enum Measurement {
    Value(f64),
    Missing,
    /// Present in the sheet but not a number
    Unparseable(String),
}

impl Measurement {
    fn from_cell(cell: &CellValue) -> Self {
        if cell.is_empty() {
            return Measurement::Missing;
        }
        match cell.as_f64() {
            Some(v) => Measurement::Value(v),
            None => Measurement::Unparseable(cell.to_text().unwrap_or_default()),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Measurement::Value(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringRecord {
    pub station: String,
    pub sampled_at: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Keyed by normalized parameter name
    pub values: BTreeMap<String, Measurement>,
}

impl MonitoringRecord {
    /// Case-insensitive parameter access; unknown parameters read as missing.
    pub fn measurement(&self, parameter: &str) -> &Measurement {
        self.values
            .get(&normalize_header(parameter))
            .unwrap_or(&MISSING)
    }
}

/// The loaded concentration sheet. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringTable {
    pub source: PathBuf,
    pub parameters: Vec<Column>,
    pub records: Vec<MonitoringRecord>,
    /// Rows skipped for a missing or non-numeric coordinate
    pub dropped_rows: usize,
}

impl MonitoringTable {
    /// Read and validate the concentration spreadsheet at `path`.
    pub fn load(path: impl AsRef<Path>, source: &ConcentrationSource) -> Result<Self> {
        let path = path.as_ref();
        let rows = loader::read_sheet(path, source.sheet.as_deref())?;
        let table = Table::from_rows(rows, 0)?;
        let mut loaded = Self::from_table(&table, source)?;
        loaded.source = path.to_path_buf();

        info!(
            "loaded {} monitoring records with {} parameters from {}",
            loaded.records.len(),
            loaded.parameters.len(),
            path.display()
        );
        Ok(loaded)
    }

    /// Validate columns and coerce values. Nothing is returned when a required
    /// column is missing.
    pub fn from_table(table: &Table, source: &ConcentrationSource) -> Result<Self> {
        let base = source.base_columns();
        let mut required = base.clone();
        required.extend(source.parameters.iter().cloned());
        let indices = table.require(&required)?;
        let (station_idx, time_idx, lon_idx, lat_idx) =
            (indices[0], indices[1], indices[2], indices[3]);

        let parameter_indices: Vec<usize> = if source.parameters.is_empty() {
            (0..table.columns.len())
                .filter(|idx| !indices.contains(idx) && !table.columns[*idx].key.is_empty())
                .collect()
        } else {
            indices[base.len()..].to_vec()
        };
        let parameters: Vec<Column> = parameter_indices
            .iter()
            .map(|idx| table.columns[*idx].clone())
            .collect();

        let mut records = Vec::with_capacity(table.rows.len());
        let mut dropped_rows = 0;
        for row in 0..table.rows.len() {
            let (Some(latitude), Some(longitude)) = (
                table.cell(row, lat_idx).as_f64(),
                table.cell(row, lon_idx).as_f64(),
            ) else {
                dropped_rows += 1;
                continue;
            };

            let values = parameter_indices
                .iter()
                .zip(&parameters)
                .map(|(idx, column)| {
                    (column.key.clone(), Measurement::from_cell(table.cell(row, *idx)))
                })
                .collect();

            records.push(MonitoringRecord {
                station: table.cell(row, station_idx).to_text().unwrap_or_default(),
                sampled_at: table.cell(row, time_idx).to_text().unwrap_or_default(),
                latitude,
                longitude,
                values,
            });
        }

        if dropped_rows > 0 {
            warn!(
                "dropped {} rows without a valid latitude/longitude",
                dropped_rows
            );
        }

        Ok(MonitoringTable {
            source: PathBuf::new(),
            parameters,
            records,
            dropped_rows,
        })
    }

    /// Parameter column by case-insensitive name.
    pub fn parameter(&self, name: &str) -> Option<&Column> {
        let key = normalize_header(name);
        self.parameters.iter().find(|c| c.key == key)
    }
}
