use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDateTime;
use log::{debug, info};

use crate::error::{DashboardError, Result};
use crate::table::CellValue;

/// Load the rows of one sheet from an Excel workbook
///
/// Reads `sheet` by name, or the first sheet when `sheet` is `None`. Every
/// row of the used range is returned, header included.
///
/// # Arguments
/// * `filepath` - Path to the workbook (xlsx, xlsm, xlsb, xls or ods)
/// * `sheet` - Optional sheet name
///
/// # Examples
/// ```no_run
/// use coastal_dashboard::loader::from_excel;
///
/// match from_excel("浓度点位数据.xlsx", None) {
///     Ok(rows) => println!("Loaded {} rows", rows.len()),
///     Err(e) => eprintln!("Error loading Excel: {}", e),
/// }
/// ```
pub fn from_excel(filepath: impl AsRef<Path>, sheet: Option<&str>) -> Result<Vec<Vec<CellValue>>> {
    let mut workbook = open_workbook_auto(filepath.as_ref())?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(DashboardError::ReadError(format!(
                    "worksheet '{}' not found",
                    name
                )));
            }
            name.to_string()
        }
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| DashboardError::ReadError("no sheets found in workbook".into()))?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    debug!(
        "sheet '{}' spans {} rows x {} columns",
        sheet_name,
        range.height(),
        range.width()
    );

    Ok(range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect())
}

/// Load the rows of a CSV file, header included.
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Vec<Vec<CellValue>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(filepath.as_ref())?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}

/// Detect file type and load the appropriate format
///
/// A missing file is reported as `FileNotFound` before any format is tried.
pub fn read_sheet(filepath: impl AsRef<Path>, sheet: Option<&str>) -> Result<Vec<Vec<CellValue>>> {
    let path = filepath.as_ref();
    if !path.exists() {
        return Err(DashboardError::FileNotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let rows = match extension.as_deref() {
        Some("csv") => from_csv(path)?,
        Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => {
            from_excel(path, sheet)?
        }
        Some(ext) => {
            return Err(DashboardError::ReadError(format!(
                "unsupported file extension: {}",
                ext
            )));
        }
        None => return Err(DashboardError::ReadError("file has no extension".into())),
    };

    info!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ods stores timestamps as ISO 8601 text; render them like Excel dates.
fn format_iso_timestamp(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::Text(datetime.format(TIMESTAMP_FORMAT).to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Text(format_iso_timestamp(s)),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}
