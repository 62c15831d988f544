use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::{DashboardError, Result};

lazy_static! {
    static ref LINE_BREAKS: Regex = Regex::new(r"[\r\n]+").unwrap();
}

static EMPTY: CellValue = CellValue::Empty;

/// A single cell as read from a spreadsheet
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric coercion. Text is parsed after trimming; anything that does not
    /// yield a finite number is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Empty | CellValue::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Text rendering, `None` for empty cells.
    ///
    /// Integral numbers print without a fractional part so identifiers stored
    /// as numbers compare as the sheet displays them.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        }
    }
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Strip embedded line breaks and the outer whitespace from a header.
pub fn display_header(raw: &str) -> String {
    LINE_BREAKS.replace_all(raw, "").trim().to_string()
}

/// Header key used for every column comparison.
pub fn normalize_header(raw: &str) -> String {
    display_header(raw).to_lowercase()
}

/// A column with its comparison key and the header text shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub key: String,
    pub name: String,
}

impl Column {
    pub fn from_header(raw: &str) -> Self {
        Column {
            key: normalize_header(raw),
            name: display_header(raw),
        }
    }
}

/// A header row plus data rows, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table from raw sheet rows, using `rows[header_row]` as the
    /// header. Rows above the header are discarded, as are fully empty rows.
    pub fn from_rows(mut rows: Vec<Vec<CellValue>>, header_row: usize) -> Result<Self> {
        if rows.len() <= header_row {
            return Err(DashboardError::ReadError(format!(
                "sheet has no header row (expected at row {})",
                header_row + 1
            )));
        }
        let data = rows.split_off(header_row + 1);
        let header = rows.pop().unwrap_or_default();

        let columns = header
            .iter()
            .map(|cell| Column::from_header(&cell.to_text().unwrap_or_default()))
            .collect();
        let rows = data
            .into_iter()
            .filter(|row| !row.iter().all(CellValue::is_empty))
            .collect();

        Ok(Table { columns, rows })
    }

    /// First column whose normalized header matches `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        let key = normalize_header(name);
        self.columns.iter().position(|c| c.key == key)
    }

    /// Resolve every name to a column index, or report all missing names in
    /// the spelling they were requested with.
    pub fn require(&self, names: &[String]) -> Result<Vec<usize>> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.index_of(name) {
                Some(idx) => found.push(idx),
                None => missing.push(name.clone()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(DashboardError::MissingColumns(missing))
        }
    }

    /// Cell at (row, col); short rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}
