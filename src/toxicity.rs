//! Predicted toxicity lookup table keyed by CAS registry number.

use std::path::Path;

use log::info;
use serde::Serialize;

use crate::config::ToxicitySource;
use crate::error::{DashboardError, Result};
use crate::loader;
use crate::markers::NO_DATA_LABEL;
use crate::table::{Column, Table};

/// One chemical's row. `values` is aligned with the table's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ToxicityRecord {
    /// As-loaded identifier text, `None` when the cell is empty
    pub cas: Option<String>,
    pub values: Vec<Option<String>>,
}

/// Outcome of a statistical test field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Positive,
    Negative,
    Missing,
}

impl TestOutcome {
    /// `"true"` in any case is positive; any other text is negative.
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            None => TestOutcome::Missing,
            Some(v) if v.eq_ignore_ascii_case("true") => TestOutcome::Positive,
            Some(_) => TestOutcome::Negative,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            TestOutcome::Positive => "#28a745",
            TestOutcome::Negative => "#dc3545",
            TestOutcome::Missing => "#6c757d",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            TestOutcome::Positive => "✅",
            TestOutcome::Negative => "❌",
            TestOutcome::Missing => "➖",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestIndicator {
    pub name: String,
    pub value: String,
    pub outcome: TestOutcome,
    pub color: &'static str,
    pub icon: &'static str,
}

/// Everything the lookup view shows for one matched record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupReport {
    pub cas: String,
    pub fields: Vec<FieldEntry>,
    pub tests: Vec<TestIndicator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToxicityTable {
    pub columns: Vec<Column>,
    pub records: Vec<ToxicityRecord>,
    cas_idx: usize,
    test_idx: Vec<usize>,
}

impl ToxicityTable {
    /// Read the lookup sheet, promoting the first data row to the header when
    /// configured.
    pub fn load(path: impl AsRef<Path>, source: &ToxicitySource) -> Result<Self> {
        let path = path.as_ref();
        let rows = loader::read_sheet(path, source.sheet.as_deref())?;
        let header_row = if source.promote_first_row { 1 } else { 0 };
        let table = Table::from_rows(rows, header_row)?;
        let loaded = Self::from_table(&table, source)?;

        info!(
            "loaded {} toxicity records from {}",
            loaded.records.len(),
            path.display()
        );
        Ok(loaded)
    }

    pub fn from_table(table: &Table, source: &ToxicitySource) -> Result<Self> {
        let mut required = vec![source.cas_column.clone()];
        required.extend(source.test_fields.iter().cloned());
        let indices = table.require(&required)?;

        let records = (0..table.rows.len())
            .map(|row| {
                let values: Vec<Option<String>> = (0..table.columns.len())
                    .map(|col| table.cell(row, col).to_text())
                    .collect();
                ToxicityRecord {
                    cas: values[indices[0]].clone(),
                    values,
                }
            })
            .collect();

        Ok(ToxicityTable {
            columns: table.columns.clone(),
            records,
            cas_idx: indices[0],
            test_idx: indices[1..].to_vec(),
        })
    }

    /// Exact-match lookup
    ///
    /// The query is compared literally (no trimming, no case folding) against
    /// each identifier. The first match in source order wins.
    ///
    /// # Errors
    /// * `InvalidQuery` for an empty or blank query
    /// * `NotFound` when no identifier matches
    pub fn find(&self, query: &str) -> Result<&ToxicityRecord> {
        if query.trim().is_empty() {
            return Err(DashboardError::InvalidQuery);
        }
        self.records
            .iter()
            .find(|record| record.cas.as_deref() == Some(query))
            .ok_or_else(|| DashboardError::NotFound(query.to_string()))
    }

    /// Distinct identifiers in source order.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.records
            .iter()
            .filter_map(|record| record.cas.as_deref())
            .filter(|cas| seen.insert(*cas))
            .collect()
    }

    pub fn report(&self, record: &ToxicityRecord) -> LookupReport {
        let display = |idx: usize| {
            record.values[idx]
                .clone()
                .unwrap_or_else(|| NO_DATA_LABEL.to_string())
        };

        let fields = (0..self.columns.len())
            .filter(|idx| !self.test_idx.contains(idx))
            .map(|idx| FieldEntry {
                name: self.columns[idx].name.clone(),
                value: display(idx),
            })
            .collect();

        let tests = self
            .test_idx
            .iter()
            .map(|&idx| {
                let outcome = TestOutcome::from_value(record.values[idx].as_deref());
                TestIndicator {
                    name: self.columns[idx].name.clone(),
                    value: display(idx),
                    outcome,
                    color: outcome.color(),
                    icon: outcome.icon(),
                }
            })
            .collect();

        LookupReport {
            cas: record.values[self.cas_idx].clone().unwrap_or_default(),
            fields,
            tests,
        }
    }

    /// `find` followed by `report`.
    pub fn lookup(&self, query: &str) -> Result<LookupReport> {
        self.find(query).map(|record| self.report(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn table() -> ToxicityTable {
        let rows = vec![
            vec![text("Unnamed: 0"), text("Unnamed: 1"), text("Unnamed: 2"), text("Unnamed: 3"), text("Unnamed: 4")],
            vec![text("CAS"), text("名称"), text("AD 检验"), text("KS 检验"), text("JB 检验")],
            vec![text("1912-24-9"), text("莠去津"), text("TRUE"), CellValue::Bool(false), CellValue::Empty],
            vec![text("50-00-0"), CellValue::Empty, text("True"), text("TRUE"), text("TRUE")],
            vec![text("1912-24-9"), text("duplicate"), text("FALSE"), text("FALSE"), text("FALSE")],
            vec![CellValue::Number(7732.0), text("numeric id"), text("x"), text("x"), text("x")],
        ];
        let table = Table::from_rows(rows, 1).unwrap();
        ToxicityTable::from_table(&table, &ToxicitySource::default()).unwrap()
    }

    #[test]
    fn blank_query_is_invalid_not_missing() {
        let t = table();
        assert_eq!(t.find(""), Err(DashboardError::InvalidQuery));
        assert_eq!(t.find("   "), Err(DashboardError::InvalidQuery));
    }

    #[test]
    fn unknown_identifier_is_not_found() {
        assert_eq!(
            table().find("0000-00-0"),
            Err(DashboardError::NotFound("0000-00-0".into()))
        );
    }

    #[test]
    fn comparison_is_literal() {
        let t = table();
        assert!(t.find(" 1912-24-9").is_err());
        assert!(t.find("1912-24-9 ").is_err());
        assert_eq!(t.find("7732").unwrap().values[1].as_deref(), Some("numeric id"));
    }

    #[test]
    fn first_duplicate_wins() {
        let t = table();
        let record = t.find("1912-24-9").unwrap();
        assert_eq!(record.values[1].as_deref(), Some("莠去津"));
    }

    #[test]
    fn report_splits_fields_and_tri_state_tests() {
        let t = table();
        let report = t.lookup("1912-24-9").unwrap();

        assert_eq!(report.cas, "1912-24-9");
        let names: Vec<&str> = report.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["CAS", "名称"]);

        let outcomes: Vec<TestOutcome> = report.tests.iter().map(|t| t.outcome).collect();
        assert_eq!(
            outcomes,
            vec![TestOutcome::Positive, TestOutcome::Negative, TestOutcome::Missing]
        );
        assert_eq!(report.tests[0].icon, "✅");
        assert_eq!(report.tests[2].value, NO_DATA_LABEL);
    }

    #[test]
    fn missing_field_values_show_placeholder() {
        let report = table().lookup("50-00-0").unwrap();
        assert_eq!(report.fields[1].value, NO_DATA_LABEL);
        assert!(report.tests.iter().all(|t| t.outcome == TestOutcome::Positive));
    }

    #[test]
    fn identifiers_are_distinct_in_source_order() {
        assert_eq!(table().identifiers(), vec!["1912-24-9", "50-00-0", "7732"]);
    }

    #[test]
    fn missing_cas_column_is_reported() {
        let rows = vec![
            vec![text("名称"), text("AD 检验"), text("KS 检验"), text("JB 检验")],
        ];
        let table = Table::from_rows(rows, 0).unwrap();
        assert_eq!(
            ToxicityTable::from_table(&table, &ToxicitySource::default()),
            Err(DashboardError::MissingColumns(vec!["CAS".into()]))
        );
    }
}
