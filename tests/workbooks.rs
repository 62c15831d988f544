//! Loads real workbooks written with rust_xlsxwriter and runs them through the
//! map and lookup pipelines.

use std::path::{Path, PathBuf};

use coastal_dashboard::DashboardError;
use coastal_dashboard::config::{ConcentrationSource, ToxicitySource};
use coastal_dashboard::markers::{MarkerOptions, build_markers};
use coastal_dashboard::monitoring::MonitoringTable;
use coastal_dashboard::ranges::{ParameterRange, compute_ranges};
use coastal_dashboard::toxicity::{TestOutcome, ToxicityTable};
use rust_xlsxwriter::Workbook;

fn temp_source() -> ConcentrationSource {
    ConcentrationSource {
        parameters: vec!["temp".to_string()],
        ..ConcentrationSource::default()
    }
}

/// Write a single-sheet workbook: a header row followed by (station, lat, lon, temp) rows.
fn write_concentration(
    path: &Path,
    headers: &[&str],
    rows: &[(&str, Option<f64>, f64, f64)],
) -> PathBuf {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, title) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title).unwrap();
    }
    for (i, (station, lat, lon, temp)) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, 0, *station).unwrap();
        worksheet.write_string(row, 1, "2023-05-01 09:30:00").unwrap();
        worksheet.write_number(row, 2, *lon).unwrap();
        if let Some(lat) = lat {
            worksheet.write_number(row, 3, *lat).unwrap();
        }
        worksheet.write_number(row, 4, *temp).unwrap();
    }
    workbook.save(path).unwrap();
    path.to_path_buf()
}

const HEADERS: [&str; 5] = ["站位", "采样时间", "经度", "纬度", " Temp\n"];

#[test]
fn end_colors_for_low_and_high_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_concentration(
        &dir.path().join("conc.xlsx"),
        &HEADERS,
        &[("S1", Some(40.0), 120.0, 10.0), ("S2", Some(40.1), 120.1, 20.0)],
    );

    let table = MonitoringTable::load(&path, &temp_source()).unwrap();
    let ranges = compute_ranges(&table, &["temp".to_string()]);
    assert_eq!(ranges["temp"], ParameterRange { min: Some(10.0), max: Some(20.0) });

    let markers = build_markers(&table, "temp", &ranges["temp"], &MarkerOptions::default()).unwrap();
    assert_eq!(markers[0].fill_color, "#0000ff");
    assert_eq!(markers[1].fill_color, "#ff0000");
    assert_eq!(markers[0].popup[0].value, "S1");
    println!("✓ low/high rows take the blue/red anchors");
}

#[test]
fn missing_latitude_column_exposes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conc.xlsx");
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, title) in ["站位", "采样时间", "经度", "temp"].iter().enumerate() {
        worksheet.write_string(0, col as u16, *title).unwrap();
    }
    worksheet.write_string(1, 0, "S1").unwrap();
    workbook.save(&path).unwrap();

    assert_eq!(
        MonitoringTable::load(&path, &temp_source()),
        Err(DashboardError::MissingColumns(vec!["纬度".to_string()]))
    );
}

#[test]
fn constant_parameter_renders_one_color() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_concentration(
        &dir.path().join("conc.xlsx"),
        &HEADERS,
        &[
            ("S1", Some(40.0), 120.0, 15.0),
            ("S2", Some(40.1), 120.1, 15.0),
            ("S3", Some(40.2), 120.2, 15.0),
        ],
    );

    let table = MonitoringTable::load(&path, &temp_source()).unwrap();
    let range = compute_ranges(&table, &["temp".to_string()])["temp"];
    assert_eq!(range, ParameterRange { min: Some(15.0), max: Some(15.0) });

    let markers = build_markers(&table, "temp", &range, &MarkerOptions::default()).unwrap();
    assert_eq!(markers.len(), 3);
    assert!(markers.iter().all(|m| m.fill_color == markers[0].fill_color));
}

#[test]
fn rows_without_latitude_are_counted() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_concentration(
        &dir.path().join("conc.xlsx"),
        &HEADERS,
        &[("S1", Some(40.0), 120.0, 10.0), ("S2", None, 120.1, 20.0)],
    );

    let table = MonitoringTable::load(&path, &temp_source()).unwrap();
    assert_eq!(table.records.len(), 1);
    assert_eq!(table.dropped_rows, 1);
}

#[test]
fn reloading_yields_identical_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_concentration(
        &dir.path().join("conc.xlsx"),
        &HEADERS,
        &[("S1", Some(40.0), 120.0, 7.5), ("S2", Some(40.1), 120.1, 3.25)],
    );
    let names = ["temp".to_string()];

    let first = compute_ranges(&MonitoringTable::load(&path, &temp_source()).unwrap(), &names);
    let second = compute_ranges(&MonitoringTable::load(&path, &temp_source()).unwrap(), &names);
    assert_eq!(first, second);
}

fn write_toxicity(path: &Path, sheet_name: &str) {
    let mut workbook = Workbook::new();

    let notes = workbook.add_worksheet();
    notes.set_name("说明").unwrap();
    notes.write_string(0, 0, "not the data sheet").unwrap();

    let data = workbook.add_worksheet();
    data.set_name(sheet_name).unwrap();
    let rows: [[&str; 5]; 4] = [
        ["MM-GCN预测毒性数据集", "", "", "", ""],
        ["CAS", "名称", "AD 检验", "KS 检验", "JB 检验"],
        ["1912-24-9", "莠去津", "TRUE", "FALSE", ""],
        ["50-00-0", "甲醛", "false", "TRUE", "TRUE"],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                data.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
    }
    workbook.save(path).unwrap();
}

#[test]
fn lookup_reads_the_named_sheet_with_promoted_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("毒性数据.xlsx");
    write_toxicity(&path, "MM-GCN预测毒性数据集");

    let table = ToxicityTable::load(&path, &ToxicitySource::default()).unwrap();
    assert_eq!(table.records.len(), 2);

    let report = table.lookup("1912-24-9").unwrap();
    assert_eq!(report.tests[0].name, "AD 检验");
    assert_eq!(report.tests[0].outcome, TestOutcome::Positive);
    assert_eq!(report.tests[1].outcome, TestOutcome::Negative);
    assert_eq!(report.tests[2].outcome, TestOutcome::Missing);

    assert_eq!(
        table.lookup("0000-00-0"),
        Err(DashboardError::NotFound("0000-00-0".to_string()))
    );
    assert_eq!(table.lookup(""), Err(DashboardError::InvalidQuery));
}

#[test]
fn absent_sheet_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("毒性数据.xlsx");
    write_toxicity(&path, "Sheet2");

    assert!(matches!(
        ToxicityTable::load(&path, &ToxicitySource::default()),
        Err(DashboardError::ReadError(_))
    ));
}
