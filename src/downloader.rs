use std::path::PathBuf;

use log::warn;
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::markers::Marker;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A source spreadsheet re-exposed as a download
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadArtifact {
    /// Route segment, `concentration` or `toxicity`
    pub id: &'static str,
    pub label: &'static str,
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub available: bool,
}

impl DownloadArtifact {
    fn probe(id: &'static str, label: &'static str, path: PathBuf) -> Self {
        let available = path.is_file();
        if !available {
            warn!("download artifact {} missing at {}", id, path.display());
        }
        DownloadArtifact {
            id,
            label,
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path,
            available,
        }
    }

    /// Raw file contents.
    pub fn read(&self) -> Result<Vec<u8>> {
        if !self.path.is_file() {
            return Err(DashboardError::FileNotFound(self.path.clone()));
        }
        std::fs::read(&self.path).map_err(|e| DashboardError::ReadError(e.to_string()))
    }

    /// `Content-Disposition` value with an RFC 5987 encoded UTF-8 file name.
    #[cfg(feature = "web")]
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename*=UTF-8''{}",
            urlencoding::encode(&self.file_name)
        )
    }
}

/// Both source files with their current availability.
pub fn artifacts(config: &DashboardConfig) -> Vec<DownloadArtifact> {
    vec![
        DownloadArtifact::probe("concentration", "下载浓度点位数据", config.concentration_path()),
        DownloadArtifact::probe("toxicity", "下载毒性数据", config.toxicity_path()),
    ]
}

pub fn artifact(config: &DashboardConfig, id: &str) -> Option<DownloadArtifact> {
    artifacts(config).into_iter().find(|a| a.id == id)
}

const EXPORT_HEADER: [&str; 6] = ["站位", "采样时间", "纬度", "经度", "数值", "颜色"];

/// Convert rendered markers to CSV
///
/// One row per marker with station, time, position, the selected value (empty
/// when absent) and the fill color.
pub fn to_csv(parameter: &str, markers: &[Marker]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = EXPORT_HEADER.map(String::from);
    header[4] = parameter.to_string();
    writer.write_record(&header)?;

    for marker in markers {
        let (station, sampled_at) = popup_identity(marker);
        writer.write_record([
            station,
            sampled_at,
            format!("{:.4}", marker.latitude),
            format!("{:.4}", marker.longitude),
            marker.value.map(|v| v.to_string()).unwrap_or_default(),
            marker.fill_color.clone(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DashboardError::ReadError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DashboardError::ReadError(e.to_string()))
}

/// Convert rendered markers to XLSX, same layout as [`to_csv`].
pub fn to_xlsx(parameter: &str, markers: &[Marker]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let xlsx_err = |e: rust_xlsxwriter::XlsxError| DashboardError::ReadError(e.to_string());

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (col, title) in EXPORT_HEADER.iter().enumerate() {
        let title = if col == 4 { parameter } else { *title };
        worksheet.write_string(0, col as u16, title).map_err(xlsx_err)?;
    }

    for (i, marker) in markers.iter().enumerate() {
        let row = (i + 1) as u32;
        let (station, sampled_at) = popup_identity(marker);
        worksheet.write_string(row, 0, &station).map_err(xlsx_err)?;
        worksheet.write_string(row, 1, &sampled_at).map_err(xlsx_err)?;
        worksheet.write_number(row, 2, marker.latitude).map_err(xlsx_err)?;
        worksheet.write_number(row, 3, marker.longitude).map_err(xlsx_err)?;
        if let Some(value) = marker.value {
            worksheet.write_number(row, 4, value).map_err(xlsx_err)?;
        }
        worksheet.write_string(row, 5, &marker.fill_color).map_err(xlsx_err)?;
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer().map_err(xlsx_err)
}

// Station and time are the first two popup lines.
fn popup_identity(marker: &Marker) -> (String, String) {
    let line = |i: usize| {
        marker
            .popup
            .get(i)
            .map(|l| l.value.clone())
            .unwrap_or_default()
    };
    (line(0), line(1))
}
