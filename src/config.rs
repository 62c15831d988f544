use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime configuration for the dashboard
///
/// Every section falls back to its defaults, so a config file only needs the
/// keys it wants to change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Page title shown on every view
    pub title: String,

    /// Socket address the server binds to
    pub bind: String,

    /// Directory both source spreadsheets are resolved against
    pub data_dir: PathBuf,

    /// Idle time after which a session is torn down
    pub session_ttl_secs: u64,

    pub concentration: ConcentrationSource,
    pub toxicity: ToxicitySource,
    pub map: MapSettings,
}

/// Where the monitoring data lives and which columns it must carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConcentrationSource {
    pub file: PathBuf,
    /// Sheet to read; the first sheet when absent
    pub sheet: Option<String>,
    pub station: String,
    pub sampled_at: String,
    pub longitude: String,
    pub latitude: String,
    /// Numeric parameter columns. Empty means every non-base column.
    pub parameters: Vec<String>,
    /// Extra fields listed in marker popups. All parameters when absent.
    pub popup_fields: Option<Vec<String>>,
}

/// Where the toxicity lookup table lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToxicitySource {
    pub file: PathBuf,
    pub sheet: Option<String>,
    /// The first data row holds the real header
    pub promote_first_row: bool,
    pub cas_column: String,
    pub test_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MapSettings {
    /// (latitude, longitude)
    pub default_center: (f64, f64),
    pub default_zoom: i32,
    pub standard_tiles: String,
    pub satellite_tiles: String,
    pub attribution: String,
    pub marker_radius: f64,
    pub fill_opacity: f64,
    /// Values below this are not rendered
    pub min_value: Option<f64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: "大连近岸海域抗生素及水环境激素风险管控平台".to_string(),
            bind: "127.0.0.1:3000".to_string(),
            data_dir: PathBuf::from("."),
            session_ttl_secs: 24 * 60 * 60,
            concentration: ConcentrationSource::default(),
            toxicity: ToxicitySource::default(),
            map: MapSettings::default(),
        }
    }
}

impl Default for ConcentrationSource {
    fn default() -> Self {
        Self {
            file: PathBuf::from("浓度点位数据.xlsx"),
            sheet: None,
            station: "站位".to_string(),
            sampled_at: "采样时间".to_string(),
            longitude: "经度".to_string(),
            latitude: "纬度".to_string(),
            parameters: vec![
                "水温℃".to_string(),
                "盐度".to_string(),
                "pH".to_string(),
                "溶解氧mg/L".to_string(),
            ],
            popup_fields: None,
        }
    }
}

impl ConcentrationSource {
    /// Base columns every concentration sheet must have.
    pub fn base_columns(&self) -> Vec<String> {
        vec![
            self.station.clone(),
            self.sampled_at.clone(),
            self.longitude.clone(),
            self.latitude.clone(),
        ]
    }
}

impl Default for ToxicitySource {
    fn default() -> Self {
        Self {
            file: PathBuf::from("毒性数据.xlsx"),
            sheet: Some("MM-GCN预测毒性数据集".to_string()),
            promote_first_row: true,
            cas_column: "CAS".to_string(),
            test_fields: vec![
                "AD 检验".to_string(),
                "KS 检验".to_string(),
                "JB 检验".to_string(),
            ],
        }
    }
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            default_center: (39.618, 122.228),
            default_zoom: 8,
            standard_tiles: "https://webrd01.is.autonavi.com/appmaptile?lang=zh_cn&size=1&scale=1&style=8&x={x}&y={y}&z={z}".to_string(),
            satellite_tiles: "https://webst01.is.autonavi.com/appmaptile?style=6&x={x}&y={y}&z={z}".to_string(),
            attribution: "高德地图".to_string(),
            marker_radius: 8.0,
            fill_opacity: 0.7,
            min_value: None,
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config file, filling unspecified keys with defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn concentration_path(&self) -> PathBuf {
        self.data_dir.join(&self.concentration.file)
    }

    pub fn toxicity_path(&self) -> PathBuf {
        self.data_dir.join(&self.toxicity.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bind": "0.0.0.0:8080", "map": {{"default_zoom": 10}}}}"#
        )
        .unwrap();

        let config = DashboardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.map.default_zoom, 10);
        assert_eq!(config.map.default_center, (39.618, 122.228));
        assert_eq!(config.concentration.latitude, "纬度");
        assert_eq!(config.toxicity.test_fields.len(), 3);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(DashboardConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn paths_resolve_against_data_dir() {
        let config = DashboardConfig {
            data_dir: PathBuf::from("/srv/data"),
            ..DashboardConfig::default()
        };
        assert_eq!(
            config.concentration_path(),
            PathBuf::from("/srv/data/浓度点位数据.xlsx")
        );
    }
}
