use serde::Serialize;

use crate::colormap::{LinearColormap, NO_DATA};
use crate::error::{DashboardError, Result};
use crate::monitoring::{Measurement, MonitoringRecord, MonitoringTable};
use crate::ranges::ParameterRange;
use crate::table::format_number;

/// Label shown instead of a value when a cell has no usable number
pub const NO_DATA_LABEL: &str = "无数据";

const STATION_LABEL: &str = "站位";
const SAMPLED_AT_LABEL: &str = "采样时间";
const POSITION_LABEL: &str = "经纬度";

/// Rendering options for a marker layer
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    /// Rows whose value is below this are not rendered
    pub min_value: Option<f64>,
    pub radius: f64,
    pub fill_opacity: f64,
    /// Extra parameters listed in each popup after the selected one
    pub popup_fields: Vec<String>,
}

impl Default for MarkerOptions {
    fn default() -> Self {
        Self {
            min_value: None,
            radius: 8.0,
            fill_opacity: 0.7,
            popup_fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupLine {
    pub label: String,
    pub value: String,
}

/// A circle marker for one monitoring record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
    /// Selected parameter value, absent when the cell has no number
    pub value: Option<f64>,
    /// Value as displayed, or the no-data label
    pub label: String,
    pub popup: Vec<PopupLine>,
}

impl Marker {
    /// Popup lines joined as `label：value`, one per line.
    pub fn popup_text(&self) -> String {
        self.popup
            .iter()
            .map(|line| format!("{}：{}", line.label, line.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn measurement_label(measurement: &Measurement) -> String {
    match measurement {
        Measurement::Value(v) => format_number(*v),
        Measurement::Missing => NO_DATA_LABEL.to_string(),
        Measurement::Unparseable(raw) => format!("{} ({})", NO_DATA_LABEL, raw),
    }
}

/// Build one marker per record for `selected`
///
/// Records with a number are colored on a linear scale over `range`; records
/// without one are drawn gray and labelled as having no data. With
/// `min_value` set, records whose number is below it are left out.
///
/// # Errors
/// * `MissingColumns` if `selected` is not a parameter of the table
pub fn build_markers(
    table: &MonitoringTable,
    selected: &str,
    range: &ParameterRange,
    options: &MarkerOptions,
) -> Result<Vec<Marker>> {
    let column = table
        .parameter(selected)
        .ok_or_else(|| DashboardError::MissingColumns(vec![selected.to_string()]))?;
    let colormap = LinearColormap::for_range(range, &column.name);

    let extra: Vec<_> = options
        .popup_fields
        .iter()
        .filter_map(|name| table.parameter(name))
        .filter(|c| c.key != column.key)
        .collect();

    let markers = table
        .records
        .iter()
        .filter_map(|record| {
            let measurement = record.measurement(&column.key);
            let value = measurement.value();
            if let (Some(threshold), Some(v)) = (options.min_value, value) {
                if v < threshold {
                    return None;
                }
            }

            let fill = match (value, &colormap) {
                (Some(v), Some(cm)) => cm.color(v),
                _ => NO_DATA,
            };
            let label = measurement_label(measurement);

            let mut popup = base_popup(record);
            popup.push(PopupLine {
                label: column.name.clone(),
                value: label.clone(),
            });
            popup.extend(extra.iter().map(|c| PopupLine {
                label: c.name.clone(),
                value: measurement_label(record.measurement(&c.key)),
            }));

            Some(Marker {
                latitude: record.latitude,
                longitude: record.longitude,
                radius: options.radius,
                fill_color: fill.hex(),
                fill_opacity: options.fill_opacity,
                value,
                label,
                popup,
            })
        })
        .collect();

    Ok(markers)
}

fn base_popup(record: &MonitoringRecord) -> Vec<PopupLine> {
    vec![
        PopupLine {
            label: STATION_LABEL.to_string(),
            value: record.station.clone(),
        },
        PopupLine {
            label: SAMPLED_AT_LABEL.to_string(),
            value: record.sampled_at.clone(),
        },
        PopupLine {
            label: POSITION_LABEL.to_string(),
            value: format!("{:.4}, {:.4}", record.latitude, record.longitude),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranges::all_ranges;
    use crate::table::Column;
    use std::path::PathBuf;

    fn record(lat: f64, lon: f64, temp: Measurement) -> MonitoringRecord {
        MonitoringRecord {
            station: "S1".to_string(),
            sampled_at: "2023-05-01 09:30:00".to_string(),
            latitude: lat,
            longitude: lon,
            values: [
                ("temp".to_string(), temp),
                ("ph".to_string(), Measurement::Value(8.1)),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn table(records: Vec<MonitoringRecord>) -> MonitoringTable {
        MonitoringTable {
            source: PathBuf::new(),
            parameters: vec![Column::from_header("temp"), Column::from_header("pH")],
            records,
            dropped_rows: 0,
        }
    }

    #[test]
    fn low_and_high_rows_take_end_colors() {
        let t = table(vec![
            record(40.0, 120.0, Measurement::Value(10.0)),
            record(40.1, 120.1, Measurement::Value(20.0)),
        ]);
        let range = all_ranges(&t)["temp"];
        let markers = build_markers(&t, "temp", &range, &MarkerOptions::default()).unwrap();

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].fill_color, "#0000ff");
        assert_eq!(markers[1].fill_color, "#ff0000");
        assert_eq!(markers[0].radius, 8.0);
    }

    #[test]
    fn constant_values_share_one_color() {
        let t = table(vec![
            record(40.0, 120.0, Measurement::Value(15.0)),
            record(40.1, 120.1, Measurement::Value(15.0)),
            record(40.2, 120.2, Measurement::Value(15.0)),
        ]);
        let range = all_ranges(&t)["temp"];
        let markers = build_markers(&t, "temp", &range, &MarkerOptions::default()).unwrap();

        assert!(markers.iter().all(|m| m.fill_color == markers[0].fill_color));
    }

    #[test]
    fn rows_without_a_number_render_gray_with_label() {
        let t = table(vec![
            record(40.0, 120.0, Measurement::Value(10.0)),
            record(40.1, 120.1, Measurement::Missing),
            record(40.2, 120.2, Measurement::Unparseable("<LOD".into())),
        ]);
        let range = all_ranges(&t)["temp"];
        let markers = build_markers(&t, "temp", &range, &MarkerOptions::default()).unwrap();

        assert_eq!(markers.len(), 3);
        assert_eq!(markers[1].fill_color, "#808080");
        assert_eq!(markers[1].label, NO_DATA_LABEL);
        assert_eq!(markers[2].fill_color, "#808080");
        assert_eq!(markers[2].label, "无数据 (<LOD)");
        assert_eq!(markers[2].value, None);
    }

    #[test]
    fn threshold_filter_is_optional() {
        let t = table(vec![
            record(40.0, 120.0, Measurement::Value(10.0)),
            record(40.1, 120.1, Measurement::Value(20.0)),
            record(40.2, 120.2, Measurement::Missing),
        ]);
        let range = all_ranges(&t)["temp"];
        let options = MarkerOptions {
            min_value: Some(15.0),
            ..MarkerOptions::default()
        };
        let markers = build_markers(&t, "temp", &range, &options).unwrap();

        let values: Vec<Option<f64>> = markers.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![Some(20.0), None]);
    }

    #[test]
    fn popup_lists_station_time_position_and_fields() {
        let t = table(vec![record(39.61834, 122.22801, Measurement::Value(12.5))]);
        let range = all_ranges(&t)["temp"];
        let options = MarkerOptions {
            popup_fields: vec!["temp".into(), "pH".into(), "unknown".into()],
            ..MarkerOptions::default()
        };
        let markers = build_markers(&t, "TEMP", &range, &options).unwrap();

        assert_eq!(
            markers[0].popup_text(),
            "站位：S1\n采样时间：2023-05-01 09:30:00\n经纬度：39.6183, 122.2280\ntemp：12.5\npH：8.1"
        );
    }

    #[test]
    fn unknown_parameter_is_reported() {
        let t = table(Vec::new());
        let err = build_markers(&t, "盐度", &ParameterRange::default(), &MarkerOptions::default())
            .unwrap_err();
        assert_eq!(err, DashboardError::MissingColumns(vec!["盐度".into()]));
    }
}
