//! Map and lookup pipelines run against an explicit session context.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::colormap::{LegendStop, LinearColormap};
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::markers::{Marker, MarkerOptions, build_markers};
use crate::ranges::ParameterRange;
use crate::session::SessionContext;
use crate::toxicity::LookupReport;
use crate::view::{MapStyle, MapViewState};

const LEGEND_STEPS: usize = 5;

/// Map controls sent with a render; absent fields keep the session's choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapRequest {
    pub parameter: Option<String>,
    pub min_value: Option<f64>,
    pub style: Option<MapStyle>,
    /// Drop a previously set minimum filter
    #[serde(default)]
    pub clear_min_value: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSummary {
    pub key: String,
    pub name: String,
    pub range: ParameterRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub caption: String,
    pub stops: Vec<LegendStop>,
}

/// Everything the map view needs for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPayload {
    pub parameter: ParameterSummary,
    pub min_value: Option<f64>,
    pub style: MapStyle,
    pub tile_url: String,
    pub attribution: String,
    pub view: MapViewState,
    pub legend: Option<Legend>,
    pub markers: Vec<Marker>,
    pub dropped_rows: usize,
}

/// Parameters of the concentration table with their ranges, in column order.
pub fn parameters(ctx: &mut SessionContext, config: &DashboardConfig) -> Result<Vec<ParameterSummary>> {
    let table = ctx.tables.concentration(config)?;
    let ranges = ctx.tables.ranges(config)?;
    Ok(table
        .parameters
        .iter()
        .map(|column| ParameterSummary {
            key: column.key.clone(),
            name: column.name.clone(),
            range: ranges.get(&column.key).copied().unwrap_or_default(),
        })
        .collect())
}

/// Load (or reuse) the table, apply the request to the session, and build the
/// marker layer for the selected parameter.
pub fn render_map(
    ctx: &mut SessionContext,
    config: &DashboardConfig,
    request: &MapRequest,
) -> Result<MapPayload> {
    let table = ctx.tables.concentration(config)?;
    let ranges = ctx.tables.ranges(config)?;

    let requested = request
        .parameter
        .clone()
        .or_else(|| ctx.selected_parameter.clone());
    let column = match requested {
        Some(name) => table
            .parameter(&name)
            .ok_or_else(|| DashboardError::MissingColumns(vec![name.clone()]))?,
        None => table
            .parameters
            .first()
            .ok_or_else(|| DashboardError::MissingColumns(config.concentration.parameters.clone()))?,
    };
    ctx.selected_parameter = Some(column.name.clone());
    if let Some(style) = request.style {
        ctx.style = style;
    }
    if request.clear_min_value {
        ctx.min_value = None;
    } else if request.min_value.is_some() {
        ctx.min_value = request.min_value;
    }

    let range = ranges.get(&column.key).copied().unwrap_or_default();
    let options = MarkerOptions {
        min_value: ctx.min_value,
        radius: config.map.marker_radius,
        fill_opacity: config.map.fill_opacity,
        popup_fields: config
            .concentration
            .popup_fields
            .clone()
            .unwrap_or_else(|| table.parameters.iter().map(|c| c.key.clone()).collect()),
    };
    let markers = build_markers(&table, &column.key, &range, &options)?;
    let legend = LinearColormap::for_range(&range, &column.name).map(|cm| Legend {
        stops: cm.legend(LEGEND_STEPS),
        caption: cm.caption,
    });

    debug!(
        "rendered {} markers for {} (style {:?}, min {:?})",
        markers.len(),
        column.name,
        ctx.style,
        ctx.min_value
    );

    Ok(MapPayload {
        parameter: ParameterSummary {
            key: column.key.clone(),
            name: column.name.clone(),
            range,
        },
        min_value: ctx.min_value,
        style: ctx.style,
        tile_url: ctx.style.tile_template(&config.map).to_string(),
        attribution: config.map.attribution.clone(),
        view: ctx.view,
        legend,
        markers,
        dropped_rows: table.dropped_rows,
    })
}

/// Exact-match lookup against the session's toxicity table.
pub fn lookup(ctx: &mut SessionContext, config: &DashboardConfig, query: &str) -> Result<LookupReport> {
    if query.trim().is_empty() {
        return Err(DashboardError::InvalidQuery);
    }
    let table = ctx.tables.toxicity(config)?;
    table.lookup(query)
}
