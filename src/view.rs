use serde::{Deserialize, Serialize};

use crate::config::MapSettings;

/// Center and zoom of the map widget for one session
///
/// `render_key` changes on every reset so the page rebuilds its widget instead
/// of restoring the stale one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapViewState {
    /// (latitude, longitude)
    center: (f64, f64),
    zoom: i32,
    render_key: u64,
    #[serde(skip)]
    default_center: (f64, f64),
    #[serde(skip)]
    default_zoom: i32,
}

impl Default for MapViewState {
    fn default() -> Self {
        Self::new((39.618, 122.228), 8)
    }
}

impl MapViewState {
    pub fn new(default_center: (f64, f64), default_zoom: i32) -> Self {
        MapViewState {
            center: default_center,
            zoom: default_zoom,
            render_key: 0,
            default_center,
            default_zoom,
        }
    }

    pub fn from_settings(settings: &MapSettings) -> Self {
        Self::new(settings.default_center, settings.default_zoom)
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    pub fn zoom_level(&self) -> i32 {
        self.zoom
    }

    pub fn render_key(&self) -> u64 {
        self.render_key
    }

    /// Accepted as-is; the widget owns bounds.
    pub fn pan(&mut self, center: (f64, f64)) {
        self.center = center;
    }

    pub fn zoom(&mut self, level: i32) {
        self.zoom = level;
    }

    pub fn reset(&mut self) {
        self.center = self.default_center;
        self.zoom = self.default_zoom;
        self.render_key += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStyle {
    #[default]
    Standard,
    Satellite,
}

impl MapStyle {
    pub fn tile_template<'a>(&self, settings: &'a MapSettings) -> &'a str {
        match self {
            MapStyle::Standard => &settings.standard_tiles,
            MapStyle::Satellite => &settings.satellite_tiles,
        }
    }
}

/// Top-level view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Home,
    Map,
    Lookup,
}
