//! Continuous color scale over a fixed sequence of anchor colors.

use serde::Serialize;

use crate::ranges::ParameterRange;

/// An 8-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

pub const BLUE: Rgb = Rgb(0x00, 0x00, 0xff);
pub const GREEN: Rgb = Rgb(0x00, 0x80, 0x00);
pub const YELLOW: Rgb = Rgb(0xff, 0xff, 0x00);
pub const ORANGE: Rgb = Rgb(0xff, 0xa5, 0x00);
pub const RED: Rgb = Rgb(0xff, 0x00, 0x00);
/// Fill for markers without a usable value
pub const NO_DATA: Rgb = Rgb(0x80, 0x80, 0x80);

pub const DEFAULT_ANCHORS: [Rgb; 5] = [BLUE, GREEN, YELLOW, ORANGE, RED];

/// One legend entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendStop {
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearColormap {
    anchors: Vec<Rgb>,
    vmin: f64,
    vmax: f64,
    pub caption: String,
}

impl LinearColormap {
    /// `vmax` must exceed `vmin`; `anchors` must not be empty.
    pub fn new(anchors: Vec<Rgb>, vmin: f64, vmax: f64) -> Self {
        LinearColormap {
            anchors,
            vmin,
            vmax,
            caption: String::new(),
        }
    }

    /// Blue-to-red scale over the range, `None` when the range is empty.
    pub fn for_range(range: &ParameterRange, caption: &str) -> Option<Self> {
        let (vmin, vmax) = range.scale_bounds()?;
        let mut colormap = Self::new(DEFAULT_ANCHORS.to_vec(), vmin, vmax);
        colormap.caption = caption.to_string();
        Some(colormap)
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.vmin, self.vmax)
    }

    /// Normalized position of `value`, clamped to [0, 1].
    pub fn position(&self, value: f64) -> f64 {
        let span = self.vmax - self.vmin;
        if span <= 0.0 || !value.is_finite() {
            return 0.0;
        }
        ((value - self.vmin) / span).clamp(0.0, 1.0)
    }

    pub fn color(&self, value: f64) -> Rgb {
        let last = self.anchors.len().saturating_sub(1);
        if last == 0 {
            return self.anchors.first().copied().unwrap_or(NO_DATA);
        }

        let scaled = self.position(value) * last as f64;
        let lower = (scaled.floor() as usize).min(last);
        if lower == last {
            return self.anchors[last];
        }
        self.anchors[lower].lerp(self.anchors[lower + 1], scaled - lower as f64)
    }

    /// Evenly spaced stops from vmin to vmax; `steps` is at least 2.
    pub fn legend(&self, steps: usize) -> Vec<LegendStop> {
        let steps = steps.max(2);
        (0..steps)
            .map(|i| {
                let value = self.vmin + (self.vmax - self.vmin) * i as f64 / (steps - 1) as f64;
                LegendStop {
                    value,
                    color: self.color(value).hex(),
                }
            })
            .collect()
    }
}
