//! Tunable parameters for the framer, loadable from a JSON file.
//!
//! Every struct carries `#[serde(default)]` so a config file only needs to
//! mention what it changes.

use crate::error::{Error, Result};
use crate::types::ColorMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Geometry of the capture window and the feel of pan/zoom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Fraction of the container's short side kept clear around the inner box.
    pub padding: f64,
    pub grid_width: u32,
    pub grid_height: u32,
    /// Corner radius of the inner box outline, in grid cells.
    pub pixel_border_radius: f64,
    pub min_scale_ratio: f64,
    pub max_scale_ratio: f64,
    /// Pixels within which offset / scale lock to the centered / fill value.
    pub snap_threshold: f64,
    /// Wheel pixels per 100% zoom step.
    pub zoom_scale: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            padding: 0.15,
            grid_width: 130,
            grid_height: 75,
            pixel_border_radius: 0.5,
            min_scale_ratio: 0.5,
            max_scale_ratio: 3.0,
            snap_threshold: 2.0,
            zoom_scale: 150.0,
        }
    }
}

impl ViewportConfig {
    pub fn aspect_ratio(&self) -> f64 {
        self.grid_width as f64 / self.grid_height as f64
    }
}

/// Monotonic tone mapping applied after clamping.
pub type ToneTransform = Arc<dyn Fn(u8) -> u8 + Send + Sync>;

/// How RGBA samples become a single grayscale channel.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrayscaleOptions {
    pub invert: bool,
    pub clamp_min: u8,
    pub clamp_max: u8,
    /// Replace the observed minimum used for normalisation.
    pub normalise_min: Option<u8>,
    /// Replace the observed maximum used for normalisation.
    pub normalise_max: Option<u8>,
    pub binary: bool,
    pub threshold: u8,
    pub normalise: bool,
    /// Optional gamma curve, applied as a lookup table before `transform`.
    pub gamma: Option<f64>,
    #[serde(skip)]
    pub transform: Option<ToneTransform>,
}

impl Default for GrayscaleOptions {
    fn default() -> Self {
        Self {
            invert: false,
            clamp_min: 0,
            clamp_max: 255,
            normalise_min: None,
            normalise_max: None,
            binary: false,
            threshold: 128,
            normalise: true,
            gamma: None,
            transform: None,
        }
    }
}

impl GrayscaleOptions {
    /// Plain luminance: no normalisation, no inversion, no thresholding.
    pub fn plain() -> Self {
        Self { normalise: false, ..Self::default() }
    }

    pub fn with_transform(mut self, f: impl Fn(u8) -> u8 + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for GrayscaleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrayscaleOptions")
            .field("invert", &self.invert)
            .field("clamp_min", &self.clamp_min)
            .field("clamp_max", &self.clamp_max)
            .field("normalise_min", &self.normalise_min)
            .field("normalise_max", &self.normalise_max)
            .field("binary", &self.binary)
            .field("threshold", &self.threshold)
            .field("normalise", &self.normalise)
            .field("gamma", &self.gamma)
            .field("transform", &self.transform.as_ref().map(|_| "fn"))
            .finish()
    }
}

/// Look of the LED preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixStyle {
    /// Screen pixels per grid cell.
    pub cell_size: usize,
    /// Gap around each LED, percent of the cell (0..50).
    pub padding: f64,
    /// LED corner radius, percent of the cell (0..50).
    pub radius: f64,
    /// Tint for grayscale cells, degrees.
    pub hue: f64,
    /// Tint saturation, 0..1.
    pub saturation: f64,
}

impl Default for MatrixStyle {
    fn default() -> Self {
        Self { cell_size: 8, padding: 5.0, radius: 15.0, hue: 10.0, saturation: 1.0 }
    }
}

/// Everything the binary needs at start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub viewport: ViewportConfig,
    pub grayscale: GrayscaleOptions,
    pub matrix: MatrixStyle,
    pub mode: ColorMode,
    /// Pixels one wheel notch counts for (minifb reports notches, browsers pixels).
    pub wheel_line_pixels: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            grayscale: GrayscaleOptions::default(),
            matrix: MatrixStyle::default(),
            mode: ColorMode::default(),
            wheel_line_pixels: DEFAULT_WHEEL_LINE_PIXELS,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let mut cfg: AppConfig =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        if cfg.wheel_line_pixels <= 0.0 {
            cfg.wheel_line_pixels = DEFAULT_WHEEL_LINE_PIXELS;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let v = &self.viewport;
        if v.grid_width == 0 || v.grid_height == 0 {
            return Err(Error::Config(format!(
                "grid must be non-empty, got {}x{}",
                v.grid_width, v.grid_height
            )));
        }
        if !(0.0..0.5).contains(&v.padding) {
            return Err(Error::Config(format!("padding {} outside 0..0.5", v.padding)));
        }
        if v.min_scale_ratio <= 0.0 || v.max_scale_ratio < v.min_scale_ratio {
            return Err(Error::Config("scale ratios must satisfy 0 < min <= max".into()));
        }
        if v.zoom_scale <= 0.0 {
            return Err(Error::Config("zoom_scale must be positive".into()));
        }
        if self.grayscale.clamp_min > self.grayscale.clamp_max {
            return Err(Error::Config("clamp_min above clamp_max".into()));
        }
        Ok(())
    }
}

pub const DEFAULT_WHEEL_LINE_PIXELS: f64 = 100.0;

/// Parse `"WxH"` into a grid size.
pub fn parse_grid(text: &str) -> Result<(u32, u32)> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| Error::Config(format!("grid '{text}' is not WxH")))?;
    let w: u32 = w.trim().parse().map_err(|_| Error::Config(format!("bad grid width '{w}'")))?;
    let h: u32 = h.trim().parse().map_err(|_| Error::Config(format!("bad grid height '{h}'")))?;
    if w == 0 || h == 0 {
        return Err(Error::Config(format!("grid '{text}' must be non-empty")));
    }
    Ok((w, h))
}
