//! Sampling engine: framed source → fixed-size pixel buffer.
//!
//! Two cascaded passes. Pass 1 draws the source into an RGBA raster the size
//! of the inner box, exactly as the user framed it (pixels the source does
//! not cover stay transparent). Pass 2 resamples that crop down to the grid
//! resolution. The result is then flattened to RGB or grayscale.

use crate::config::GrayscaleOptions;
use crate::error::{Error, Result};
use crate::gamma::ToneLut;
use crate::geometry::Vector2;
use crate::types::{ColorMode, PixelBuffer};
use crate::viewport::ViewportState;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Resampling filter for pass 2. Triangle is bilinear and fully deterministic.
const GRID_FILTER: FilterType = FilterType::Triangle;

pub struct Sampler {
    grid_width: u32,
    grid_height: u32,
    mode: ColorMode,
    grayscale: GrayscaleOptions,
    tone: Option<ToneLut>,
    // Reused between ticks while the inner box keeps its size.
    crop: RgbaImage,
}

impl Sampler {
    pub fn new(grid_width: u32, grid_height: u32, mode: ColorMode, grayscale: GrayscaleOptions) -> Self {
        let tone = grayscale.gamma.map(ToneLut::gamma);
        Self {
            grid_width: grid_width.max(1),
            grid_height: grid_height.max(1),
            mode,
            grayscale,
            tone,
            crop: RgbaImage::new(1, 1),
        }
    }

    pub fn set_grid_resolution(&mut self, width: u32, height: u32) {
        self.grid_width = width.max(1);
        self.grid_height = height.max(1);
    }

    pub fn grid_resolution(&self) -> (u32, u32) {
        (self.grid_width, self.grid_height)
    }

    pub fn set_mode(&mut self, mode: ColorMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    pub fn set_grayscale_options(&mut self, options: GrayscaleOptions) {
        self.tone = options.gamma.map(ToneLut::gamma);
        self.grayscale = options;
    }

    pub fn grayscale_options(&self) -> &GrayscaleOptions {
        &self.grayscale
    }

    /// Sample one frame. `state` is `None` until the viewport is fitted.
    pub fn sample(&mut self, state: Option<&ViewportState>, frame: &RgbaImage) -> Result<PixelBuffer> {
        let state = state.ok_or(Error::SourceNotReady)?;
        if frame.width() == 0 || frame.height() == 0 {
            return Err(Error::SourceNotReady);
        }

        let raster = self.rasterize(state, frame)?;
        Ok(match self.mode {
            ColorMode::Rgb => to_rgb(&raster),
            ColorMode::Grayscale => to_grayscale(&raster, &self.grayscale, self.tone.as_ref()),
        })
    }

    /// Pass 1 + pass 2: the framed crop at grid resolution, still RGBA.
    pub fn rasterize(&mut self, state: &ViewportState, frame: &RgbaImage) -> Result<RgbaImage> {
        if !(state.scale > 0.0) || !state.scale.is_finite() {
            return Err(Error::SourceFrame(format!("unusable scale {}", state.scale)));
        }

        // Canvas sizes truncate like a drawing surface would.
        let cw = (state.inner_size.x.floor() as u32).max(1);
        let ch = (state.inner_size.y.floor() as u32).max(1);
        if self.crop.dimensions() != (cw, ch) {
            self.crop = RgbaImage::new(cw, ch);
        }

        draw_scaled(&mut self.crop, frame, state.inner_offset(), state.scale);
        Ok(resize_premultiplied(&mut self.crop, self.grid_width, self.grid_height))
    }
}

/// Resample with colour weighted by alpha, so a cell half covered by red
/// comes out red at half alpha rather than dark red. `src` is left
/// premultiplied.
pub fn resize_premultiplied(src: &mut RgbaImage, width: u32, height: u32) -> RgbaImage {
    for px in src.pixels_mut() {
        let a = px.0[3] as u32;
        if a < 255 {
            for c in &mut px.0[..3] {
                *c = ((*c as u32 * a + 127) / 255) as u8;
            }
        }
    }

    let mut out = imageops::resize(src, width, height, GRID_FILTER);
    for px in out.pixels_mut() {
        let a = px.0[3] as u32;
        if a > 0 && a < 255 {
            for c in &mut px.0[..3] {
                *c = ((*c as u32 * 255 + a / 2) / a).min(255) as u8;
            }
        }
    }
    out
}

/// Draw `src` into `dst` at `offset` with uniform `scale`, nearest sampling.
/// Destination pixels outside the scaled source become fully transparent.
fn draw_scaled(dst: &mut RgbaImage, src: &RgbaImage, offset: Vector2, scale: f64) {
    let (sw, sh) = (src.width() as f64, src.height() as f64);
    let blank = Rgba([0, 0, 0, 0]);

    for (x, y, px) in dst.enumerate_pixels_mut() {
        // Map the destination pixel centre back into source space.
        let sx = (x as f64 + 0.5 - offset.x) / scale;
        let sy = (y as f64 + 0.5 - offset.y) / scale;
        *px = if sx >= 0.0 && sy >= 0.0 && sx < sw && sy < sh {
            *src.get_pixel(sx as u32, sy as u32)
        } else {
            blank
        };
    }
}

/// Drop alpha; emit R, G, B per pixel in row-major order.
pub fn to_rgb(image: &RgbaImage) -> PixelBuffer {
    let mut data = Vec::with_capacity(image.width() as usize * image.height() as usize * 3);
    for px in image.pixels() {
        data.extend_from_slice(&px.0[..3]);
    }
    PixelBuffer { width: image.width(), height: image.height(), channels: 3, data }
}

/// Luminance with blank handling, inversion, normalisation, clamping,
/// tone curve, user transform and binarisation, in that order.
///
/// Transparent pixels are background: they take 0 (255 when inverted), are
/// not inverted, stay out of the min/max used to normalise and are not
/// normalised, but the later stages apply to them like any other cell.
pub fn to_grayscale(image: &RgbaImage, options: &GrayscaleOptions, tone: Option<&ToneLut>) -> PixelBuffer {
    let n = image.width() as usize * image.height() as usize;
    let mut gray = Vec::with_capacity(n);
    let mut blank = Vec::with_capacity(n);

    let mut min_gray = 255u8;
    let mut max_gray = 0u8;

    for px in image.pixels() {
        let [r, g, b, a] = px.0;
        if a == 0 {
            gray.push(if options.invert { 255 } else { 0 });
            blank.push(true);
            continue;
        }

        let l = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round() as u8;
        let l = if options.invert { 255 - l } else { l };
        min_gray = min_gray.min(l);
        max_gray = max_gray.max(l);
        gray.push(l);
        blank.push(false);
    }

    let lo = options.normalise_min.unwrap_or(min_gray) as f64;
    let hi = options.normalise_max.unwrap_or(max_gray) as f64;
    let normalise = options.normalise && hi > lo;

    for (v, &is_blank) in gray.iter_mut().zip(&blank) {
        let mut x = *v;

        if normalise && !is_blank {
            x = (((x as f64 - lo) / (hi - lo)) * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        x = x.clamp(options.clamp_min, options.clamp_max.max(options.clamp_min));

        if let Some(lut) = tone {
            x = lut.apply(x);
        }
        if let Some(f) = &options.transform {
            x = f(x);
        }
        if options.binary {
            x = if x >= options.threshold { 255 } else { 0 };
        }
        *v = x;
    }

    PixelBuffer { width: image.width(), height: image.height(), channels: 1, data: gray }
}
