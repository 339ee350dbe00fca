//! The pixel grid: the LED-matrix side that receives sampled buffers.
//!
//! Cells are stored row-major. A grid is either all-mono or all-RGB after a
//! buffer is applied; single cells can still be set to either kind.

use crate::config::MatrixStyle;
use crate::draw::fill_rounded_rect;
use crate::error::{Error, Result};
use crate::types::{FrameBuffer, PixelBuffer, pack_rgb};

const DEFAULT_PADDING: f64 = 5.0;
const DEFAULT_RADIUS: f64 = 15.0;

/// One LED's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelValue {
    Mono(u8),
    Rgb([u8; 3]),
}

impl Default for PixelValue {
    fn default() -> Self {
        PixelValue::Mono(0)
    }
}

impl PixelValue {
    /// Numeric level, clamped into 0..=255. NaN is rejected.
    pub fn from_level(level: f64) -> Result<Self> {
        if level.is_nan() {
            return Err(Error::InvalidPixelValue("NaN level".into()));
        }
        Ok(PixelValue::Mono(level.clamp(0.0, 255.0).round() as u8))
    }

    pub fn from_bool(on: bool) -> Self {
        PixelValue::Mono(if on { 255 } else { 0 })
    }

    /// One channel → mono, three → RGB, anything else is rejected.
    pub fn from_channels(channels: &[u8]) -> Result<Self> {
        match *channels {
            [v] => Ok(PixelValue::Mono(v)),
            [r, g, b] => Ok(PixelValue::Rgb([r, g, b])),
            _ => Err(Error::InvalidPixelValue(format!(
                "expected 1 or 3 channels, got {}",
                channels.len()
            ))),
        }
    }

    /// As RGB, broadcasting mono levels to all three channels.
    pub fn to_rgb(self) -> [u8; 3] {
        match self {
            PixelValue::Mono(v) => [v, v, v],
            PixelValue::Rgb(c) => c,
        }
    }
}

pub struct PixelGrid {
    cols: usize,
    rows: usize,
    cells: Vec<PixelValue>,
    is_rgb: bool,
    style: MatrixStyle,
}

impl PixelGrid {
    pub fn new(cols: usize, rows: usize, style: MatrixStyle) -> Self {
        let mut grid = Self { cols, rows, cells: Vec::new(), is_rgb: false, style: MatrixStyle::default() };
        grid.set_pixel_padding(style.padding);
        grid.set_pixel_radius(style.radius);
        grid.style.cell_size = style.cell_size.max(1);
        grid.style.hue = style.hue;
        grid.style.saturation = style.saturation.clamp(0.0, 1.0);
        grid.build();
        grid
    }

    fn build(&mut self) {
        self.cells = vec![PixelValue::default(); self.cols * self.rows];
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_rgb(&self) -> bool {
        self.is_rgb
    }

    pub fn style(&self) -> &MatrixStyle {
        &self.style
    }

    /// New resolution; every cell goes dark.
    pub fn set_resolution(&mut self, cols: usize, rows: usize) {
        self.cols = cols;
        self.rows = rows;
        self.build();
    }

    /// LED gap in percent of the cell, clamped to 0..=50. NaN restores the default.
    pub fn set_pixel_padding(&mut self, value: f64) {
        self.style.padding = if value.is_nan() { DEFAULT_PADDING } else { value.clamp(0.0, 50.0) };
    }

    /// LED corner radius in percent of the cell, clamped to 0..=50. NaN restores the default.
    pub fn set_pixel_radius(&mut self, value: f64) {
        self.style.radius = if value.is_nan() { DEFAULT_RADIUS } else { value.clamp(0.0, 50.0) };
    }

    pub fn set_hue(&mut self, hue: f64) {
        self.style.hue = hue.rem_euclid(360.0);
    }

    pub fn set_saturation(&mut self, saturation: f64) {
        self.style.saturation = saturation.clamp(0.0, 1.0);
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<PixelValue> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.cells[row * self.cols + col])
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: PixelValue) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(Error::InvalidPixelValue(format!(
                "cell ({row}, {col}) outside {}x{} grid",
                self.cols, self.rows
            )));
        }
        self.cells[row * self.cols + col] = value;
        Ok(())
    }

    pub fn set_all(&mut self, value: PixelValue) {
        self.cells.fill(value);
    }

    /// Take over a sampled frame. Shape must match the grid exactly.
    pub fn apply(&mut self, buffer: PixelBuffer) -> Result<()> {
        if buffer.width as usize != self.cols || buffer.height as usize != self.rows {
            return Err(Error::InvalidPixelValue(format!(
                "buffer {}x{} does not match grid {}x{}",
                buffer.width, buffer.height, self.cols, self.rows
            )));
        }
        let expected = self.cols * self.rows * buffer.channels;
        if !matches!(buffer.channels, 1 | 3) || buffer.data.len() != expected {
            return Err(Error::InvalidPixelValue(format!(
                "buffer holds {} bytes, expected {} for {} channel(s)",
                buffer.data.len(),
                expected,
                buffer.channels
            )));
        }

        for (cell, chunk) in self.cells.iter_mut().zip(buffer.data.chunks_exact(buffer.channels)) {
            *cell = PixelValue::from_channels(chunk)?;
        }
        self.is_rgb = buffer.channels == 3;
        Ok(())
    }

    /// Shift columns by `n` (positive pulls content left). Vacated cells go dark.
    pub fn shift_horizontal(&mut self, n: isize) {
        let cols = self.cols as isize;
        let src = self.cells.clone();
        for r in 0..self.rows {
            for c in 0..cols {
                let from = c + n;
                let v = if (0..cols).contains(&from) {
                    src[r * self.cols + from as usize]
                } else {
                    PixelValue::default()
                };
                self.cells[r * self.cols + c as usize] = v;
            }
        }
    }

    /// Shift rows by `n` (positive pulls content up). Vacated cells go dark.
    pub fn shift_vertical(&mut self, n: isize) {
        let rows = self.rows as isize;
        let src = self.cells.clone();
        for r in 0..rows {
            let from = r + n;
            for c in 0..self.cols {
                let v = if (0..rows).contains(&from) {
                    src[from as usize * self.cols + c]
                } else {
                    PixelValue::default()
                };
                self.cells[r as usize * self.cols + c] = v;
            }
        }
    }

    /// Flat bytes: 3 per cell when the grid is RGB, 1 otherwise.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.is_rgb {
            self.cells.iter().flat_map(|c| c.to_rgb()).collect()
        } else {
            self.cells
                .iter()
                .map(|c| match *c {
                    PixelValue::Mono(v) => v,
                    PixelValue::Rgb([r, g, b]) => ((r as u16 + g as u16 + b as u16) / 3) as u8,
                })
                .collect()
        }
    }

    /// Screen colour of one cell; mono levels are tinted by hue/saturation.
    pub fn display_color(&self, value: PixelValue) -> u32 {
        match value {
            PixelValue::Rgb([r, g, b]) => pack_rgb(r, g, b),
            PixelValue::Mono(v) => {
                let s = self.style.saturation;
                let l = (v as f64 / 255.0) * (0.5 + 0.5 * (1.0 - s));
                let [r, g, b] = hsl_to_rgb(self.style.hue, s, l);
                pack_rgb(r, g, b)
            }
        }
    }

    /// Size in screen pixels of the rendered matrix.
    pub fn render_size(&self) -> (usize, usize) {
        (self.cols * self.style.cell_size, self.rows * self.style.cell_size)
    }

    /// Draw every cell as a rounded LED.
    pub fn render(&self, fb: &mut FrameBuffer) {
        fb.fill(0x00_00_00_00);
        let size = self.style.cell_size as f64;
        let pad = size * self.style.padding / 100.0;
        let radius = size * self.style.radius / 100.0;
        let led = (size - 2.0 * pad).max(1.0);

        for r in 0..self.rows {
            for c in 0..self.cols {
                let color = self.display_color(self.cells[r * self.cols + c]);
                let x = c as f64 * size + pad;
                let y = r as f64 * size + pad;
                fill_rounded_rect(fb, x, y, led, led, radius, color);
            }
        }
    }
}

/// HSL → RGB with hue in degrees and s, l in 0..1.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    let a = s * l.min(1.0 - l);
    let f = |n: f64| {
        let k = (n + h / 30.0).rem_euclid(12.0);
        let v = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
        (255.0 * v).round().clamp(0.0, 255.0) as u8
    };
    [f(0.0), f(8.0), f(4.0)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cols: usize, rows: usize) -> PixelGrid {
        PixelGrid::new(cols, rows, MatrixStyle::default())
    }

    fn mono(values: &[u8], cols: u32, rows: u32) -> PixelBuffer {
        PixelBuffer { width: cols, height: rows, channels: 1, data: values.to_vec() }
    }

    #[test]
    fn apply_maps_indices_row_major() {
        let mut g = grid(3, 2);
        g.apply(mono(&[1, 2, 3, 4, 5, 6], 3, 2)).unwrap();
        assert_eq!(g.cell(1, 0), Some(PixelValue::Mono(4)));
        assert_eq!(g.cell(0, 2), Some(PixelValue::Mono(3)));
        assert!(!g.is_rgb());
        assert_eq!(g.to_bytes(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn apply_rgb_switches_mode() {
        let mut g = grid(2, 1);
        let buf = PixelBuffer { width: 2, height: 1, channels: 3, data: vec![9, 8, 7, 6, 5, 4] };
        g.apply(buf).unwrap();
        assert!(g.is_rgb());
        assert_eq!(g.cell(0, 1), Some(PixelValue::Rgb([6, 5, 4])));
        assert_eq!(g.to_bytes(), vec![9, 8, 7, 6, 5, 4]);
    }

    #[test]
    fn malformed_buffers_are_rejected() {
        let mut g = grid(2, 2);
        assert!(g.apply(mono(&[1, 2, 3], 2, 2)).is_err());
        assert!(g.apply(mono(&[1, 2, 3, 4], 4, 1)).is_err());
        let two_channel = PixelBuffer { width: 2, height: 2, channels: 2, data: vec![0; 8] };
        assert!(matches!(g.apply(two_channel), Err(Error::InvalidPixelValue(_))));
    }

    #[test]
    fn cell_values_are_validated() {
        assert_eq!(PixelValue::from_level(300.0).unwrap(), PixelValue::Mono(255));
        assert_eq!(PixelValue::from_level(-4.0).unwrap(), PixelValue::Mono(0));
        assert!(PixelValue::from_level(f64::NAN).is_err());
        assert_eq!(PixelValue::from_bool(true), PixelValue::Mono(255));
        assert!(PixelValue::from_channels(&[1, 2]).is_err());
        let mut g = grid(2, 2);
        assert!(g.set_cell(2, 0, PixelValue::Mono(1)).is_err());
        g.set_cell(1, 1, PixelValue::Rgb([1, 2, 3])).unwrap();
        assert_eq!(g.cell(1, 1), Some(PixelValue::Rgb([1, 2, 3])));
    }

    #[test]
    fn shifts_fill_with_dark_cells() {
        let mut g = grid(3, 2);
        g.apply(mono(&[1, 2, 3, 4, 5, 6], 3, 2)).unwrap();
        g.shift_horizontal(1);
        assert_eq!(g.to_bytes(), vec![2, 3, 0, 5, 6, 0]);
        g.shift_horizontal(-2);
        assert_eq!(g.to_bytes(), vec![0, 0, 2, 0, 0, 5]);
        g.shift_vertical(-1);
        assert_eq!(g.to_bytes(), vec![0, 0, 0, 0, 0, 2]);
        g.shift_vertical(1);
        assert_eq!(g.to_bytes(), vec![0, 0, 2, 0, 0, 0]);
    }

    #[test]
    fn style_setters_clamp_and_default() {
        let mut g = grid(1, 1);
        g.set_pixel_padding(80.0);
        assert_eq!(g.style().padding, 50.0);
        g.set_pixel_padding(f64::NAN);
        assert_eq!(g.style().padding, 5.0);
        g.set_pixel_radius(-3.0);
        assert_eq!(g.style().radius, 0.0);
        g.set_pixel_radius(f64::NAN);
        assert_eq!(g.style().radius, 15.0);
    }

    #[test]
    fn hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), [255, 0, 0]);
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), [0, 255, 0]);
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), [0, 0, 255]);
        assert_eq!(hsl_to_rgb(0.0, 0.0, 1.0), [255, 255, 255]);
    }

    #[test]
    fn mono_cells_are_tinted() {
        let g = grid(1, 1);
        assert_eq!(g.display_color(PixelValue::Mono(0)), 0);
        // Full saturation: full level maps to l = 0.5 → pure hue.
        let full = g.display_color(PixelValue::Mono(255));
        assert_eq!(full, {
            let [r, gg, b] = hsl_to_rgb(10.0, 1.0, 0.5);
            pack_rgb(r, gg, b)
        });
    }

    #[test]
    fn render_fills_led_centres() {
        let mut g = grid(2, 1);
        g.apply(PixelBuffer { width: 2, height: 1, channels: 3, data: vec![255, 0, 0, 0, 0, 255] }).unwrap();
        let (w, h) = g.render_size();
        let mut fb = FrameBuffer::new(w, h);
        g.render(&mut fb);
        let cs = g.style().cell_size;
        assert_eq!(fb.pixels[(cs / 2) * w + cs / 2], 0x00FF_0000);
        assert_eq!(fb.pixels[(cs / 2) * w + cs + cs / 2], 0x0000_00FF);
    }
}
