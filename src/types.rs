// Core buffer types passed between the sampler, the grid and the windows.

use serde::{Deserialize, Serialize};

/// Screen-side image for minifb.
#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the window content is (pixels)
    pub height: usize,     // how tall the window content is (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    /// Match a new window size, keeping the allocation when it is big enough.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.resize(width * height, 0);
    }

    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }
}

/// Pack an RGB triple as 0x00RRGGBB.
#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Split 0x00RRGGBB back into its channels.
#[inline]
pub fn unpack_rgb(px: u32) -> (u8, u8, u8) {
    (((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8)
}

/// Output channel layout of a sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Rgb,
    Grayscale,
}

impl ColorMode {
    pub fn channels(self) -> usize {
        match self {
            ColorMode::Rgb => 3,
            ColorMode::Grayscale => 1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ColorMode::Rgb => ColorMode::Grayscale,
            ColorMode::Grayscale => ColorMode::Rgb,
        }
    }
}

/// One sampled frame: `width × height × channels` bytes, row-major.
/// Built fresh every tick and handed over by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub channels: usize, // 1 = grayscale, 3 = RGB
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_rgb(&self) -> bool {
        self.channels == 3
    }

    /// Channel values of cell `i` in row-major order.
    pub fn cell(&self, i: usize) -> Option<&[u8]> {
        let start = i.checked_mul(self.channels)?;
        self.data.get(start..start + self.channels)
    }
}
