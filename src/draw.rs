// Window + software drawing utilities.
// Visual effects provided here:
// 1) Windows that show the framed source and the LED matrix.
// 2) The framing overlay: dimmed surround, capture-window outline, bounding box.
// 3) A tiny 5x7 bitmap font to render HUD text on top of the video.

use crate::error::Error;
use crate::geometry::{Rect, Vector2};
use crate::types::{FrameBuffer, pack_rgb, unpack_rgb};
use crate::viewport::ViewportState;
use image::RgbaImage;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

pub struct Drawer {
    window: Window, // the on-screen window you see
}

impl Drawer {
    /// Create a window. Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize, resizable: bool) -> Result<Self, Error> {
        let opts = WindowOptions { resize: resizable, ..WindowOptions::default() };
        let mut window =
            Window::new(title, width, height, opts).map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Current content size; follows the user dragging the window edge.
    pub fn size(&self) -> (usize, usize) {
        self.window.get_size()
    }

    /// Mouse position in window pixels, `None` when outside the window.
    pub fn mouse_pos(&self) -> Option<Vector2> {
        self.window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| Vector2::new(x as f64, y as f64))
    }

    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    /// Vertical wheel movement since the last update, in notches (up is positive).
    pub fn scroll_y(&self) -> Option<f64> {
        self.window
            .get_scroll_wheel()
            .map(|(_, y)| y as f64)
            .filter(|y| *y != 0.0)
    }

    /// True once per key press (no auto-repeat).
    pub fn pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// True on press and on auto-repeat while held.
    pub fn pressed_repeat(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::Yes)
    }
}

/* ---------- Software drawing: pixels, lines, rounded rects ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0, x1, y1) = (x0, y0, x1, y1);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// 1-pixel rectangle outline.
pub fn draw_rect(fb: &mut FrameBuffer, rect: Rect, color: u32) {
    let (x0, y0) = (rect.origin.x.round() as i32, rect.origin.y.round() as i32);
    let (x1, y1) = (rect.max().x.round() as i32 - 1, rect.max().y.round() as i32 - 1);
    draw_line(fb, x0, y0, x1, y0, color);
    draw_line(fb, x1, y0, x1, y1, color);
    draw_line(fb, x1, y1, x0, y1, color);
    draw_line(fb, x0, y1, x0, y0, color);
}

/// Is point (px,py) inside the rounded rectangle?
#[inline]
fn inside_rounded(px: f64, py: f64, x: f64, y: f64, w: f64, h: f64, r: f64) -> bool {
    if px < x || py < y || px >= x + w || py >= y + h {
        return false;
    }
    let r = r.min(w / 2.0).min(h / 2.0).max(0.0);
    // Distance from the nearest corner circle centre, only in the corner zones.
    let cx = px.clamp(x + r, x + w - r);
    let cy = py.clamp(y + r, y + h - r);
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= r * r
}

/// Filled rounded rectangle; pixel centres decide coverage.
pub fn fill_rounded_rect(fb: &mut FrameBuffer, x: f64, y: f64, w: f64, h: f64, r: f64, color: u32) {
    let x0 = x.floor().max(0.0) as usize;
    let y0 = y.floor().max(0.0) as usize;
    let x1 = ((x + w).ceil().max(0.0) as usize).min(fb.width);
    let y1 = ((y + h).ceil().max(0.0) as usize).min(fb.height);
    for py in y0..y1 {
        for px in x0..x1 {
            if inside_rounded(px as f64 + 0.5, py as f64 + 0.5, x, y, w, h, r) {
                fb.pixels[py * fb.width + px] = color;
            }
        }
    }
}

/* ---------- Container view: source + framing overlay ---------- */

const BACKGROUND: u32 = 0x00_1A_1A_1A;
const INNER_OUTLINE: u32 = 0x00_DD_DD_DD;
const BOUNDING_BOX: u32 = 0x00_FF_CC_33;
const SCRUB_TRACK: u32 = 0x00_44_44_44;
const SCRUB_FILL: u32 = 0x00_33_AA_FF;

/// What the container window should show this frame.
pub struct PlacerView<'a> {
    pub state: Option<&'a ViewportState>,
    pub inner: Option<Rect>,
    pub frame: Option<&'a RgbaImage>,
    /// Inner box corner radius in screen pixels.
    pub corner_radius: f64,
    /// Flash the scaled source outline (right after a pan/zoom).
    pub show_bounds: bool,
    /// Clip playback position, drawn as a bar along the bottom.
    pub progress: Option<f64>,
}

/// Draw the framed source, dim everything outside the capture window and
/// add the outlines. Visual: the bright rounded box is what the LEDs get.
pub fn render_placer(fb: &mut FrameBuffer, view: &PlacerView<'_>) {
    fb.fill(BACKGROUND);

    if let (Some(state), Some(frame)) = (view.state, view.frame) {
        blit_scaled(fb, frame, state.offset, state.scale);
    }

    if let Some(inner) = view.inner {
        let (x, y, w, h) = (inner.origin.x, inner.origin.y, inner.size.x, inner.size.y);
        for py in 0..fb.height {
            for px in 0..fb.width {
                if !inside_rounded(px as f64 + 0.5, py as f64 + 0.5, x, y, w, h, view.corner_radius) {
                    let i = py * fb.width + px;
                    let (r, g, b) = unpack_rgb(fb.pixels[i]);
                    fb.pixels[i] = pack_rgb(r / 3, g / 3, b / 3); // visual: dimmed surround
                }
            }
        }
        draw_rect(fb, inner, INNER_OUTLINE);
    }

    if view.show_bounds {
        if let Some(state) = view.state {
            draw_rect(fb, state.source_rect(), BOUNDING_BOX);
        }
    }

    if let Some(p) = view.progress {
        let h = 4usize.min(fb.height);
        let y = fb.height - h;
        fill_rounded_rect(fb, 0.0, y as f64, fb.width as f64, h as f64, 0.0, SCRUB_TRACK);
        let filled = fb.width as f64 * p.clamp(0.0, 1.0);
        fill_rounded_rect(fb, 0.0, y as f64, filled, h as f64, 0.0, SCRUB_FILL);
    }
}

/// Nearest-neighbour draw of `src` at `offset` scaled by `scale`, clipped to `fb`.
fn blit_scaled(fb: &mut FrameBuffer, src: &RgbaImage, offset: Vector2, scale: f64) {
    if !(scale > 0.0) {
        return;
    }
    let (sw, sh) = (src.width() as f64, src.height() as f64);
    let x0 = offset.x.max(0.0).floor() as usize;
    let y0 = offset.y.max(0.0).floor() as usize;
    let x1 = ((offset.x + sw * scale).ceil().max(0.0) as usize).min(fb.width);
    let y1 = ((offset.y + sh * scale).ceil().max(0.0) as usize).min(fb.height);

    for py in y0..y1 {
        let sy = (py as f64 + 0.5 - offset.y) / scale;
        if sy < 0.0 || sy >= sh { continue; }
        for px in x0..x1 {
            let sx = (px as f64 + 0.5 - offset.x) / scale;
            if sx < 0.0 || sx >= sw { continue; }
            let p = src.get_pixel(sx as u32, sy as u32).0;
            fb.pixels[py * fb.width + px] = pack_rgb(p[0], p[1], p[2]);
        }
    }
}

/* ---------- 5x7 bitmap font (uppercase, digits, a little punctuation) ---------- */

/// Return a 5x7 glyph bitmap. Each u8 is a row; the low 5 bits are the
/// pixels (bit 4 = leftmost). Lowercase is drawn as uppercase.
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    // Helper macro to define a glyph quickly
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        // Digits 0..9
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        // Punctuation
        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '/' => g!(0b00001,0b00010,0b00010,0b00100,0b01000,0b01000,0b10000),
        '%' => g!(0b11000,0b11001,0b00010,0b00100,0b01000,0b10011,0b00011),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y) with a 1-pixel black shadow.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    if let Some(rows) = glyph5x7(ch) {
        for (shadow, c) in [(1, 0x00000000), (0, color)] {
            for (ry, rowbits) in rows.iter().enumerate() {
                for rx in 0..5 {
                    if (rowbits & (1 << (4 - rx))) != 0 {
                        put_pixel(fb, x + rx + shadow, y + ry as i32 + shadow, c);
                    }
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs, 1-pixel spacing.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6; // 5 pixels glyph width + 1 pixel spacing
    }
}
