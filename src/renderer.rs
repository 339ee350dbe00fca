//! The matrix renderer: one object that owns the viewport, the sampler, the
//! active source and the frame loop, and exposes the operations a display
//! adapter (or a test) drives.

use crate::camera;
use crate::config::{AppConfig, GrayscaleOptions};
use crate::error::{Error, Result};
use crate::geometry::Vector2;
use crate::sampling::Sampler;
use crate::scheduler::FrameLoop;
use crate::screen;
use crate::source::{AnimatedClip, CaptureSource, SourceInput, SourceKind, StillImage};
use crate::types::{ColorMode, PixelBuffer};
use crate::viewport::ViewportController;
use image::RgbaImage;
use log::{debug, info, warn};
use std::time::Duration;

type FrameCallback = Box<dyn FnMut(&PixelBuffer)>;

pub struct MatrixRenderer {
    viewport: ViewportController,
    sampler: Sampler,
    source: Option<Box<dyn CaptureSource>>,
    frame_loop: FrameLoop,
    callbacks: Vec<FrameCallback>,
    // Last frame drawn, kept for the container view.
    last_frame: Option<RgbaImage>,
}

impl MatrixRenderer {
    pub fn new(config: &AppConfig) -> Self {
        let v = &config.viewport;
        Self {
            sampler: Sampler::new(v.grid_width, v.grid_height, config.mode, config.grayscale.clone()),
            viewport: ViewportController::new(v.clone()),
            source: None,
            frame_loop: FrameLoop::new(),
            callbacks: Vec::new(),
            last_frame: None,
        }
    }

    /* ---- accessors (read-only views for the display adapter and tests) ---- */

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn current_frame(&self) -> Option<&RgbaImage> {
        self.last_frame.as_ref()
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source.as_ref().map(|s| s.kind())
    }

    pub fn mode(&self) -> ColorMode {
        self.sampler.mode()
    }

    pub fn grid_resolution(&self) -> (u32, u32) {
        self.sampler.grid_resolution()
    }

    pub fn grayscale_options(&self) -> &GrayscaleOptions {
        self.sampler.grayscale_options()
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    /* ---- configuration ---- */

    pub fn set_grid_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        self.viewport.set_grid_resolution(width, height)?;
        self.sampler.set_grid_resolution(width, height);
        info!("grid resolution {width}x{height}");
        Ok(())
    }

    pub fn set_mode(&mut self, mode: ColorMode) {
        self.sampler.set_mode(mode);
    }

    pub fn set_grayscale_options(&mut self, options: GrayscaleOptions) {
        self.sampler.set_grayscale_options(options);
    }

    /// Register a listener for every successfully sampled frame.
    pub fn on_frame_sampled(&mut self, callback: impl FnMut(&PixelBuffer) + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    /* ---- sources ---- */

    pub fn open_image_source(&mut self, input: SourceInput) -> Result<()> {
        let source = StillImage::open(&input)?;
        self.attach(Box::new(source));
        Ok(())
    }

    pub fn open_video_source(&mut self, input: SourceInput) -> Result<()> {
        let source = AnimatedClip::open(&input)?;
        self.attach(Box::new(source));
        Ok(())
    }

    pub fn open_webcam(&mut self, index: u32) -> Result<()> {
        // An open camera holds the device; free it before asking again.
        // Anything else stays attached until the new camera is up.
        if camera::SUPPORTED && self.source_kind() == Some(SourceKind::Webcam) {
            self.release_current();
        }
        let source = camera::open_webcam(index).inspect_err(|e| warn!("webcam unavailable: {e}"))?;
        self.attach(source);
        Ok(())
    }

    pub fn open_screen_share(&mut self) -> Result<()> {
        let source = screen::open_screen_share().inspect_err(|e| warn!("screen share unavailable: {e}"))?;
        self.attach(source);
        Ok(())
    }

    /// Attach any capture source, releasing the previous one first.
    pub fn attach(&mut self, mut source: Box<dyn CaptureSource>) {
        if let Some(mut old) = self.source.take() {
            old.release();
        }
        self.viewport.reset_source();
        self.last_frame = None;
        if let Some((w, h)) = source.natural_size() {
            self.report_dimensions(w, h);
        }
        info!("attached {:?} source", source.kind());
        source.set_playing(true);
        self.source = Some(source);
    }

    fn release_current(&mut self) {
        if let Some(mut old) = self.source.take() {
            old.release();
        }
        self.viewport.reset_source();
        self.last_frame = None;
    }

    fn report_dimensions(&mut self, w: u32, h: u32) {
        if let Err(e) = self.viewport.on_source_dimensions(Vector2::new(w as f64, h as f64)) {
            debug!("source dimensions {w}x{h} not usable yet: {e}");
        }
    }

    /* ---- input ---- */

    /// Container resized; applied once at the next tick.
    pub fn container_resized(&mut self, width: f64, height: f64) {
        self.frame_loop.request_resize(width, height);
    }

    pub fn pan(&mut self, delta: Vector2) -> bool {
        self.viewport.pan(delta)
    }

    pub fn zoom_at(&mut self, point: Vector2, delta_scale: f64) -> bool {
        self.viewport.zoom_at(point, delta_scale)
    }

    /// Wheel movement in pixels, positive when scrolling down (zooms out).
    pub fn wheel(&mut self, point: Vector2, delta_y: f64) -> bool {
        let zoom_scale = self.viewport.config().zoom_scale;
        self.viewport.zoom_at(point, -delta_y / zoom_scale)
    }

    pub fn toggle_playback(&mut self) {
        if let Some(s) = self.source.as_mut() {
            let playing = !s.is_playing();
            s.set_playing(playing);
        }
    }

    /// Scrub the clip by `fraction` of its length; coalesced per tick.
    pub fn scrub_by(&mut self, fraction: f64) {
        self.frame_loop.request_scrub(fraction);
    }

    pub fn playback_progress(&self) -> Option<f64> {
        self.source.as_ref().and_then(|s| s.progress())
    }

    /* ---- frame loop ---- */

    /// One refresh: returns the sampled buffer, or `None` when this tick
    /// produced nothing (no source yet, geometry not ready, frame failed or
    /// loop stopped).
    pub fn tick(&mut self, dt: Duration) -> Option<PixelBuffer> {
        let mut guard = self.frame_loop.begin_tick()?;

        if let Some(size) = guard.take_resize() {
            // Invalid sizes are logged by the controller and otherwise ignored.
            let _ = self.viewport.on_container_resize(size.x, size.y);
        }
        let scrub = guard.take_scrub();

        let source = self.source.as_mut()?;
        if let Some(fraction) = scrub {
            if let Some(p) = source.progress() {
                source.seek(p + fraction);
            }
        }
        source.advance(dt);

        let frame = match source.frame() {
            Ok(frame) => frame,
            Err(e) => {
                debug!("no frame this tick: {e}");
                return None;
            }
        };

        // Live sources only learn their size once frames flow, and cameras
        // may renegotiate mid-stream; a new size means a fresh fit.
        let (w, h) = frame.dimensions();
        let size = Vector2::new(w as f64, h as f64);
        let refit = match self.viewport.snapshot() {
            Some(state) if state.source_size != size => {
                info!("source now {w}x{h}, refitting");
                self.viewport.reset_source();
                true
            }
            Some(_) => false,
            None => true,
        };
        if refit {
            if let Err(e) = self.viewport.on_source_dimensions(size) {
                debug!("source dimensions {w}x{h} not usable yet: {e}");
            }
        }

        let snapshot = self.viewport.snapshot();
        let result = self.sampler.sample(snapshot.as_ref(), frame);

        // Keep a copy for the container view, reusing the allocation.
        match self.last_frame.as_mut() {
            Some(last) if last.dimensions() == frame.dimensions() => last.copy_from_slice(frame.as_raw()),
            _ => self.last_frame = Some(frame.clone()),
        }
        drop(guard);

        match result {
            Ok(buffer) => {
                for cb in self.callbacks.iter_mut() {
                    cb(&buffer);
                }
                Some(buffer)
            }
            Err(e) => {
                if !e.is_recoverable() {
                    warn!("sampling failed: {e}");
                } else {
                    debug!("sampling skipped: {e}");
                }
                None
            }
        }
    }

    /// Cancel the loop and let go of the source's hardware.
    pub fn stop(&mut self) {
        self.frame_loop.stop();
        if let Some(mut s) = self.source.take() {
            s.release();
        }
    }
}

impl Drop for MatrixRenderer {
    fn drop(&mut self) {
        if let Some(s) = self.source.as_mut() {
            s.release();
        }
    }
}

/// Adapter-facing helper: map a failed open to a user-facing message.
pub fn describe_open_error(e: &Error) -> String {
    match e {
        Error::UnsupportedCapability(msg) => format!("not available: {msg}"),
        other => other.to_string(),
    }
}
