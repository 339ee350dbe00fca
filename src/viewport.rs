//! Viewport controller: keeps the source → container transform valid.
//!
//! The container is the whole window, the inner box is the fixed-aspect
//! capture window centered in it, and the source is drawn at
//! `offset + p × scale`. Every gesture goes through the same
//! propose → clamp → snap → commit path, so the magnetic snapping behaves the
//! same whether the input came from a drag, a wheel or a pinch.

use crate::config::ViewportConfig;
use crate::error::{Error, Result};
use crate::geometry::{Rect, Vector2, cover_ratio, fit_aspect, is_positive};
use log::{debug, warn};

/// Where the controller is in its start-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportPhase {
    /// No valid container size yet.
    Uninitialized,
    /// Container known, waiting for a source to report its size.
    AwaitingSource,
    /// Source fitted; pan/zoom and sampling are live.
    Ready,
}

/// Read-only copy of the transform handed to the sampler each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub container_size: Vector2,
    pub inner_size: Vector2,
    pub source_size: Vector2,
    pub scale: f64,
    pub offset: Vector2,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl ViewportState {
    /// Top-left corner of the inner box in container pixels.
    pub fn inner_origin(&self) -> Vector2 {
        (self.container_size - self.inner_size) / 2.0
    }

    /// Source offset relative to the inner box.
    pub fn inner_offset(&self) -> Vector2 {
        self.offset - self.inner_origin()
    }

    /// Where the scaled source currently sits in container pixels.
    pub fn source_rect(&self) -> Rect {
        Rect::new(self.offset, self.source_size * self.scale)
    }

    pub fn screen_to_source(&self, p: Vector2) -> Vector2 {
        (p - self.offset) / self.scale
    }

    pub fn source_to_screen(&self, p: Vector2) -> Vector2 {
        p * self.scale + self.offset
    }
}

pub struct ViewportController {
    config: ViewportConfig,
    phase: ViewportPhase,
    container: Option<Vector2>,
    inner: Option<Rect>,
    source: Option<Vector2>,
    scale: f64,
    offset: Vector2,
    min_scale: f64,
    max_scale: f64,
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            phase: ViewportPhase::Uninitialized,
            container: None,
            inner: None,
            source: None,
            scale: 1.0,
            offset: Vector2::ZERO,
            min_scale: 0.0,
            max_scale: f64::INFINITY,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn phase(&self) -> ViewportPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == ViewportPhase::Ready
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.config.aspect_ratio()
    }

    /// The inner box in container pixels, once a container is known.
    pub fn inner_rect(&self) -> Option<Rect> {
        self.inner
    }

    /// Inner box corner radius in container pixels: the border radius in
    /// grid cells times the on-screen width of one cell.
    pub fn corner_radius(&self) -> Option<f64> {
        let inner = self.inner?;
        Some(self.config.pixel_border_radius * inner.size.x / self.config.grid_width as f64)
    }

    pub fn container_size(&self) -> Option<Vector2> {
        self.container
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> Vector2 {
        self.offset
    }

    /// Current transform, only once the source has been fitted.
    pub fn snapshot(&self) -> Option<ViewportState> {
        if !self.is_ready() {
            return None;
        }
        let (container, inner, source) = (self.container?, self.inner?, self.source?);
        Some(ViewportState {
            container_size: container,
            inner_size: inner.size,
            source_size: source,
            scale: self.scale,
            offset: self.offset,
            min_scale: self.min_scale,
            max_scale: self.max_scale,
        })
    }

    /// Container content box changed size.
    pub fn on_container_resize(&mut self, width: f64, height: f64) -> Result<()> {
        let size = Vector2::new(width, height);
        if !is_positive(size) {
            warn!("Invalid size for viewport container: {width} x {height}");
            return Err(Error::InvalidGeometry { width, height });
        }

        self.container = Some(size);
        self.inner = Some(fit_aspect(size, self.config.padding, self.aspect_ratio()));

        match self.phase {
            ViewportPhase::Ready => {
                // Keep the already-fitted transform; just pull it back into bounds.
                if let Some(adjusted) = self.adjust_offset(self.offset, self.scale) {
                    self.offset = adjusted;
                }
            }
            _ => {
                self.phase = ViewportPhase::AwaitingSource;
                self.try_fit();
            }
        }
        Ok(())
    }

    /// The source reported its natural pixel size.
    ///
    /// Whichever of this and the first resize arrives last performs the fit.
    /// Later reports (e.g. a camera settling on a slightly different mode)
    /// update the size without re-fitting.
    pub fn on_source_dimensions(&mut self, size: Vector2) -> Result<()> {
        if !is_positive(size) {
            return Err(Error::SourceNotReady);
        }
        self.source = Some(size);
        if self.phase != ViewportPhase::Ready {
            self.try_fit();
        }
        Ok(())
    }

    /// A different source is about to be attached; forget the old fit.
    pub fn reset_source(&mut self) {
        self.source = None;
        self.phase = if self.container.is_some() {
            ViewportPhase::AwaitingSource
        } else {
            ViewportPhase::Uninitialized
        };
    }

    /// New grid resolution: new aspect ratio, new inner box, fresh fit.
    pub fn set_grid_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidGeometry { width: width as f64, height: height as f64 });
        }
        self.config.grid_width = width;
        self.config.grid_height = height;

        if let Some(container) = self.container {
            self.inner = Some(fit_aspect(container, self.config.padding, self.aspect_ratio()));
            self.phase = ViewportPhase::AwaitingSource;
            self.try_fit();
        }
        Ok(())
    }

    fn try_fit(&mut self) {
        let (Some(container), Some(inner), Some(source)) = (self.container, self.inner, self.source)
        else {
            return;
        };

        let fit = cover_ratio(inner.size, source);
        self.scale = fit;
        self.offset = (container - source * fit) / 2.0;
        self.min_scale = fit * self.config.min_scale_ratio;
        self.max_scale = fit * self.config.max_scale_ratio;
        self.phase = ViewportPhase::Ready;
        debug!("viewport fitted: scale {fit:.4}, offset ({:.1}, {:.1})", self.offset.x, self.offset.y);
    }

    /// Drag by `delta` container pixels. Returns true when the move was committed.
    pub fn pan(&mut self, delta: Vector2) -> bool {
        if !self.is_ready() || !delta.is_finite() {
            return false;
        }
        match self.adjust_offset(self.offset + delta, self.scale) {
            Some(adjusted) => {
                self.offset = adjusted;
                true
            }
            None => false,
        }
    }

    /// Zoom by `1 + delta_scale` keeping `point` (container pixels) anchored.
    pub fn zoom_at(&mut self, point: Vector2, delta_scale: f64) -> bool {
        if !self.is_ready() || !delta_scale.is_finite() || !point.is_finite() {
            return false;
        }

        let scale = self.adjust_scale(self.scale * (1.0 + delta_scale));
        // Use the ratio actually applied, not the one requested, so the
        // anchor stays put even when the scale was clamped or snapped.
        let ratio = scale / self.scale;

        let new_offset = point + (self.offset - point) * ratio;
        match self.adjust_offset(new_offset, scale) {
            Some(adjusted) => {
                self.offset = adjusted;
                self.scale = scale;
                true
            }
            None => false,
        }
    }

    /// Clamp `offset` so the scaled source keeps touching the inner box,
    /// then snap each axis to center when it is within the snap threshold.
    /// `None` until the controller is Ready.
    pub fn adjust_offset(&self, offset: Vector2, scale: f64) -> Option<Vector2> {
        if !self.is_ready() {
            return None;
        }
        let (size, inner, source) = (self.container?, self.inner?.size, self.source?);

        let scaled = source * scale;
        let max_offset = (size + inner) / 2.0;
        let min_offset = (size - inner) / 2.0 - scaled;
        let mut offset = offset.clamp(min_offset, max_offset.max(min_offset));

        let centered = (size - scaled) / 2.0;
        let dist = offset - centered;
        if dist.x.abs() < self.config.snap_threshold {
            offset.x = centered.x;
        }
        if dist.y.abs() < self.config.snap_threshold {
            offset.y = centered.y;
        }
        Some(offset)
    }

    /// Clamp a candidate scale into `[min_scale, max_scale]`, then lock it to
    /// an exact axis fill when close enough, already centered on that axis and
    /// itself within the bounds.
    ///
    /// When both axes qualify the one closer to its fill ratio wins.
    pub fn adjust_scale(&self, scale: f64) -> f64 {
        let mut scale = scale.clamp(self.min_scale, self.max_scale.max(self.min_scale));

        let (Some(size), Some(inner), Some(source)) = (self.container, self.inner, self.source)
        else {
            return scale;
        };
        if !self.is_ready() {
            return scale;
        }

        let threshold = self.config.snap_threshold;
        let fill = inner.size / source;
        // Relative distance to each fill ratio, in snap-threshold units.
        let dist = (fill / scale - 1.0).abs() / (threshold / self.config.zoom_scale);
        let centered = self.offset - (size - source * self.scale) / 2.0;

        // A fill outside the scale bounds is never a snap target.
        let in_bounds = |f: f64| f >= self.min_scale && f <= self.max_scale;
        let x_ok = dist.x < 1.0 && centered.x.abs() < threshold && in_bounds(fill.x);
        let y_ok = dist.y < 1.0 && centered.y.abs() < threshold && in_bounds(fill.y);

        match (x_ok, y_ok) {
            (true, true) if dist.y < dist.x => scale = fill.y,
            (true, _) => scale = fill.x,
            (false, true) => scale = fill.y,
            (false, false) => {}
        }
        scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn ready(container: (f64, f64), source: (f64, f64)) -> ViewportController {
        let mut vp = ViewportController::new(ViewportConfig::default());
        vp.on_container_resize(container.0, container.1).unwrap();
        vp.on_source_dimensions(Vector2::new(source.0, source.1)).unwrap();
        assert!(vp.is_ready());
        vp
    }

    #[test]
    fn scenario_400x300_inner_box() {
        let mut vp = ViewportController::new(ViewportConfig::default());
        vp.on_container_resize(400.0, 300.0).unwrap();
        let inner = vp.inner_rect().unwrap();
        // pad = 0.15 × 300 = 45 → 310 × 210 padded box, width-bound.
        assert!(close(inner.size.x, 310.0, 1.0));
        assert!(close(inner.size.y, 310.0 / (130.0 / 75.0), 1.0));
        assert!(close(inner.size.x / inner.size.y, 130.0 / 75.0, 1e-9));
        assert!(inner.size.x <= 400.0 - 90.0 + EPS);
        assert!(inner.size.y <= 300.0 - 90.0 + EPS);
        assert_eq!(vp.phase(), ViewportPhase::AwaitingSource);
    }

    #[test]
    fn scenario_1080p_initial_fit() {
        let vp = ready((400.0, 300.0), (1920.0, 1080.0));
        let s = vp.snapshot().unwrap();
        let expected = (s.inner_size.x / 1920.0).max(s.inner_size.y / 1080.0);
        assert!(close(s.scale, expected, EPS));
        let centered = (s.container_size - s.source_size * s.scale) / 2.0;
        assert!(close(s.offset.x, centered.x, EPS));
        assert!(close(s.offset.y, centered.y, EPS));
        assert!(close(s.min_scale, expected * 0.5, EPS));
        assert!(close(s.max_scale, expected * 3.0, EPS));
    }

    #[test]
    fn inner_aspect_holds_for_many_containers() {
        let mut vp = ViewportController::new(ViewportConfig::default());
        for &(w, h) in &[(100.0, 100.0), (1920.0, 200.0), (120.0, 900.0), (333.3, 777.7)] {
            vp.on_container_resize(w, h).unwrap();
            let inner = vp.inner_rect().unwrap();
            let pad = 0.15 * f64::min(w, h);
            assert!(close(inner.size.x / inner.size.y, vp.aspect_ratio(), 1e-9));
            assert!(inner.size.x <= w - 2.0 * pad + 1e-6);
            assert!(inner.size.y <= h - 2.0 * pad + 1e-6);
            assert!(inner.origin.x >= pad - 1e-6 && inner.origin.y >= pad - 1e-6);
        }
    }

    #[test]
    fn source_before_container_still_fits_once() {
        let mut vp = ViewportController::new(ViewportConfig::default());
        vp.on_source_dimensions(Vector2::new(640.0, 480.0)).unwrap();
        assert_eq!(vp.phase(), ViewportPhase::Uninitialized);
        vp.on_container_resize(800.0, 600.0).unwrap();
        assert!(vp.is_ready());
    }

    #[test]
    fn later_dimension_reports_do_not_refit() {
        let mut vp = ready((400.0, 300.0), (1920.0, 1080.0));
        assert!(vp.pan(Vector2::new(30.0, 0.0)));
        let before = vp.snapshot().unwrap();
        vp.on_source_dimensions(Vector2::new(1920.0, 1080.0)).unwrap();
        let after = vp.snapshot().unwrap();
        assert_eq!(before.scale, after.scale);
        assert_eq!(before.offset, after.offset);
    }

    #[test]
    fn invalid_resize_keeps_previous_state() {
        let mut vp = ready((400.0, 300.0), (1920.0, 1080.0));
        let before = vp.snapshot().unwrap();
        let err = vp.on_container_resize(0.0, 300.0).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry { .. }));
        assert!(vp.on_container_resize(f64::NAN, 10.0).is_err());
        assert_eq!(vp.snapshot().unwrap(), before);
    }

    #[test]
    fn gestures_ignored_until_ready() {
        let mut vp = ViewportController::new(ViewportConfig::default());
        vp.on_container_resize(400.0, 300.0).unwrap();
        assert!(!vp.pan(Vector2::new(5.0, 5.0)));
        assert!(!vp.zoom_at(Vector2::new(200.0, 150.0), 0.1));
        assert!(vp.adjust_offset(Vector2::ZERO, 1.0).is_none());
        assert!(vp.snapshot().is_none());
    }

    #[test]
    fn offset_clamp_is_idempotent() {
        let vp = ready((400.0, 300.0), (1920.0, 1080.0));
        let scale = vp.scale();
        for x in [-5000.0, -300.0, -272.0, 0.0, 41.0, 42.5, 200.0, 354.0, 9000.0] {
            for y in [-5000.0, -120.0, 60.0, 61.9, 150.0, 239.0, 5000.0] {
                let once = vp.adjust_offset(Vector2::new(x, y), scale).unwrap();
                let twice = vp.adjust_offset(once, scale).unwrap();
                assert_eq!(once, twice, "offset ({x}, {y})");
            }
        }
    }

    #[test]
    fn offset_clamp_keeps_source_touching_inner_box() {
        let vp = ready((400.0, 300.0), (1920.0, 1080.0));
        let s = vp.snapshot().unwrap();
        let far = vp.adjust_offset(Vector2::new(1e6, -1e6), s.scale).unwrap();
        let inner_min = s.inner_origin();
        let inner_max = inner_min + s.inner_size;
        assert!(close(far.x, inner_max.x, EPS)); // left edge parked on inner right edge
        assert!(close(far.y + s.source_size.y * s.scale, inner_min.y, EPS));
    }

    #[test]
    fn snap_attracts_inside_threshold_only() {
        let vp = ready((400.0, 300.0), (1920.0, 1080.0));
        let s = vp.snapshot().unwrap();
        let centered = (s.container_size - s.source_size * s.scale) / 2.0;

        let near = vp.adjust_offset(centered + Vector2::new(1.5, -1.99), s.scale).unwrap();
        assert_eq!(near, centered);

        let eps = 1e-6;
        let outside = centered + Vector2::new(2.0 + eps, 0.0);
        let far = vp.adjust_offset(outside, s.scale).unwrap();
        assert_eq!(far.x, outside.x);
        assert_eq!(far.y, centered.y);
    }

    #[test]
    fn zoom_keeps_anchor_point_fixed() {
        let mut vp = ready((400.0, 300.0), (1920.0, 1080.0));
        assert!(vp.pan(Vector2::new(40.0, 25.0)));

        let p = Vector2::new(180.0, 140.0);
        let before = vp.snapshot().unwrap().screen_to_source(p);
        assert!(vp.zoom_at(p, 0.2));
        let after = vp.snapshot().unwrap();
        let src = after.screen_to_source(p);
        assert!(close(src.x, before.x, 1e-6));
        assert!(close(src.y, before.y, 1e-6));
        let back = after.source_to_screen(src);
        assert!(close(back.x, p.x, 1e-6) && close(back.y, p.y, 1e-6));
    }

    #[test]
    fn zoom_is_clamped_to_scale_bounds() {
        let mut vp = ready((400.0, 300.0), (1920.0, 1080.0));
        let s = vp.snapshot().unwrap();
        assert!(vp.zoom_at(Vector2::new(200.0, 150.0), 100.0));
        assert!(close(vp.scale(), s.max_scale, EPS));
        assert!(vp.zoom_at(Vector2::new(200.0, 150.0), -0.999));
        assert!(close(vp.scale(), s.min_scale, EPS));
    }

    #[test]
    fn zoom_snaps_to_width_fill_when_centered() {
        let mut vp = ready((400.0, 300.0), (1920.0, 1080.0));
        let s = vp.snapshot().unwrap();
        let fill_x = s.inner_size.x / 1920.0;
        // Ask for a scale a hair away from the width fill.
        let delta = (fill_x * 1.003) / s.scale - 1.0;
        assert!(vp.zoom_at(Vector2::new(200.0, 150.0), delta));
        assert_eq!(vp.scale(), fill_x);
    }

    #[test]
    fn scale_snap_prefers_closer_axis() {
        // Nearly the inner aspect, so both fill ratios sit inside the threshold.
        let vp = ready((400.0, 300.0), (1300.0, 752.0));
        let inner = vp.inner_rect().unwrap().size;
        let fill = inner / Vector2::new(1300.0, 752.0);

        assert_eq!(vp.adjust_scale(0.2382), fill.x);
        assert_eq!(vp.adjust_scale(0.2379), fill.y);
        // Outside both thresholds: left alone.
        assert_eq!(vp.adjust_scale(0.3), 0.3);
    }

    #[test]
    fn snap_never_leaves_scale_below_min() {
        // Tall source: the height fill sits just under min_scale.
        let mut sizing = ViewportController::new(ViewportConfig::default());
        sizing.on_container_resize(400.0, 300.0).unwrap();
        let inner = sizing.inner_rect().unwrap().size;
        let source = Vector2::new(inner.x, inner.y / 0.495);

        let mut vp = ready((400.0, 300.0), (source.x, source.y));
        let s = vp.snapshot().unwrap();
        assert!(close(s.scale, 1.0, EPS));

        assert!(vp.zoom_at(Vector2::new(200.0, 150.0), -0.9));
        assert!(vp.scale() >= s.min_scale, "scale {} below {}", vp.scale(), s.min_scale);
        assert!(close(vp.scale(), s.min_scale, EPS));
    }

    #[test]
    fn corner_radius_follows_inner_cell_width() {
        let mut vp = ViewportController::new(ViewportConfig::default());
        assert_eq!(vp.corner_radius(), None);
        vp.on_container_resize(400.0, 300.0).unwrap();
        // 310 px across 130 cells, half a cell of rounding.
        assert!(close(vp.corner_radius().unwrap(), 0.5 * 310.0 / 130.0, 1e-9));
    }

    #[test]
    fn no_scale_snap_when_off_center() {
        let mut vp = ready((400.0, 300.0), (1920.0, 1080.0));
        assert!(vp.pan(Vector2::new(50.0, 30.0)));
        let fill_x = vp.inner_rect().unwrap().size.x / 1920.0;
        let candidate = fill_x * 1.002;
        assert_eq!(vp.adjust_scale(candidate), candidate);
    }

    #[test]
    fn pan_twice_equals_double_pan() {
        let mut a = ready((400.0, 300.0), (1920.0, 1080.0));
        let mut b = ready((400.0, 300.0), (1920.0, 1080.0));
        a.pan(Vector2::new(12.0, 7.0));
        a.pan(Vector2::new(12.0, 7.0));
        b.pan(Vector2::new(24.0, 14.0));
        assert!(close(a.offset().x, b.offset().x, 1e-9));
        assert!(close(a.offset().y, b.offset().y, 1e-9));
    }

    #[test]
    fn grid_change_refits_with_new_aspect() {
        let mut vp = ready((400.0, 300.0), (1920.0, 1080.0));
        vp.pan(Vector2::new(60.0, 0.0));
        vp.set_grid_resolution(30, 40).unwrap();
        let s = vp.snapshot().unwrap();
        assert!(close(s.inner_size.x / s.inner_size.y, 0.75, 1e-9));
        let centered = (s.container_size - s.source_size * s.scale) / 2.0;
        assert!(close(s.offset.x, centered.x, EPS));
        assert!(vp.set_grid_resolution(0, 3).is_err());
    }

    #[test]
    fn reset_source_waits_for_next_dimensions() {
        let mut vp = ready((400.0, 300.0), (1920.0, 1080.0));
        vp.reset_source();
        assert_eq!(vp.phase(), ViewportPhase::AwaitingSource);
        assert!(vp.snapshot().is_none());
        vp.on_source_dimensions(Vector2::new(640.0, 480.0)).unwrap();
        assert!(vp.is_ready());
        assert_eq!(vp.snapshot().unwrap().source_size, Vector2::new(640.0, 480.0));
    }

    #[test]
    fn resize_after_fit_recenters_within_bounds() {
        let mut vp = ready((400.0, 300.0), (1920.0, 1080.0));
        vp.pan(Vector2::new(300.0, 0.0));
        vp.on_container_resize(200.0, 150.0).unwrap();
        let s = vp.snapshot().unwrap();
        let max = (s.container_size + s.inner_size) / 2.0;
        assert!(s.offset.x <= max.x + EPS);
    }
}
