//! Geometry primitives shared by the viewport and the sampler.
//!
//! Sizes, offsets, points and deltas are all `Vector2` in container pixels
//! unless stated otherwise.

/// 2-D vector with component-wise `*` and `/`, `length()` as the norm.
pub type Vector2 = glam::DVec2;

/// An axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: Vector2,
    pub size: Vector2,
}

impl Rect {
    pub fn new(origin: Vector2, size: Vector2) -> Self {
        Self { origin, size }
    }

    pub fn max(&self) -> Vector2 {
        self.origin + self.size
    }

    pub fn contains(&self, p: Vector2) -> bool {
        p.x >= self.origin.x && p.y >= self.origin.y && p.x < self.max().x && p.y < self.max().y
    }
}

/// Largest rectangle of `aspect` (width / height) that fits inside `outer`
/// after shrinking it by `padding × min(outer.x, outer.y)` on every side.
/// The result is centered in `outer`.
pub fn fit_aspect(outer: Vector2, padding: f64, aspect: f64) -> Rect {
    let pad = padding * outer.x.min(outer.y);
    let mut origin = Vector2::splat(pad);
    let mut size = outer - 2.0 * pad;

    if size.x / size.y < aspect {
        // Padded box is too tall: keep width, shrink height.
        origin.y += (size.y - size.x / aspect) / 2.0;
        size.y = size.x / aspect;
    } else {
        origin.x += (size.x - size.y * aspect) / 2.0;
        size.x = size.y * aspect;
    }

    Rect::new(origin, size)
}

/// Scale that makes `content` cover `frame` on both axes.
pub fn cover_ratio(frame: Vector2, content: Vector2) -> f64 {
    let fill = frame / content;
    fill.x.max(fill.y)
}

/// True when both components are finite and strictly positive.
pub fn is_positive(v: Vector2) -> bool {
    v.is_finite() && v.x > 0.0 && v.y > 0.0
}
