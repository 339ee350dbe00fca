//! Frame a picture, clip, camera or screen into a fixed-resolution pixel
//! grid: pan and zoom the source behind an aspect-locked window, then sample
//! what is inside into RGB or grayscale cells.

pub mod camera;
pub mod config;
pub mod draw;
pub mod error;
pub mod gamma;
pub mod geometry;
pub mod grid;
pub mod renderer;
pub mod sampling;
pub mod scheduler;
pub mod screen;
pub mod source;
pub mod types;
pub mod viewport;

pub use config::{AppConfig, GrayscaleOptions, MatrixStyle, ViewportConfig};
pub use error::{Error, Result};
pub use geometry::{Rect, Vector2};
pub use grid::{PixelGrid, PixelValue};
pub use renderer::MatrixRenderer;
pub use source::{CaptureSource, SourceInput, SourceKind};
pub use types::{ColorMode, PixelBuffer};
pub use viewport::{ViewportController, ViewportPhase, ViewportState};
