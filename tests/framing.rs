use image::{Rgba, RgbaImage};
use led_framer::config::AppConfig;
use led_framer::grid::{PixelGrid, PixelValue};
use led_framer::renderer::MatrixRenderer;
use led_framer::source::{AnimatedClip, StillImage};
use led_framer::{ColorMode, GrayscaleOptions, Vector2, ViewportPhase};
use std::time::Duration;

fn config(grid: (u32, u32)) -> AppConfig {
    AppConfig::from_json(&format!(
        r#"{{ "viewport": {{ "grid_width": {}, "grid_height": {} }} }}"#,
        grid.0, grid.1
    ))
    .unwrap()
}

// Left half red, right half blue.
fn split_image(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, _| if x < w / 2 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 255]) })
}

#[test]
fn still_image_lands_on_the_matrix() {
    let cfg = config((4, 2));
    let mut renderer = MatrixRenderer::new(&cfg);
    let mut grid = PixelGrid::new(4, 2, cfg.matrix.clone());

    renderer.attach(Box::new(StillImage::new(split_image(200, 100))));
    renderer.container_resized(400.0, 300.0);
    let buffer = renderer.tick(Duration::ZERO).expect("fitted source samples");
    grid.apply(buffer).unwrap();

    // Cover fit on a 2:1 source and 2:1 box: columns split exactly in half.
    assert_eq!(grid.cell(0, 0), Some(PixelValue::Rgb([255, 0, 0])));
    assert_eq!(grid.cell(1, 0), Some(PixelValue::Rgb([255, 0, 0])));
    assert_eq!(grid.cell(0, 3), Some(PixelValue::Rgb([0, 0, 255])));
    assert_eq!(grid.cell(1, 3), Some(PixelValue::Rgb([0, 0, 255])));
}

#[test]
fn panning_past_the_edge_reveals_blank_cells() {
    let cfg = config((4, 2));
    let mut renderer = MatrixRenderer::new(&cfg);
    renderer.attach(Box::new(StillImage::new(split_image(200, 100))));
    renderer.container_resized(400.0, 300.0);
    renderer.tick(Duration::ZERO).unwrap();

    // Drag far right: the clamp stops where the source's left edge meets the
    // box's right edge, so nothing inside the box is covered.
    assert!(renderer.pan(Vector2::new(10_000.0, 0.0)));
    renderer.set_mode(ColorMode::Grayscale);
    renderer.set_grayscale_options(GrayscaleOptions::plain());
    let buffer = renderer.tick(Duration::ZERO).unwrap();
    assert_eq!(buffer.channels, 1);
    // Blank pixels read as black without inversion.
    assert_eq!(buffer.data[0], 0);
    assert_eq!(buffer.data[4], 0);
}

#[test]
fn resize_before_and_after_source_both_fit() {
    let cfg = config((16, 9));
    let mut a = MatrixRenderer::new(&cfg);
    a.container_resized(1280.0, 720.0);
    a.tick(Duration::ZERO);
    assert_eq!(a.viewport().phase(), ViewportPhase::AwaitingSource);
    a.attach(Box::new(StillImage::new(split_image(640, 480))));
    a.tick(Duration::ZERO).unwrap();

    let mut b = MatrixRenderer::new(&cfg);
    b.attach(Box::new(StillImage::new(split_image(640, 480))));
    b.container_resized(1280.0, 720.0);
    b.tick(Duration::ZERO).unwrap();

    assert_eq!(a.viewport().scale(), b.viewport().scale());
    assert_eq!(a.viewport().offset(), b.viewport().offset());
}

#[test]
fn clip_playback_and_scrub() {
    let frames = (0..4u8)
        .map(|i| (RgbaImage::from_pixel(8, 8, Rgba([i * 60, 0, 0, 255])), Duration::from_millis(100)))
        .collect();
    let cfg = config((2, 2));
    let mut renderer = MatrixRenderer::new(&cfg);
    renderer.attach(Box::new(AnimatedClip::from_frames(frames).unwrap()));
    renderer.container_resized(100.0, 100.0);

    let first = renderer.tick(Duration::ZERO).unwrap();
    assert_eq!(first.data[0], 0);

    let second = renderer.tick(Duration::from_millis(150)).unwrap();
    assert_eq!(second.data[0], 60);

    renderer.toggle_playback();
    let paused = renderer.tick(Duration::from_millis(500)).unwrap();
    assert_eq!(paused.data[0], 60);

    renderer.scrub_by(0.5);
    let scrubbed = renderer.tick(Duration::ZERO).unwrap();
    assert_eq!(scrubbed.data[0], 180);
    assert!(renderer.playback_progress().unwrap() > 0.5);
}
