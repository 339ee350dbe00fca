// What you SEE now:
// • "Framer" window: the source behind a dimmed surround. The bright rounded
//   box is what ends up on the LEDs.
//   - Drag with Left Mouse to pan, scroll to zoom around the cursor.
//   - Resize the window freely; the box keeps the grid's aspect ratio.
// • "Matrix" window: the sampled grid drawn as round LEDs.
// • Keys: M rgb/gray, I invert, N normalise, B binary, Space play/pause,
//   Left/Right scrub, W webcam, S screen share. ESC quits.

use clap::Parser;
use led_framer::config::{AppConfig, parse_grid};
use led_framer::draw::{Drawer, PlacerView, draw_text_5x7, render_placer};
use led_framer::error::Error;
use led_framer::grid::PixelGrid;
use led_framer::renderer::{MatrixRenderer, describe_open_error};
use led_framer::source::SourceInput;
use led_framer::types::FrameBuffer;
use log::{error, info, warn};
use minifb::Key;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const PLACER_WIDTH: usize = 800;
const PLACER_HEIGHT: usize = 600;
const SCRUB_STEP: f64 = 0.05;
const BOUNDS_FLASH: Duration = Duration::from_millis(200);

/// Frame an image, clip, webcam or screen into an LED pixel grid.
#[derive(Parser, Debug)]
#[command(name = "led-framer", version)]
struct Args {
    /// Still image to frame
    #[arg(long, group = "input")]
    image: Option<PathBuf>,

    /// Animated GIF clip to frame (loops)
    #[arg(long, group = "input")]
    video: Option<PathBuf>,

    /// Webcam to frame; index defaults to 0
    #[arg(long, group = "input", num_args = 0..=1, default_missing_value = "0")]
    webcam: Option<u32>,

    /// Share the primary screen
    #[arg(long, group = "input")]
    screen: bool,

    /// JSON config file; unspecified fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid resolution as WxH, overrides the config file
    #[arg(long)]
    grid: Option<String>,

    /// Start in grayscale mode
    #[arg(long)]
    gray: bool,
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    /* --- Config: file first, then CLI overrides --- */
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(grid) = &args.grid {
        let (w, h) = parse_grid(grid)?;
        config.viewport.grid_width = w;
        config.viewport.grid_height = h;
    }
    if args.gray {
        config.mode = led_framer::ColorMode::Grayscale;
    }
    config.validate()?;

    /* --- Renderer + first source ---
       Visual: nothing is sampled until both the window size and the source
       size are known; the first tick after that fits the source. */
    let mut renderer = MatrixRenderer::new(&config);
    if let Some(path) = args.image {
        renderer.open_image_source(SourceInput::Path(path))?;
    } else if let Some(path) = args.video {
        renderer.open_video_source(SourceInput::Path(path))?;
    } else if args.screen {
        renderer.open_screen_share()?;
    } else {
        let index = args.webcam.unwrap_or(0);
        if let Err(e) = renderer.open_webcam(index) {
            // Keep the windows up; W retries, S tries the screen instead.
            warn!("starting without a source: {}", describe_open_error(&e));
        }
    }

    /* --- Windows + buffers --- */
    let mut grid = PixelGrid::new(
        config.viewport.grid_width as usize,
        config.viewport.grid_height as usize,
        config.matrix.clone(),
    );
    let (mw, mh) = grid.render_size();
    let mut placer = Drawer::new("Framer", PLACER_WIDTH, PLACER_HEIGHT, true)?;
    let mut matrix = Drawer::new("Matrix", mw, mh, false)?;
    let mut placer_fb = FrameBuffer::new(PLACER_WIDTH, PLACER_HEIGHT);
    let mut matrix_fb = FrameBuffer::new(mw, mh);

    /* --- HUD / FPS --- */
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut hud_fps_text = String::from("FPS 0.0");
    let mut last_frame_time = Instant::now();

    let mut last_size = (0, 0);
    let mut drag_from = None;
    let mut last_change: Option<Instant> = None;
    let mut status = String::new();

    /* ------------------------------ Main loop ------------------------------ */
    while placer.is_open() && matrix.is_open() && !placer.esc_pressed() && !matrix.esc_pressed() {
        let now = Instant::now();
        let dt = now - last_frame_time;
        last_frame_time = now;

        /* 1) Window size → container size (coalesced inside the renderer). */
        let size = placer.size();
        if size != last_size && size.0 > 0 && size.1 > 0 {
            last_size = size;
            placer_fb.resize(size.0, size.1);
            renderer.container_resized(size.0 as f64, size.1 as f64);
        }

        /* 2) Pan: left drag moves the source by the mouse delta. */
        let mouse = placer.mouse_pos();
        if placer.left_mouse_down() {
            if let (Some(from), Some(to)) = (drag_from, mouse) {
                if renderer.pan(to - from) {
                    last_change = Some(now);
                }
            }
            drag_from = mouse;
        } else {
            drag_from = None;
        }

        /* 3) Zoom: wheel notches → pixels, anchored at the cursor. */
        if let (Some(notches), Some(at)) = (placer.scroll_y(), mouse) {
            // minifb reports up as positive; the renderer expects down-positive pixels.
            if renderer.wheel(at, -notches * config.wheel_line_pixels) {
                last_change = Some(now);
            }
        }

        /* 4) Keys */
        handle_keys(&placer, &mut renderer, &mut status);

        /* 5) Sample. Visual: the matrix only changes on ticks that produced a buffer. */
        if let Some(buffer) = renderer.tick(dt) {
            let shape = (buffer.width as usize, buffer.height as usize);
            if shape != (grid.cols(), grid.rows()) {
                grid.set_resolution(shape.0, shape.1);
                let (w, h) = grid.render_size();
                matrix_fb.resize(w, h);
            }
            if let Err(e) = grid.apply(buffer) {
                error!("matrix rejected sample: {e}");
            }
        }

        /* 6) Container view: framed source, surround, outlines. */
        let snapshot = renderer.viewport().snapshot();
        let view = PlacerView {
            state: snapshot.as_ref(),
            inner: renderer.viewport().inner_rect(),
            frame: renderer.current_frame(),
            corner_radius: renderer.viewport().corner_radius().unwrap_or(0.0),
            show_bounds: last_change.is_some_and(|t| now.duration_since(t) < BOUNDS_FLASH),
            progress: renderer.playback_progress(),
        };
        render_placer(&mut placer_fb, &view);

        let mode = if renderer.mode().channels() == 3 { "RGB" } else { "GRAY" };
        let (gw, gh) = renderer.grid_resolution();
        let hud = format!("{mode} {gw}X{gh} | {hud_fps_text} {status}");
        draw_text_5x7(&mut placer_fb, 8, 8, &hud, 0x00_FF_FF_FF);

        /* 7) LED matrix view. */
        grid.render(&mut matrix_fb);

        /* 8) Present both windows. */
        placer.present(&placer_fb)?;
        matrix.present(&matrix_fb)?;

        /* 9) FPS counter (log + HUD once per second) */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = frames_this_second as f32 / secs;
            let (ticks, _) = renderer.frame_loop().stats();
            info!("FPS {fps:.1} ({ticks} ticks)");
            hud_fps_text = format!("FPS {fps:.1}");
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    renderer.stop();
    info!("bye");
    Ok(())
}

/// Mode/option toggles and source switching.
fn handle_keys(window: &Drawer, renderer: &mut MatrixRenderer, status: &mut String) {
    if window.pressed_once(Key::M) {
        renderer.set_mode(renderer.mode().toggled());
    }

    let mut gray = renderer.grayscale_options().clone();
    let mut gray_changed = false;
    if window.pressed_once(Key::I) {
        gray.invert = !gray.invert;
        gray_changed = true;
    }
    if window.pressed_once(Key::N) {
        gray.normalise = !gray.normalise;
        gray_changed = true;
    }
    if window.pressed_once(Key::B) {
        gray.binary = !gray.binary;
        gray_changed = true;
    }
    if gray_changed {
        info!("grayscale: invert {} normalise {} binary {}", gray.invert, gray.normalise, gray.binary);
        renderer.set_grayscale_options(gray);
    }

    if window.pressed_once(Key::Space) {
        renderer.toggle_playback();
    }
    if window.pressed_repeat(Key::Left) {
        renderer.scrub_by(-SCRUB_STEP);
    }
    if window.pressed_repeat(Key::Right) {
        renderer.scrub_by(SCRUB_STEP);
    }

    if window.pressed_once(Key::W) {
        *status = match renderer.open_webcam(0) {
            Ok(()) => String::new(),
            Err(e) => describe_open_error(&e).to_ascii_uppercase(),
        };
    }
    if window.pressed_once(Key::S) {
        *status = match renderer.open_screen_share() {
            Ok(()) => String::new(),
            Err(e) => describe_open_error(&e).to_ascii_uppercase(),
        };
    }
}
