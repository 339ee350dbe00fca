// Screen-share source through scap.
// Visual expectation: the container window mirrors the primary display and
// can be panned/zoomed like any other source.

use crate::error::{Error, Result};
use crate::source::CaptureSource;

#[cfg(feature = "screen-share")]
pub fn open_screen_share() -> Result<Box<dyn CaptureSource>> {
    Ok(Box::new(scap_backend::ScreenShare::start()?))
}

/// Built without screen capture.
#[cfg(not(feature = "screen-share"))]
pub fn open_screen_share() -> Result<Box<dyn CaptureSource>> {
    Err(Error::UnsupportedCapability(
        "screen capture not compiled in (feature `screen-share`)".into(),
    ))
}

#[cfg(feature = "screen-share")]
mod scap_backend {
    use super::*;
    use crate::source::SourceKind;
    use image::RgbaImage;
    use log::info;
    use scap::capturer::{Capturer, Options};
    use scap::frame::{Frame, FrameType};

    pub struct ScreenShare {
        capturer: Capturer,
        size: Option<(u32, u32)>,
        running: bool,
        current: RgbaImage,
    }

    impl ScreenShare {
        pub fn start() -> Result<Self> {
            if !scap::is_supported() {
                return Err(Error::UnsupportedCapability("screen capture not supported on this platform".into()));
            }
            if !scap::has_permission() && !scap::request_permission() {
                return Err(Error::UnsupportedCapability("screen capture permission denied".into()));
            }

            let options = Options {
                fps: 30,
                show_cursor: true,
                output_type: FrameType::BGRAFrame,
                ..Default::default()
            };
            let mut capturer = Capturer::build(options)
                .map_err(|e| Error::SourceOpen(format!("build capturer: {e:?}")))?;
            capturer.start_capture();
            info!("screen share started");

            Ok(Self { capturer, size: None, running: true, current: RgbaImage::new(1, 1) })
        }
    }

    impl CaptureSource for ScreenShare {
        fn kind(&self) -> SourceKind {
            SourceKind::ScreenShare
        }

        // Unknown until the first frame arrives.
        fn natural_size(&self) -> Option<(u32, u32)> {
            self.size
        }

        fn frame(&mut self) -> Result<&RgbaImage> {
            if !self.running {
                return Err(Error::SourceFrame("screen share stopped".into()));
            }
            let frame = self
                .capturer
                .get_next_frame()
                .map_err(|e| Error::SourceFrame(format!("next frame: {e}")))?;

            let Frame::BGRA(f) = frame else {
                return Err(Error::SourceFrame("unexpected frame layout".into()));
            };
            let (w, h) = (f.width.max(0) as u32, f.height.max(0) as u32);

            // BGRA → RGBA, forcing opaque alpha.
            let mut rgba = f.data;
            for px in rgba.chunks_exact_mut(4) {
                px.swap(0, 2);
                px[3] = 255;
            }
            self.current = RgbaImage::from_raw(w, h, rgba)
                .ok_or_else(|| Error::SourceFrame(format!("short frame for {w}x{h}")))?;
            self.size = Some((w, h));
            Ok(&self.current)
        }

        fn release(&mut self) {
            if self.running {
                self.running = false;
                self.capturer.stop_capture();
            }
        }
    }

    impl Drop for ScreenShare {
        fn drop(&mut self) {
            self.release();
        }
    }
}
