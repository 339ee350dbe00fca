// Webcam source: opens a camera and hands the sampler RGBA frames.
// Visual expectation: once attached, the container window shows the live
// camera and the LED matrix follows it frame by frame.

use crate::error::{Error, Result};
use crate::source::CaptureSource;

/// Requested capture mode; the camera may pick something close to it.
pub const WEBCAM_WIDTH: u32 = 640;
pub const WEBCAM_HEIGHT: u32 = 480;
pub const WEBCAM_FPS: u32 = 30;

/// Whether this build can open a camera at all.
pub const SUPPORTED: bool = cfg!(feature = "webcam");

#[cfg(feature = "webcam")]
pub use self::nokhwa_backend::WebcamSource;

/// Open camera `index` as a capture source.
#[cfg(feature = "webcam")]
pub fn open_webcam(index: u32) -> Result<Box<dyn CaptureSource>> {
    Ok(Box::new(WebcamSource::new(index, WEBCAM_WIDTH, WEBCAM_HEIGHT)?))
}

/// Built without camera support.
#[cfg(not(feature = "webcam"))]
pub fn open_webcam(_index: u32) -> Result<Box<dyn CaptureSource>> {
    Err(Error::UnsupportedCapability("webcam support not compiled in (feature `webcam`)".into()))
}

#[cfg(feature = "webcam")]
mod nokhwa_backend {
    use super::*;
    use crate::source::SourceKind;
    use image::RgbaImage;
    use log::{info, warn};

    // Bring in nokhwa types for camera control.
    use nokhwa::{
        Camera,
        pixel_format::RgbFormat,
        utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
    };

    // A small wrapper around nokhwa::Camera so the frame loop stays clean.
    pub struct WebcamSource {
        cam: Camera,
        width: u32,
        height: u32,
        streaming: bool,
        current: RgbaImage,
    }

    impl WebcamSource {
        /// Open camera `index` near the requested resolution and start streaming.
        pub fn new(index: u32, width: u32, height: u32) -> Result<Self> {
            // 1) Choose the device (0 = default webcam)
            let idx = CameraIndex::Index(index);

            let fmt = CameraFormat::new(
                Resolution::new(width, height),
                FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
                WEBCAM_FPS,
            );

            // 2) Ask for RGB frames closest to our request.
            let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

            // 3) Create the camera. No device, no permission → unsupported here.
            let mut cam = Camera::new(idx, req)
                .map_err(|e| Error::UnsupportedCapability(format!("create camera: {e}")))?;

            // 4) Start streaming frames from the camera.
            cam.open_stream()
                .map_err(|e| Error::SourceOpen(format!("open stream: {e}")))?;

            // 5) The actual stream might choose a slightly different resolution.
            let actual = cam.resolution();
            info!("webcam {index} streaming at {}x{}", actual.width(), actual.height());

            Ok(Self {
                cam,
                width: actual.width(),
                height: actual.height(),
                streaming: true,
                current: RgbaImage::new(actual.width().max(1), actual.height().max(1)),
            })
        }
    }

    impl CaptureSource for WebcamSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Webcam
        }

        fn natural_size(&self) -> Option<(u32, u32)> {
            (self.width > 0 && self.height > 0).then_some((self.width, self.height))
        }

        /// Grab one frame (blocks until the camera has a new one).
        fn frame(&mut self) -> Result<&RgbaImage> {
            if !self.streaming {
                return Err(Error::SourceFrame("webcam stream stopped".into()));
            }
            let frame = self
                .cam
                .frame()
                .map_err(|e| Error::SourceFrame(format!("fetch frame: {e}")))?;

            // Decode to ImageBuffer<Rgb<u8>> (handles the raw formats for us).
            let rgb = frame
                .decode_image::<RgbFormat>()
                .map_err(|e| Error::SourceFrame(format!("decode RGB: {e}")))?;

            // nokhwa links its own `image` version, so copy raw bytes across.
            let (w, h) = rgb.dimensions();
            let mut rgba = Vec::with_capacity(w as usize * h as usize * 4);
            for px in rgb.as_raw().chunks_exact(3) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
            self.current = RgbaImage::from_raw(w, h, rgba)
                .ok_or_else(|| Error::SourceFrame(format!("short frame for {w}x{h}")))?;
            // Cameras can renegotiate; keep the reported size in step.
            (self.width, self.height) = (w, h);
            Ok(&self.current)
        }

        fn release(&mut self) {
            if !self.streaming {
                return;
            }
            self.streaming = false;
            if let Err(e) = self.cam.stop_stream() {
                warn!("stopping webcam stream: {e}");
            }
        }
    }

    impl Drop for WebcamSource {
        fn drop(&mut self) {
            self.release();
        }
    }
}
