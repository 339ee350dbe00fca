//! Capture sources: anything that can hand the sampler an RGBA frame.
//!
//! Still images and animated clips are decoded with `image`; the webcam and
//! screen-share adapters live in `camera.rs` and `screen.rs`.

use crate::error::{Error, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat, RgbaImage};
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::PathBuf;
use std::time::Duration;

/// Which family a source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Image,
    Video,
    Webcam,
    ScreenShare,
}

/// Where to read an image or clip from.
#[derive(Debug, Clone)]
pub enum SourceInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for SourceInput {
    fn from(p: PathBuf) -> Self {
        SourceInput::Path(p)
    }
}

impl From<Vec<u8>> for SourceInput {
    fn from(b: Vec<u8>) -> Self {
        SourceInput::Bytes(b)
    }
}

/// One active media source.
pub trait CaptureSource {
    fn kind(&self) -> SourceKind;

    /// Natural pixel size, `None` until the source knows it.
    fn natural_size(&self) -> Option<(u32, u32)>;

    /// The frame to draw this tick. Live sources grab a new one here.
    fn frame(&mut self) -> Result<&RgbaImage>;

    /// Stop any hardware stream behind this source. Safe to call twice.
    fn release(&mut self) {}

    /// Move playback forward by `dt`. No-op for sources without a timeline.
    fn advance(&mut self, _dt: Duration) {}

    /// Playback position in 0..=1, for sources with a timeline.
    fn progress(&self) -> Option<f64> {
        None
    }

    fn seek(&mut self, _progress: f64) {}

    fn is_playing(&self) -> bool {
        false
    }

    fn set_playing(&mut self, _playing: bool) {}
}

/// A decoded still image.
pub struct StillImage {
    image: RgbaImage,
}

impl StillImage {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn open(input: &SourceInput) -> Result<Self> {
        let img = match input {
            SourceInput::Path(p) => image::open(p),
            SourceInput::Bytes(b) => image::load_from_memory(b),
        }
        .map_err(|e| Error::SourceOpen(format!("decode image: {e}")))?;
        let image = img.to_rgba8();
        info!("image source {}x{}", image.width(), image.height());
        Ok(Self::new(image))
    }
}

impl CaptureSource for StillImage {
    fn kind(&self) -> SourceKind {
        SourceKind::Image
    }

    fn natural_size(&self) -> Option<(u32, u32)> {
        let (w, h) = self.image.dimensions();
        (w > 0 && h > 0).then_some((w, h))
    }

    fn frame(&mut self) -> Result<&RgbaImage> {
        Ok(&self.image)
    }
}

/// Shortest frame delay honoured; GIFs that ask for 0 ms get this instead.
const MIN_FRAME_DELAY: Duration = Duration::from_millis(20);

/// A looping, seekable animated clip (GIF). Stands in for a video element.
pub struct AnimatedClip {
    frames: Vec<RgbaImage>,
    // Start time of each frame on the timeline.
    starts: Vec<Duration>,
    duration: Duration,
    position: Duration,
    playing: bool,
}

impl AnimatedClip {
    pub fn from_frames(frames: Vec<(RgbaImage, Duration)>) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::SourceOpen("clip has no frames".into()));
        }
        let mut starts = Vec::with_capacity(frames.len());
        let mut images = Vec::with_capacity(frames.len());
        let mut t = Duration::ZERO;
        for (img, delay) in frames {
            starts.push(t);
            t += delay.max(MIN_FRAME_DELAY);
            images.push(img);
        }
        Ok(Self { frames: images, starts, duration: t, position: Duration::ZERO, playing: true })
    }

    pub fn open(input: &SourceInput) -> Result<Self> {
        match input {
            SourceInput::Path(p) => {
                let file = File::open(p)
                    .map_err(|e| Error::SourceOpen(format!("open {}: {e}", p.display())))?;
                Self::decode(BufReader::new(file))
            }
            SourceInput::Bytes(b) => Self::decode(Cursor::new(b.as_slice())),
        }
    }

    fn decode<R: BufRead + Seek>(mut reader: R) -> Result<Self> {
        // Peek at the magic bytes without consuming them.
        let format = image::guess_format(reader.fill_buf()?)?;
        if format != ImageFormat::Gif {
            return Err(Error::SourceOpen(format!("{format:?} is not an animated clip format")));
        }
        let decoder = GifDecoder::new(reader)?;
        let frames = decoder
            .into_frames()
            .collect_frames()?
            .into_iter()
            .map(|f| {
                let (num, den) = f.delay().numer_denom_ms();
                let ms = if den == 0 { 0 } else { num / den };
                (f.into_buffer(), Duration::from_millis(ms as u64))
            })
            .collect();
        let clip = Self::from_frames(frames)?;
        info!("video source: {} frames, {:.2}s", clip.frames.len(), clip.duration.as_secs_f64());
        Ok(clip)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame_index(&self) -> usize {
        // Last frame whose start is <= position.
        self.starts.partition_point(|&s| s <= self.position).saturating_sub(1)
    }
}

impl CaptureSource for AnimatedClip {
    fn kind(&self) -> SourceKind {
        SourceKind::Video
    }

    fn natural_size(&self) -> Option<(u32, u32)> {
        let (w, h) = self.frames[0].dimensions();
        (w > 0 && h > 0).then_some((w, h))
    }

    fn frame(&mut self) -> Result<&RgbaImage> {
        let i = self.frame_index();
        Ok(&self.frames[i])
    }

    fn advance(&mut self, dt: Duration) {
        if !self.playing || self.duration.is_zero() {
            return;
        }
        // Loop forever like an autoplaying muted video.
        let total = self.duration.as_nanos();
        let pos = (self.position.as_nanos() + dt.as_nanos()) % total;
        self.position = Duration::from_nanos(pos as u64);
    }

    fn progress(&self) -> Option<f64> {
        Some(self.position.as_secs_f64() / self.duration.as_secs_f64())
    }

    fn seek(&mut self, progress: f64) {
        let p = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        self.position = self.duration.mul_f64(p).min(self.duration.saturating_sub(Duration::from_nanos(1)));
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba};

    fn solid(v: u8) -> RgbaImage {
        RgbaImage::from_pixel(4, 2, Rgba([v, v, v, 255]))
    }

    fn clip() -> AnimatedClip {
        AnimatedClip::from_frames(vec![
            (solid(10), Duration::from_millis(100)),
            (solid(20), Duration::from_millis(100)),
            (solid(30), Duration::from_millis(200)),
        ])
        .unwrap()
    }

    #[test]
    fn still_image_reports_size() {
        let mut s = StillImage::new(solid(5));
        assert_eq!(s.natural_size(), Some((4, 2)));
        assert_eq!(s.frame().unwrap().get_pixel(0, 0).0, [5, 5, 5, 255]);
        assert_eq!(s.progress(), None);
    }

    #[test]
    fn garbage_bytes_fail_to_open() {
        let err = StillImage::open(&SourceInput::Bytes(vec![1, 2, 3])).err().unwrap();
        assert!(matches!(err, Error::SourceOpen(_)));
    }

    #[test]
    fn clip_advances_and_loops() {
        let mut c = clip();
        assert_eq!(c.duration(), Duration::from_millis(400));
        assert_eq!(c.frame().unwrap().get_pixel(0, 0).0[0], 10);
        c.advance(Duration::from_millis(150));
        assert_eq!(c.frame().unwrap().get_pixel(0, 0).0[0], 20);
        c.advance(Duration::from_millis(100));
        assert_eq!(c.frame().unwrap().get_pixel(0, 0).0[0], 30);
        c.advance(Duration::from_millis(200)); // 450 ms → wraps to 50 ms
        assert_eq!(c.frame().unwrap().get_pixel(0, 0).0[0], 10);
    }

    #[test]
    fn paused_clip_does_not_move() {
        let mut c = clip();
        c.set_playing(false);
        c.advance(Duration::from_secs(1));
        assert_eq!(c.progress(), Some(0.0));
    }

    #[test]
    fn seek_clamps_progress() {
        let mut c = clip();
        c.seek(0.5);
        assert!((c.progress().unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(c.frame().unwrap().get_pixel(0, 0).0[0], 30);
        c.seek(-3.0);
        assert_eq!(c.progress(), Some(0.0));
        c.seek(7.0);
        assert!(c.progress().unwrap() < 1.0);
        assert_eq!(c.frame().unwrap().get_pixel(0, 0).0[0], 30);
    }

    #[test]
    fn empty_clip_is_rejected() {
        assert!(AnimatedClip::from_frames(Vec::new()).is_err());
    }

    #[test]
    fn gif_bytes_decode_to_clip() {
        let mut bytes = Vec::new();
        {
            let mut enc = GifEncoder::new(&mut bytes);
            for v in [0u8, 255] {
                let frame = Frame::from_parts(solid(v), 0, 0, Delay::from_numer_denom_ms(100, 1));
                enc.encode_frame(frame).unwrap();
            }
        }
        let mut c = AnimatedClip::open(&SourceInput::Bytes(bytes)).unwrap();
        assert_eq!(c.frame_count(), 2);
        assert_eq!(c.natural_size(), Some((4, 2)));
        assert_eq!(c.kind(), SourceKind::Video);
        assert!(c.frame().is_ok());
    }

    #[test]
    fn non_gif_is_not_a_clip() {
        let mut png = Vec::new();
        solid(1).write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
        assert!(AnimatedClip::open(&SourceInput::Bytes(png)).is_err());
    }
}
