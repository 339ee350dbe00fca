// One error type for the whole framer.
// Every variant states *where* things went wrong; the frame loop decides
// which ones are worth a log line and which just mean "no pixels this tick".
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Container size was zero, negative or not finite. Previous geometry stays.
    #[error("Invalid geometry: {width} x {height}")]
    InvalidGeometry { width: f64, height: f64 },

    /// Sampling asked for before the source reported usable dimensions.
    #[error("Source not ready")]
    SourceNotReady,

    /// Camera / screen capture not available on this host or build.
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// A value of the wrong shape or range was assigned to the pixel grid.
    #[error("Invalid pixel value: {0}")]
    InvalidPixelValue(String),

    #[error("Source open error: {0}")]
    SourceOpen(String), // decoding / opening a file, camera or display failed

    #[error("Source frame error: {0}")]
    SourceFrame(String), // grabbing / decoding a frame failed

    #[error("Window init error: {0}")]
    WindowInit(String), // creating the window failed

    #[error("Window update error: {0}")]
    WindowUpdate(String), // updating the window buffer failed

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors that only suppress the current tick; the loop keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidGeometry { .. } | Error::SourceNotReady | Error::SourceFrame(_)
        )
    }
}
