use thiserror::Error;

/// Failures of the region-of-interest operations. Every variant aborts the whole operation; invalid
/// (NaN) points are never an error, they are dropped silently during extraction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoiError {
    /// The cloud is not organized (one of its dimensions is `<= 1`)
    #[error("point cloud is not organized (width {width}, height {height})")]
    UnorganizedCloud { width: usize, height: usize },
    /// A mask does not share the resolution of the cloud it is applied to
    #[error("mask resolution {actual:?} does not match cloud resolution {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// The rectangle path addressed a pixel outside of the cloud
    #[error("pixel location ({x}, {y}) is out of range for a {width}x{height} cloud")]
    PixelOutOfRange {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
    /// The transform provider could not supply the transform in time, or the frames are not connected
    #[error("transform from '{source_frame}' to '{target_frame}' is unavailable: {reason}")]
    TransformUnavailable {
        target_frame: String,
        source_frame: String,
        reason: String,
    },
    /// No transform provider was configured
    #[error("transform listener not initialized")]
    TransformListenerUnset,
    /// The mask values do not describe a `width x height` image
    #[error("mask of {width}x{height} pixels holds {len} values")]
    InvalidMask {
        width: usize,
        height: usize,
        len: usize,
    },
    /// The point storage does not describe a `width x height` grid
    #[error("invalid point cloud: {0}")]
    InvalidCloud(String),
}

pub type RoiResult<T> = std::result::Result<T, RoiError>;
