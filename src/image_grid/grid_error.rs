//! Error types relating to the construction and encoding of [`ImageBatch`](crate::image_grid::ImageBatch)es and [`GridImage`](crate::image_grid::GridImage)s

use std::fmt::{self, Formatter};
use std::path::PathBuf;

/// Indicates that an image batch could not be built or a composed grid could
/// not be encoded
#[derive(Debug)]
pub enum GridError {
    /// the dimension list passed to [`ImageBatch::from_dims`](crate::image_grid::ImageBatch::from_dims) had a rank other than 2, 3, or 4.
    /// Rank 2 is read as `[height, width]`, rank 3 as `[channels, height, width]`, and rank 4 as `[count, channels, height, width]`
    BadRank {
        /// the number of dimensions received
        rank: usize,
    },
    /// the channel dimension was something other than 1 (grayscale) or 3 (RGB).
    /// A batch of single-channel images must carry its channel dimension explicitly: `[100, 64, 64]` is rejected rather than guessed at
    BadChannelCount {
        /// the channel count received
        channels: usize,
    },
    /// the pixel buffer length did not match the product of the dimensions
    WrongElementCount {
        /// the element count the dimensions call for
        expected: usize,
        /// the element count received
        actual: usize,
    },
    /// the product of the dimensions does not fit in a `usize`, so no pixel
    /// buffer could match it
    ElementCountOverflow,
    /// a dimension was zero, leaving nothing to compose
    EmptyBatch,
    /// the composed grid could not be PNG-encoded
    PngEncode {
        /// the error reported by the encoder
        source: image::ImageError,
    },
    /// the composed grid could not be written to disk
    Save {
        /// the path that could not be written
        path: PathBuf,
        /// the error reported by the encoder
        source: image::ImageError,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GridError::BadRank { rank } => {
                write!(
                    f,
                    "expected 2, 3, or 4 dimensions ([h,w], [c,h,w], or [n,c,h,w]), got {}",
                    rank
                )
            }
            GridError::BadChannelCount { channels } => {
                write!(f, "expected 1 or 3 channels, got {}", channels)
            }
            GridError::WrongElementCount { expected, actual } => {
                write!(
                    f,
                    "dimensions call for {} pixel values, but {} were provided",
                    expected, actual
                )
            }
            GridError::ElementCountOverflow => {
                write!(
                    f,
                    "dimensions multiply out to more pixel values than a buffer can hold"
                )
            }
            GridError::EmptyBatch => {
                write!(f, "batch contains no pixels")
            }
            GridError::PngEncode { source } => {
                write!(f, "unable to encode grid as PNG: {}", source)
            }
            GridError::Save { path, source } => {
                write!(f, "unable to save grid to {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GridError::PngEncode { source } => Some(source),
            GridError::Save { source, .. } => Some(source),
            _ => None,
        }
    }
}
