//! Error types relating to [`MetricLogger`](crate::metric_logger::MetricLogger) writes

use crate::image_grid::grid_error::GridError;
use std::fmt::{self, Formatter};
use std::path::PathBuf;

/// Indicates that a logging call could not be completed.
///
/// The logger performs no retries and keeps no partial state: when a call
/// returns this error, nothing past the last successful write is durable, and
/// the step counter has not advanced for the failed call.
#[derive(Debug)]
pub enum LoggerError {
    /// a file or directory under the run directory could not be created,
    /// written, or flushed
    Io {
        /// the path being written when the failure occurred
        path: PathBuf,
        /// the underlying I/O error
        source: std::io::Error,
    },
    /// an image batch could not be composed or encoded for writing
    Grid {
        /// the underlying grid error
        source: GridError,
    },
    /// an embedding snapshot carried a different number of labels than
    /// vectors
    EmbeddingLabelCount {
        /// how many vectors the snapshot holds
        vectors: usize,
        /// how many labels it holds
        labels: usize,
    },
    /// an embedding snapshot carried a different number of images than
    /// vectors
    EmbeddingImageCount {
        /// how many vectors the snapshot holds
        vectors: usize,
        /// how many images it holds
        images: usize,
    },
    /// an embedding snapshot held no vectors, leaving nothing to project
    EmptyEmbedding,
}

impl fmt::Display for LoggerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LoggerError::Io { path, source } => {
                write!(f, "unable to write {}: {}", path.display(), source)
            }
            LoggerError::Grid { source } => {
                write!(f, "unable to compose image batch: {}", source)
            }
            LoggerError::EmbeddingLabelCount { vectors, labels } => {
                write!(
                    f,
                    "embedding snapshot has {} vectors but {} labels",
                    vectors, labels
                )
            }
            LoggerError::EmbeddingImageCount { vectors, images } => {
                write!(
                    f,
                    "embedding snapshot has {} vectors but {} images",
                    vectors, images
                )
            }
            LoggerError::EmptyEmbedding => {
                write!(f, "embedding snapshot holds no vectors")
            }
        }
    }
}

impl std::error::Error for LoggerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoggerError::Io { source, .. } => Some(source),
            LoggerError::Grid { source } => Some(source),
            _ => None,
        }
    }
}

impl From<GridError> for LoggerError {
    fn from(source: GridError) -> Self {
        LoggerError::Grid { source }
    }
}
