//! Error types relating to [`LivePlotClient`](crate::live_plot::LivePlotClient) sends

use crate::image_grid::grid_error::GridError;
use std::fmt::{self, Formatter};

/// Indicates that a plotting call did not reach the server or was refused by
/// it.
///
/// The client performs no retries: a failed call leaves the per-series point
/// indices exactly as they were, and the error carries whatever the transport
/// reported.
#[derive(Debug)]
pub enum PlotError {
    /// the request could not be delivered (connection refused, timeout,
    /// malformed base URL)
    Transport {
        /// the underlying HTTP client error
        source: reqwest::Error,
    },
    /// the server answered with a non-success status
    ServerStatus {
        /// the HTTP status code returned
        status: u16,
    },
    /// an image batch could not be composed or encoded for sending
    Grid {
        /// the underlying grid error
        source: GridError,
    },
}

impl fmt::Display for PlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PlotError::Transport { source } => {
                write!(f, "unable to reach plotting server: {}", source)
            }
            PlotError::ServerStatus { status } => {
                write!(f, "plotting server refused the write with status {}", status)
            }
            PlotError::Grid { source } => {
                write!(f, "unable to compose image batch: {}", source)
            }
        }
    }
}

impl std::error::Error for PlotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlotError::Transport { source } => Some(source),
            PlotError::Grid { source } => Some(source),
            PlotError::ServerStatus { .. } => None,
        }
    }
}

impl From<reqwest::Error> for PlotError {
    fn from(source: reqwest::Error) -> Self {
        PlotError::Transport { source }
    }
}

impl From<GridError> for PlotError {
    fn from(source: GridError) -> Self {
        PlotError::Grid { source }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_plot_error_send() {
        fn assert_send<T: Send>() {}
        assert_send::<PlotError>();
    }

    #[test]
    fn test_plot_error_sync() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<PlotError>();
    }
}
