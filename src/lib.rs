#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Run recording and live plotting for training loops.
//!
//! The `runboard` crate gives a training loop two sinks for its metrics. The
//! [`MetricLogger`] writes scalars, image grids, and embedding snapshots into
//! a run directory in the TensorBoard on-disk format, so finished runs can be
//! browsed offline with standard dashboards. The [`LivePlotClient`] streams
//! line plots, image panes, and log text to a running Visdom-style server
//! over HTTP, so a run in progress can be watched from a browser.
//!
//! The two sinks are independent. A loop can use either one alone, or drive
//! both from the same iteration; nothing is shared between them.
//!
//! ## Steps and indices
//! Both sinks keep their own notion of "where are we". The logger holds a
//! step counter that advances on every [`MetricLogger::record`] call and
//! fills in the step whenever the caller passes `None`. The client holds one
//! point index per series name; the index picks between creating a window
//! and appending to it, and advances only when the server acknowledges the
//! write. See the module docs of [`metric_logger`] and [`live_plot`] for the
//! exact rules.
//!
//! # Examples
//! Record a few scalars and read the run back from disk:
//! ```
//! use runboard::event_file;
//! use runboard::MetricLogger;
//!
//! let root = tempfile::tempdir()?;
//! let mut logger = MetricLogger::with_root(root.path(), "mnist-baseline")?;
//!
//! // the logger assigns steps 0, 1, 2, ... unless the caller pins one
//! let first = logger.record("train/loss", 2.31, None)?;
//! let second = logger.record("train/loss", 1.98, None)?;
//! assert_eq!((first, second), (0, 1));
//!
//! let files = event_file::event_files_in(logger.run_dir())?;
//! let events = event_file::read_events(&files[0])?;
//! // one file-version record, then one event per scalar
//! assert_eq!(events.len(), 3);
//! assert_eq!(events[2].step, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Stream a loss curve to a plotting server. Here the wire is a stand-in
//! transport so the example runs without a server; against a real one this
//! would be `LivePlotClient::new("my-run")?`:
//! ```
//! use runboard::live_plot::plot_error::PlotError;
//! use runboard::live_plot::{PlotEndpoint, PlotTransport};
//! use runboard::LivePlotClient;
//!
//! struct Discard;
//! impl PlotTransport for Discard {
//!     fn send(&self, _: PlotEndpoint, _: &serde_json::Value) -> Result<(), PlotError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut client = LivePlotClient::with_transport("my-run", Discard);
//! for epoch in 0..3 {
//!     let loss = 1.0 / (epoch + 1) as f64;
//!     client.update_loss("demo run", "train", loss, "LOSS")?;
//! }
//! assert_eq!(client.loss_step(), 3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod event_file;
/// Composes image batches into single grid images for image panes, previews,
/// and sprite sheets.
pub mod image_grid;
/// Contains the [`LivePlotClient`] struct, which streams plots to a
/// Visdom-style server over HTTP.
pub mod live_plot;
/// Contains the [`MetricLogger`] struct, which records a run to disk in the
/// TensorBoard event format.
pub mod metric_logger;
pub mod proto;

pub use live_plot::LivePlotClient;
pub use metric_logger::MetricLogger;
