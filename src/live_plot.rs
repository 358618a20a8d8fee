//! Live line plots, image panes, and text panes on a Visdom-style server.
//!
//! A [`LivePlotClient`] owns a named session (the server-side environment all
//! of its windows live in) and a per-series point index. The first write to a
//! series creates its window (`POST /events` with a full options object);
//! every later write appends to it (`POST /update` with `append: true`).
//! Indices advance only on successful sends, so a failed call can be retried
//! by the caller without skipping a point.
//!
//! The client's surface is a closed set of methods over an explicit
//! [`PlotTransport`] seam; there is no passthrough to arbitrary backend
//! operations. Anything the server offers beyond these methods has to be
//! added here explicitly. The production transport, [`HttpTransport`], is a
//! blocking HTTP client; swapping in another [`PlotTransport`] impl is how
//! the tests watch the wire without a server.
//!
//! Payload shapes, for the curious:
//! - line create: `{"data": [trace], "win", "eid", "opts"}` to `/events`
//! - line append: `{"data": [trace], "win", "eid", "opts", "name"?,
//!   "append": true}` to `/update`
//! - image pane: `{"data": [{"content": {"src": data-URI}, "type": "image"}],
//!   "win", "eid", "opts"}` to `/events`
//! - text pane: `{"data": [{"content": text, "type": "text"}], "win", "eid"}`
//!   to `/events`
//!
//! where a trace is `{"x": [x], "y": [y], "type": "scatter", "mode":
//! "lines", "name"?}`.

pub mod plot_error;
pub mod plot_options;

use crate::image_grid::{self, GridOptions, ImageBatch};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::debug;
use plot_error::PlotError;
use plot_options::{ImageOptions, PlotOptions};
use rustc_hash::FxHashMap;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Server a client talks to when none is given.
pub const DEFAULT_SERVER: &str = "http://localhost:8097";

/// Fixed window that [`LivePlotClient::update_loss`] draws into.
pub const LOSS_WINDOW: &str = "loss";

/// Default window that [`LivePlotClient::log`] appends to.
pub const LOG_WINDOW: &str = "log_text";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a payload is headed on the plotting server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotEndpoint {
    /// Creates a window, or overwrites the window's contents wholesale.
    Events,
    /// Extends an existing window's data in place.
    Update,
}

impl PlotEndpoint {
    /// The URL path of this endpoint under the server's base URL.
    pub fn route(&self) -> &'static str {
        match self {
            PlotEndpoint::Events => "events",
            PlotEndpoint::Update => "update",
        }
    }
}

/// Delivers one payload to one endpoint on the plotting server.
///
/// [`HttpTransport`] is the production implementation. A custom impl stands
/// in for the server wherever holding one is inconvenient; the client treats
/// `Ok(())` as "the server acknowledged the write" and advances its counters
/// accordingly.
pub trait PlotTransport {
    /// Sends `payload` to `endpoint`, blocking until the server acknowledges
    /// or the delivery fails.
    ///
    /// # Errors
    /// Returns a [`PlotError`] if the payload could not be delivered or the
    /// server refused it.
    fn send(&self, endpoint: PlotEndpoint, payload: &Value) -> Result<(), PlotError>;
}

/// Blocking HTTP delivery to a plotting server.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds a transport bound to `base_url` (for example
    /// `http://localhost:8097`).
    ///
    /// # Errors
    /// Returns a [`PlotError`] if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<HttpTransport, PlotError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("runboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpTransport {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The base URL requests are posted under.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl PlotTransport for HttpTransport {
    fn send(&self, endpoint: PlotEndpoint, payload: &Value) -> Result<(), PlotError> {
        let url = format!("{}/{}", self.base_url, endpoint.route());
        let response = self.client.post(&url).json(payload).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlotError::ServerStatus {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// A live plotting session.
///
/// Holds the session name, the per-series point indices, the loss-window
/// step, and the session's accumulated log text. Counters are plain state
/// with no interior locking, so a client belongs to one thread; two clients
/// never share indices even when they write into the same session.
#[derive(Debug)]
pub struct LivePlotClient<T: PlotTransport> {
    env: String,
    transport: T,
    series_index: FxHashMap<String, u64>,
    loss_step: u64,
    log_text: String,
}

impl LivePlotClient<HttpTransport> {
    /// Opens a session named `env` on [`DEFAULT_SERVER`].
    ///
    /// # Errors
    /// Returns a [`PlotError`] if the HTTP transport cannot be constructed.
    /// An unreachable server surfaces on the first write, not here.
    pub fn new(env: &str) -> Result<LivePlotClient<HttpTransport>, PlotError> {
        LivePlotClient::connect(env, DEFAULT_SERVER)
    }

    /// Opens a session named `env` on the server at `base_url`.
    ///
    /// # Errors
    /// Returns a [`PlotError`] if the HTTP transport cannot be constructed.
    pub fn connect(env: &str, base_url: &str) -> Result<LivePlotClient<HttpTransport>, PlotError> {
        Ok(LivePlotClient::with_transport(env, HttpTransport::new(base_url)?))
    }
}

impl<T: PlotTransport> LivePlotClient<T> {
    /// Builds a client over a caller-supplied transport. Counters start at
    /// zero and the log buffer starts empty.
    pub fn with_transport(env: &str, transport: T) -> LivePlotClient<T> {
        LivePlotClient {
            env: env.to_string(),
            transport,
            series_index: FxHashMap::default(),
            loss_step: 0,
            log_text: String::new(),
        }
    }

    /// The session name windows are created under.
    pub fn env(&self) -> &str {
        &self.env
    }

    /// How many points have been successfully written to `name`; 0 for a
    /// series that has never been plotted.
    pub fn series_index(&self, name: &str) -> u64 {
        self.series_index.get(name).copied().unwrap_or(0)
    }

    /// How many points [`update_loss`](LivePlotClient::update_loss) has
    /// successfully written.
    pub fn loss_step(&self) -> u64 {
        self.loss_step
    }

    /// The accumulated log text, exactly as the log window shows it.
    pub fn log_text(&self) -> &str {
        &self.log_text
    }

    /// Rebinds the client to a new session name, keeping every counter and
    /// the log buffer. Series that were mid-append keep appending, now into
    /// windows under the new session.
    pub fn reinit(&mut self, env: &str) -> &mut LivePlotClient<T> {
        debug!("rebinding plot session {} to {}", self.env, env);
        self.env = env.to_string();
        self
    }

    /// Writes the point `(x, y)` to the series `name`.
    ///
    /// The first successful write to a series creates its window; every
    /// later one appends. The options accompany both kinds of write, so a
    /// change between points reaches the server on the next append. On
    /// success the series' index advances by one; on failure it is untouched
    /// and the error propagates, so the decision between create and append
    /// is unchanged when the caller tries again.
    ///
    /// # Errors
    /// Returns a [`PlotError`] if the write could not be delivered or the
    /// server refused it.
    pub fn plot_series(
        &mut self,
        name: &str,
        x: f64,
        y: f64,
        options: &PlotOptions,
    ) -> Result<(), PlotError> {
        let index = self.series_index(name);
        self.send_line(name, x, y, options, index > 0)?;
        *self.series_index.entry(name.to_string()).or_insert(0) += 1;
        Ok(())
    }

    /// Writes `y` to the series `name` with the series' own point count as
    /// x, so repeated calls draw y against 0, 1, 2, ...
    ///
    /// # Errors
    /// Returns a [`PlotError`] if the write could not be delivered or the
    /// server refused it.
    pub fn plot(&mut self, name: &str, y: f64, options: &PlotOptions) -> Result<(), PlotError> {
        let x = self.series_index(name) as f64;
        self.plot_series(name, x, y, options)
    }

    /// Plots several named values at once, each with default options, via
    /// [`plot`](LivePlotClient::plot). Stops at the first failure, leaving
    /// later series unwritten for this round.
    ///
    /// # Errors
    /// Returns a [`PlotError`] if any write could not be delivered or the
    /// server refused it.
    pub fn plot_many(&mut self, series: &[(&str, f64)]) -> Result<(), PlotError> {
        let options = PlotOptions::default();
        for (name, y) in series {
            self.plot(name, *y, &options)?;
        }
        Ok(())
    }

    /// Writes one loss value into the fixed [`LOSS_WINDOW`] at the client's
    /// loss step, with the window's conventional canvas: 1600x800, legend
    /// shown, x-axis labelled `Epoch`, y-axis labelled `y_label`.
    ///
    /// The loss step is its own counter, separate from the series index map;
    /// the window is created on step 0 and appended to on every later step.
    /// On success the step advances by one.
    ///
    /// # Errors
    /// Returns a [`PlotError`] if the write could not be delivered or the
    /// server refused it.
    pub fn update_loss(
        &mut self,
        title: &str,
        legend: &str,
        loss: f64,
        y_label: &str,
    ) -> Result<(), PlotError> {
        let step = self.loss_step;
        let mut extra = Map::new();
        extra.insert("fillarea".to_string(), json!(false));
        let options = PlotOptions {
            legend: Some(legend.to_string()),
            title: Some(title.to_string()),
            x_label: Some("Epoch".to_string()),
            y_label: Some(y_label.to_string()),
            width: Some(1600),
            height: Some(800),
            show_legend: true,
            extra,
        };
        self.send_line(LOSS_WINDOW, step as f64, loss, &options, step > 0)?;
        self.loss_step += 1;
        Ok(())
    }

    /// Shows `batch` as an image pane named `name`, composed into a grid
    /// locally (per the `nrow`/`padding` in `options`) and PNG-encoded
    /// before sending.
    ///
    /// Always a wholesale overwrite of the pane; image panes keep no point
    /// index. Multi-image single-channel batches should pick an `nrow`
    /// rather than trusting the default row length of 8 to suit them.
    ///
    /// # Errors
    /// Returns a [`PlotError`] if the grid cannot be encoded, the write
    /// could not be delivered, or the server refused it.
    pub fn plot_image(
        &self,
        name: &str,
        batch: &ImageBatch,
        options: &ImageOptions,
    ) -> Result<(), PlotError> {
        let grid = image_grid::make_grid(
            batch,
            &GridOptions {
                nrow: options.nrow,
                padding: options.padding,
            },
        );
        let png = grid.encode_png()?;
        let mut content = json!({
            "src": format!("data:image/png;base64,{}", BASE64.encode(&png)),
        });
        if let Some(caption) = &options.caption {
            content["caption"] = json!(caption);
        }
        let payload = json!({
            "data": [{ "content": content, "type": "image" }],
            "win": name,
            "eid": self.env,
            "opts": options.to_backend_json(name),
        });
        self.transport.send(PlotEndpoint::Events, &payload)
    }

    /// Shows several named image batches at once, each with default options,
    /// via [`plot_image`](LivePlotClient::plot_image). Stops at the first
    /// failure, leaving later panes unwritten for this round.
    ///
    /// # Errors
    /// Returns a [`PlotError`] if any grid cannot be encoded, any write
    /// could not be delivered, or the server refused it.
    pub fn plot_image_many(&self, panes: &[(&str, &ImageBatch)]) -> Result<(), PlotError> {
        let options = ImageOptions::default();
        for (name, batch) in panes {
            self.plot_image(name, batch, &options)?;
        }
        Ok(())
    }

    /// Appends a timestamped line to the session's log text and shows the
    /// whole buffer in the default [`LOG_WINDOW`].
    ///
    /// # Errors
    /// Returns a [`PlotError`] if the write could not be delivered or the
    /// server refused it. The entry stays in the buffer either way; the next
    /// successful log delivers it.
    pub fn log(&mut self, info: &str) -> Result<(), PlotError> {
        self.log_to(LOG_WINDOW, info)
    }

    /// Like [`log`](LivePlotClient::log), into a caller-chosen window.
    ///
    /// # Errors
    /// Returns a [`PlotError`] if the write could not be delivered or the
    /// server refused it.
    pub fn log_to(&mut self, win: &str, info: &str) -> Result<(), PlotError> {
        let entry = format!(
            "[{}] {} <br>",
            chrono::Local::now().format("%m%d_%H%M%S"),
            info
        );
        debug!("{}", entry.trim_end());
        self.log_text.push_str(&entry);
        let payload = json!({
            "data": [{ "content": self.log_text, "type": "text" }],
            "win": win,
            "eid": self.env,
        });
        self.transport.send(PlotEndpoint::Events, &payload)
    }

    fn send_line(
        &self,
        win: &str,
        x: f64,
        y: f64,
        options: &PlotOptions,
        append: bool,
    ) -> Result<(), PlotError> {
        let trace = trace_json(x, y, options.legend.as_deref());
        let mut payload = json!({
            "data": [trace],
            "win": win,
            "eid": self.env,
            "opts": options.to_backend_json(win),
        });
        if append {
            payload["append"] = json!(true);
            if let Some(legend) = &options.legend {
                payload["name"] = json!(legend);
            }
            self.transport.send(PlotEndpoint::Update, &payload)
        } else {
            self.transport.send(PlotEndpoint::Events, &payload)
        }
    }
}

fn trace_json(x: f64, y: f64, legend: Option<&str>) -> Value {
    let mut trace = json!({
        "x": [x],
        "y": [y],
        "type": "scatter",
        "mode": "lines",
    });
    if let Some(legend) = legend {
        trace["name"] = json!(legend);
    }
    trace
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Records everything sent through it; cloning shares the record.
    #[derive(Clone, Default)]
    struct RecordingTransport {
        sent: Rc<RefCell<Vec<(PlotEndpoint, Value)>>>,
        fail_next: Rc<Cell<bool>>,
    }

    impl RecordingTransport {
        fn sent(&self) -> Vec<(PlotEndpoint, Value)> {
            self.sent.borrow().clone()
        }
    }

    impl PlotTransport for RecordingTransport {
        fn send(&self, endpoint: PlotEndpoint, payload: &Value) -> Result<(), PlotError> {
            if self.fail_next.replace(false) {
                return Err(PlotError::ServerStatus { status: 500 });
            }
            self.sent.borrow_mut().push((endpoint, payload.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_first_write_creates_then_appends() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        client
            .plot_series("acc", 5.0, 0.9, &PlotOptions::default())
            .unwrap();
        client
            .plot_series("acc", 6.0, 0.91, &PlotOptions::default())
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, PlotEndpoint::Events);
        assert_eq!(sent[0].1["win"], json!("acc"));
        assert_eq!(sent[0].1["eid"], json!("test-env"));
        assert_eq!(sent[0].1["opts"]["title"], json!("acc"));
        assert!(sent[0].1.get("append").is_none());
        assert_eq!(sent[1].0, PlotEndpoint::Update);
        assert_eq!(sent[1].1["append"], json!(true));
        assert_eq!(client.series_index("acc"), 2);
    }

    #[test]
    fn test_appends_carry_current_options() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        let options = PlotOptions {
            title: Some("Accuracy".to_string()),
            ..PlotOptions::default()
        };
        client.plot_series("acc", 0.0, 0.5, &options).unwrap();
        // a tweak between points rides on the append
        let mut extra = Map::new();
        extra.insert("fillarea".to_string(), json!(false));
        let options = PlotOptions { extra, ..options };
        client.plot_series("acc", 1.0, 0.6, &options).unwrap();

        let sent = transport.sent();
        assert_eq!(sent[1].0, PlotEndpoint::Update);
        assert_eq!(sent[1].1["append"], json!(true));
        assert_eq!(sent[1].1["opts"]["title"], json!("Accuracy"));
        assert_eq!(sent[1].1["opts"]["fillarea"], json!(false));
    }

    #[test]
    fn test_series_indices_are_independent() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        client.plot("a", 1.0, &PlotOptions::default()).unwrap();
        client.plot("a", 2.0, &PlotOptions::default()).unwrap();
        client.plot("b", 3.0, &PlotOptions::default()).unwrap();

        assert_eq!(client.series_index("a"), 2);
        assert_eq!(client.series_index("b"), 1);
        // b's first write is still a create despite a's history
        assert_eq!(transport.sent()[2].0, PlotEndpoint::Events);
    }

    #[test]
    fn test_plot_uses_point_count_as_x() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        for y in [0.5, 0.4, 0.3] {
            client.plot("loss", y, &PlotOptions::default()).unwrap();
        }
        let xs: Vec<Value> = transport
            .sent()
            .iter()
            .map(|(_, payload)| payload["data"][0]["x"].clone())
            .collect();
        assert_eq!(xs, vec![json!([0.0]), json!([1.0]), json!([2.0])]);
    }

    #[test]
    fn test_failed_send_leaves_index_untouched() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        transport.fail_next.set(true);
        let err = client
            .plot_series("acc", 0.0, 0.5, &PlotOptions::default())
            .unwrap_err();
        assert!(matches!(err, PlotError::ServerStatus { status: 500 }));
        assert_eq!(client.series_index("acc"), 0);

        // the retry is still a create
        client
            .plot_series("acc", 0.0, 0.5, &PlotOptions::default())
            .unwrap();
        assert_eq!(transport.sent()[0].0, PlotEndpoint::Events);
        assert_eq!(client.series_index("acc"), 1);
    }

    #[test]
    fn test_plot_many_writes_each_series() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        client
            .plot_many(&[("loss", 0.11), ("accuracy", 0.97)])
            .unwrap();
        let sent = transport.sent();
        assert_eq!(sent[0].1["win"], json!("loss"));
        assert_eq!(sent[1].1["win"], json!("accuracy"));
        assert_eq!(client.series_index("loss"), 1);
        assert_eq!(client.series_index("accuracy"), 1);
    }

    #[test]
    fn test_update_loss_canvas_and_append_policy() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        client.update_loss("run A", "train", 0.9, "LOSS").unwrap();
        client.update_loss("run A", "train", 0.7, "LOSS").unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].0, PlotEndpoint::Events);
        assert_eq!(sent[0].1["win"], json!("loss"));
        let opts = &sent[0].1["opts"];
        assert_eq!(opts["width"], json!(1600));
        assert_eq!(opts["height"], json!(800));
        assert_eq!(opts["xlabel"], json!("Epoch"));
        assert_eq!(opts["ylabel"], json!("LOSS"));
        assert_eq!(opts["title"], json!("run A"));
        assert_eq!(opts["legend"], json!(["train"]));
        assert_eq!(opts["showlegend"], json!(true));
        assert_eq!(opts["fillarea"], json!(false));

        assert_eq!(sent[1].0, PlotEndpoint::Update);
        assert_eq!(sent[1].1["data"][0]["x"], json!([1.0]));
        assert_eq!(sent[1].1["opts"]["ylabel"], json!("LOSS"));
        assert_eq!(client.loss_step(), 2);
    }

    #[test]
    fn test_loss_step_is_separate_from_series_map() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        client.update_loss("run A", "train", 0.9, "LOSS").unwrap();
        // a direct series write into the same window keeps its own count
        client
            .plot_series("loss", 0.0, 0.5, &PlotOptions::default())
            .unwrap();
        assert_eq!(transport.sent()[1].0, PlotEndpoint::Events);
        assert_eq!(client.series_index("loss"), 1);
        assert_eq!(client.loss_step(), 1);
    }

    #[test]
    fn test_plot_image_is_always_overwrite() {
        let transport = RecordingTransport::default();
        let client = LivePlotClient::with_transport("test-env", transport.clone());
        let batch = ImageBatch::from_dims(&[2, 1, 2, 2], vec![0.5; 8]).unwrap();
        let options = ImageOptions {
            caption: Some("one batch".to_string()),
            ..ImageOptions::default()
        };
        client.plot_image("input_imgs", &batch, &options).unwrap();
        client.plot_image("input_imgs", &batch, &options).unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].0, PlotEndpoint::Events);
        assert_eq!(sent[1].0, PlotEndpoint::Events);
        let content = &sent[0].1["data"][0]["content"];
        let src = content["src"].as_str().unwrap();
        assert!(src.starts_with("data:image/png;base64,"));
        assert_eq!(content["caption"], json!("one batch"));
        assert_eq!(sent[0].1["data"][0]["type"], json!("image"));
    }

    #[test]
    fn test_plot_image_many_writes_each_pane() {
        let transport = RecordingTransport::default();
        let client = LivePlotClient::with_transport("test-env", transport.clone());
        let bright = ImageBatch::from_dims(&[1, 1, 2, 2], vec![1.0; 4]).unwrap();
        let dark = ImageBatch::from_dims(&[1, 1, 2, 2], vec![0.0; 4]).unwrap();
        client
            .plot_image_many(&[("inputs", &bright), ("outputs", &dark)])
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, PlotEndpoint::Events);
        assert_eq!(sent[0].1["win"], json!("inputs"));
        assert_eq!(sent[1].1["win"], json!("outputs"));
        assert_eq!(sent[1].1["data"][0]["type"], json!("image"));
    }

    #[test]
    fn test_log_accumulates_and_resends_whole_buffer() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        client.log("epoch 1 done").unwrap();
        client.log("epoch 2 done").unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].1["win"], json!("log_text"));
        let second = sent[1].1["data"][0]["content"].as_str().unwrap();
        assert!(second.contains("epoch 1 done <br>"));
        assert!(second.contains("epoch 2 done <br>"));
        assert!(second.starts_with('['));
        assert_eq!(client.log_text(), second);
    }

    #[test]
    fn test_log_keeps_entry_when_send_fails() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        transport.fail_next.set(true);
        assert!(client.log("lost but buffered").is_err());
        assert!(client.log_text().contains("lost but buffered"));
        // the next successful log delivers the buffered entry too
        client.log("second").unwrap();
        let delivered = transport.sent()[0].1["data"][0]["content"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(delivered.contains("lost but buffered"));
    }

    #[test]
    fn test_reinit_renames_session_and_keeps_counters() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("first", transport.clone());
        client.plot("loss", 0.5, &PlotOptions::default()).unwrap();
        client.reinit("second");
        client.plot("loss", 0.4, &PlotOptions::default()).unwrap();

        let sent = transport.sent();
        assert_eq!(sent[1].0, PlotEndpoint::Update);
        assert_eq!(sent[1].1["eid"], json!("second"));
        assert_eq!(client.env(), "second");
        assert_eq!(client.series_index("loss"), 2);
    }

    #[test]
    fn test_legend_names_the_trace() {
        let transport = RecordingTransport::default();
        let mut client = LivePlotClient::with_transport("test-env", transport.clone());
        let options = PlotOptions {
            legend: Some("fold-3".to_string()),
            ..PlotOptions::default()
        };
        client.plot_series("acc", 0.0, 0.9, &options).unwrap();
        client.plot_series("acc", 1.0, 0.92, &options).unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].1["data"][0]["name"], json!("fold-3"));
        // appends carry the trace name at the top level for the server to
        // pick the trace to extend
        assert_eq!(sent[1].1["name"], json!("fold-3"));
    }
}
