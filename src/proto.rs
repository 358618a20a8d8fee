//! Protobuf messages for the on-disk event format.
//!
//! TensorBoard stores a run as a sequence of length-delimited [`Event`]
//! records. Only the subset of the TensorFlow schema this crate writes is
//! declared here: the file-version marker, scalar summaries, and
//! encoded-image summaries. Tag numbers and field types match the upstream
//! `event.proto` / `summary.proto` definitions, so records produced here are
//! readable by stock TensorBoard, and the structs double as the decoder for
//! this crate's tests.

use prost::Message;

/// One record in an event file: a wall-clock timestamp, a global step, and a
/// payload.
#[derive(Clone, PartialEq, Message)]
pub struct Event {
    /// Seconds since the Unix epoch, fractional part allowed.
    #[prost(double, tag = "1")]
    pub wall_time: f64,

    /// Global step at which this event was recorded.
    #[prost(int64, tag = "2")]
    pub step: i64,

    /// The event payload. The first record of every file carries the
    /// file-version marker; all later records carry summaries.
    #[prost(oneof = "event::What", tags = "3, 5")]
    pub what: Option<event::What>,
}

/// Payload variants for [`Event`].
pub mod event {
    use prost::Oneof;

    /// What an [`Event`](super::Event) carries.
    #[derive(Clone, PartialEq, Oneof)]
    pub enum What {
        /// Format marker, `brain.Event:2` for the current format.
        #[prost(string, tag = "3")]
        FileVersion(String),
        /// One or more tagged values.
        #[prost(message, tag = "5")]
        Summary(super::Summary),
    }
}

/// A set of tagged values recorded together.
#[derive(Clone, PartialEq, Message)]
pub struct Summary {
    /// The values in this summary. This crate writes one value per event.
    #[prost(message, repeated, tag = "1")]
    pub value: Vec<SummaryValue>,
}

/// A single tagged value inside a [`Summary`].
#[derive(Clone, PartialEq, Message)]
pub struct SummaryValue {
    /// User-supplied series name, e.g. `Training/loss`.
    #[prost(string, tag = "1")]
    pub tag: String,

    /// The recorded datum.
    #[prost(oneof = "summary_value::Content", tags = "2, 4")]
    pub content: Option<summary_value::Content>,
}

/// Datum variants for [`SummaryValue`].
pub mod summary_value {
    use prost::Oneof;

    /// What a [`SummaryValue`](super::SummaryValue) holds.
    #[derive(Clone, PartialEq, Oneof)]
    pub enum Content {
        /// A scalar point on a chart.
        #[prost(float, tag = "2")]
        SimpleValue(f32),
        /// An encoded image.
        #[prost(message, tag = "4")]
        Image(super::SummaryImage),
    }
}

/// An encoded image attached to a summary.
#[derive(Clone, PartialEq, Message)]
pub struct SummaryImage {
    /// Image height in pixels.
    #[prost(int32, tag = "1")]
    pub height: i32,

    /// Image width in pixels.
    #[prost(int32, tag = "2")]
    pub width: i32,

    /// Channel count interpretation: 1 for grayscale, 3 for RGB.
    #[prost(int32, tag = "3")]
    pub colorspace: i32,

    /// The image bytes, PNG-encoded by this crate.
    #[prost(bytes, tag = "4")]
    pub encoded_image_string: Vec<u8>,
}
