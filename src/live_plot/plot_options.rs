//! Configuration structs for [`LivePlotClient`](crate::live_plot::LivePlotClient) calls.
//!
//! Every option the client recognizes is an explicit field; there is no
//! dynamic keyword passing. Backend options beyond the recognized set go in
//! the `extra` map, whose entries are forwarded to the server unchanged,
//! after (and therefore able to override) the recognized fields.

use serde_json::{json, Map, Value};

/// Options for a line-plot write.
///
/// All fields default to "unset" ([`Default`] produces no legend, no axis
/// labels, no explicit size, and a hidden legend); the window name doubles as
/// the plot title when `title` is unset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlotOptions {
    /// Display name for this trace in the window's legend.
    pub legend: Option<String>,
    /// Plot title. Falls back to the window name when unset.
    pub title: Option<String>,
    /// Label on the horizontal axis.
    pub x_label: Option<String>,
    /// Label on the vertical axis.
    pub y_label: Option<String>,
    /// Canvas width in pixels. The server picks when unset.
    pub width: Option<u32>,
    /// Canvas height in pixels. The server picks when unset.
    pub height: Option<u32>,
    /// Whether the legend box is drawn. Off unless set.
    pub show_legend: bool,
    /// Backend options outside the recognized set, forwarded unchanged.
    pub extra: Map<String, Value>,
}

impl PlotOptions {
    // The server-facing options object. Recognized fields fill their slots
    // first; extras are inserted afterwards and may override them.
    pub(crate) fn to_backend_json(&self, fallback_title: &str) -> Map<String, Value> {
        let mut opts = Map::new();
        opts.insert(
            "title".to_string(),
            json!(self.title.as_deref().unwrap_or(fallback_title)),
        );
        if let Some(legend) = &self.legend {
            opts.insert("legend".to_string(), json!([legend]));
        }
        if let Some(x_label) = &self.x_label {
            opts.insert("xlabel".to_string(), json!(x_label));
        }
        if let Some(y_label) = &self.y_label {
            opts.insert("ylabel".to_string(), json!(y_label));
        }
        if let Some(width) = self.width {
            opts.insert("width".to_string(), json!(width));
        }
        if let Some(height) = self.height {
            opts.insert("height".to_string(), json!(height));
        }
        if self.show_legend {
            opts.insert("showlegend".to_string(), json!(true));
        }
        for (key, value) in &self.extra {
            opts.insert(key.clone(), value.clone());
        }
        opts
    }
}

/// Options for an image-pane write.
///
/// Defaults compose the batch 8 images per row with 2 pixels of padding, no
/// title, and no caption. Callers sending a multi-image single-channel batch
/// should set `nrow` to the row length they want rather than relying on the
/// default being right for their batch size.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    /// Pane title. Falls back to the window name when unset.
    pub title: Option<String>,
    /// Caption drawn under the image.
    pub caption: Option<String>,
    /// Images per grid row.
    pub nrow: usize,
    /// Pixels of blank space around each grid cell.
    pub padding: usize,
    /// Backend options outside the recognized set, forwarded unchanged.
    pub extra: Map<String, Value>,
}

impl Default for ImageOptions {
    /// Returns an ImageOptions struct with the following default values:
    /// * `title`: None
    /// * `caption`: None
    /// * `nrow`: 8
    /// * `padding`: 2
    /// * `extra`: empty
    fn default() -> Self {
        ImageOptions {
            title: None,
            caption: None,
            nrow: crate::image_grid::DEFAULT_NROW,
            padding: crate::image_grid::DEFAULT_PADDING,
            extra: Map::new(),
        }
    }
}

impl ImageOptions {
    pub(crate) fn to_backend_json(&self, fallback_title: &str) -> Map<String, Value> {
        let mut opts = Map::new();
        opts.insert(
            "title".to_string(),
            json!(self.title.as_deref().unwrap_or(fallback_title)),
        );
        for (key, value) in &self.extra {
            opts.insert(key.clone(), value.clone());
        }
        opts
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_window_name_is_fallback_title() {
        let opts = PlotOptions::default().to_backend_json("accuracy");
        assert_eq!(opts["title"], json!("accuracy"));
        assert!(!opts.contains_key("showlegend"));
        assert!(!opts.contains_key("legend"));
    }

    #[test]
    fn test_explicit_title_wins_over_fallback() {
        let opts = PlotOptions {
            title: Some("Held-out accuracy".to_string()),
            ..PlotOptions::default()
        }
        .to_backend_json("accuracy");
        assert_eq!(opts["title"], json!("Held-out accuracy"));
    }

    #[test]
    fn test_recognized_fields_fill_their_slots() {
        let opts = PlotOptions {
            legend: Some("run-1".to_string()),
            x_label: Some("Epoch".to_string()),
            y_label: Some("LOSS".to_string()),
            width: Some(1600),
            height: Some(800),
            show_legend: true,
            ..PlotOptions::default()
        }
        .to_backend_json("loss");
        assert_eq!(opts["legend"], json!(["run-1"]));
        assert_eq!(opts["xlabel"], json!("Epoch"));
        assert_eq!(opts["ylabel"], json!("LOSS"));
        assert_eq!(opts["width"], json!(1600));
        assert_eq!(opts["height"], json!(800));
        assert_eq!(opts["showlegend"], json!(true));
    }

    #[test]
    fn test_extras_pass_through_and_override() {
        let mut extra = Map::new();
        extra.insert("fillarea".to_string(), json!(false));
        extra.insert("title".to_string(), json!("overridden"));
        let opts = PlotOptions {
            title: Some("original".to_string()),
            extra,
            ..PlotOptions::default()
        }
        .to_backend_json("win");
        assert_eq!(opts["fillarea"], json!(false));
        assert_eq!(opts["title"], json!("overridden"));
    }

    #[test]
    fn test_image_options_defaults() {
        let opts = ImageOptions::default();
        assert_eq!(opts.nrow, 8);
        assert_eq!(opts.padding, 2);
        assert_eq!(opts.to_backend_json("input_imgs")["title"], json!("input_imgs"));
    }
}
