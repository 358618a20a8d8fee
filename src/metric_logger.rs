//! Step-counted run logging to TensorBoard-readable event files.
//!
//! A [`MetricLogger`] owns one run directory (`runs/<name>` unless a root is
//! given) and a step counter. Scalars go into the run's event file through
//! [`MetricLogger::record`]; image grids through [`MetricLogger::add_image`];
//! embedding snapshots become the on-disk projector layout through
//! [`MetricLogger::add_embedding`]. Every write is flushed and closed before
//! the call returns, so a value is durable the moment the method hands back
//! control, and a failure propagates to the caller with nothing retried.
//!
//! The step counter has one deliberate quirk, kept from the behavior this
//! logger reproduces: [`MetricLogger::record`] advances the counter by one on
//! every call, *including* calls that supply their own step. Two calls with
//! explicit steps therefore still move the internal counter by two.

pub mod logger_error;
use logger_error::LoggerError;

use crate::event_file::{self, EventFile};
use crate::image_grid::{self, GridOptions, ImageBatch};
use crate::proto::SummaryImage;
use log::debug;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Directory that holds run directories when no root is given.
pub const DEFAULT_RUNS_ROOT: &str = "runs";

/// File at the run-directory root that indexes embedding snapshots for the
/// projector.
pub const PROJECTOR_CONFIG_FILE: &str = "projector_config.pbtxt";

/// A batch of high-dimensional vectors submitted for projection, with
/// optional per-vector labels and thumbnail images.
///
/// `labels` and `images`, when present, must be exactly as long as `vectors`;
/// [`MetricLogger::add_embedding`] checks this and refuses mismatched
/// snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSnapshot {
    /// One row per sample, all the same length.
    pub vectors: Vec<Vec<f32>>,
    /// Optional display label per sample, shown by the projector when
    /// coloring or selecting points.
    pub labels: Option<Vec<String>>,
    /// Optional thumbnail per sample, packed into a sprite sheet for the
    /// projector to draw at each point.
    pub images: Option<ImageBatch>,
}

/// Writes one training run to disk in the format a TensorBoard-style reader
/// consumes.
///
/// Construction creates the run directory and starts its event file; after
/// that the logger holds no open handles. Not safe to share across threads
/// without exterior locking; the counter is plain state.
#[derive(Debug)]
pub struct MetricLogger {
    run_dir: PathBuf,
    event_file: EventFile,
    next_step: i64,
}

impl MetricLogger {
    /// Opens a logger for `runs/<name>`, creating the directory and starting
    /// a fresh event file.
    ///
    /// # Errors
    /// Returns a [`LoggerError`] if the directory or event file cannot be
    /// created.
    pub fn new(name: &str) -> Result<MetricLogger, LoggerError> {
        MetricLogger::with_root(Path::new(DEFAULT_RUNS_ROOT), name)
    }

    /// Opens a logger for `<root>/<name>` instead of the default `runs/`
    /// root.
    ///
    /// # Errors
    /// Returns a [`LoggerError`] if the directory or event file cannot be
    /// created.
    pub fn with_root(root: &Path, name: &str) -> Result<MetricLogger, LoggerError> {
        let run_dir = root.join(name);
        let event_file = EventFile::create(&run_dir).map_err(|e| io_error(&run_dir, e))?;
        debug!("logging run to {}", run_dir.display());
        Ok(MetricLogger {
            run_dir,
            event_file,
            next_step: 0,
        })
    }

    /// The directory this run is written to.
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// The step the next [`record`](MetricLogger::record) call will use if
    /// the caller does not supply one. Starts at 0 and only resets when a new
    /// logger is constructed.
    pub fn next_step(&self) -> i64 {
        self.next_step
    }

    /// Writes one scalar under `tag` and returns the step it was recorded
    /// at.
    ///
    /// With `step` of `None` the internal counter supplies the step. Either
    /// way the counter then advances by one, so interleaving explicit and
    /// implicit steps shifts where later implicit steps land. The scalar is
    /// flushed to disk before this returns.
    ///
    /// # Errors
    /// Returns a [`LoggerError`] if the event file cannot be appended to.
    /// The counter does not advance on failure.
    pub fn record(&mut self, tag: &str, value: f32, step: Option<i64>) -> Result<i64, LoggerError> {
        let resolved = step.unwrap_or(self.next_step);
        self.event_file
            .append(&event_file::scalar_event(tag, value, resolved))
            .map_err(|e| io_error(self.event_file.path(), e))?;
        // the counter moves on every call, explicit step or not
        self.next_step += 1;
        debug!("recorded {} = {} at step {}", tag, value, resolved);
        Ok(resolved)
    }

    /// Composes `batch` into a single grid (default layout: 8 images per
    /// row, 2 pixels of padding) and writes it as a PNG image summary under
    /// `tag` at `step`.
    ///
    /// Does not touch the step counter; only [`record`](MetricLogger::record)
    /// advances it.
    ///
    /// # Errors
    /// Returns a [`LoggerError`] if the grid cannot be encoded or the event
    /// file cannot be appended to.
    pub fn add_image(&mut self, tag: &str, batch: &ImageBatch, step: i64) -> Result<(), LoggerError> {
        let grid = image_grid::make_grid(batch, &GridOptions::default());
        let image = SummaryImage {
            height: grid.height() as i32,
            width: grid.width() as i32,
            colorspace: grid.channels() as i32,
            encoded_image_string: grid.encode_png()?,
        };
        self.event_file
            .append(&event_file::image_event(tag, image, step))
            .map_err(|e| io_error(self.event_file.path(), e))?;
        debug!(
            "added {}x{} image grid under {} at step {}",
            grid.width(),
            grid.height(),
            tag,
            step
        );
        Ok(())
    }

    /// Writes an embedding snapshot in the layout the projector reads.
    ///
    /// Creates `<run dir>/<step zero-padded to 5>/<tag>/` holding
    /// `tensors.tsv` (one tab-separated vector per row), `metadata.tsv` (one
    /// label per row, only when labels are present), and `sprite.png` (a
    /// square sprite sheet, only when images are present), then appends an
    /// `embeddings { ... }` block naming those files to
    /// [`PROJECTOR_CONFIG_FILE`] at the run-directory root.
    ///
    /// Does not touch the step counter.
    ///
    /// # Errors
    /// Returns a [`LoggerError`] if the snapshot is empty, label or image
    /// counts disagree with the vector count, or any of the files cannot be
    /// written.
    pub fn add_embedding(
        &mut self,
        tag: &str,
        snapshot: &EmbeddingSnapshot,
        step: i64,
    ) -> Result<(), LoggerError> {
        let vectors = snapshot.vectors.len();
        if vectors == 0 {
            return Err(LoggerError::EmptyEmbedding);
        }
        if let Some(labels) = &snapshot.labels {
            if labels.len() != vectors {
                return Err(LoggerError::EmbeddingLabelCount {
                    vectors,
                    labels: labels.len(),
                });
            }
        }
        if let Some(images) = &snapshot.images {
            if images.count() != vectors {
                return Err(LoggerError::EmbeddingImageCount {
                    vectors,
                    images: images.count(),
                });
            }
        }

        let subdir = format!("{:05}/{}", step, tag);
        let snapshot_dir = self.run_dir.join(format!("{:05}", step)).join(tag);
        std::fs::create_dir_all(&snapshot_dir).map_err(|e| io_error(&snapshot_dir, e))?;

        let tensors_path = snapshot_dir.join("tensors.tsv");
        write_tsv(&tensors_path, snapshot.vectors.iter().map(|vector| {
            let cells: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
            cells.join("\t")
        }))?;

        if let Some(labels) = &snapshot.labels {
            write_tsv(&snapshot_dir.join("metadata.tsv"), labels.iter().cloned())?;
        }

        if let Some(images) = &snapshot.images {
            image_grid::sprite_sheet(images).save(&snapshot_dir.join("sprite.png"))?;
        }

        self.append_projector_config(tag, snapshot, step, &subdir)?;
        debug!(
            "added {}-vector embedding snapshot under {} at step {}",
            vectors, tag, step
        );
        Ok(())
    }

    // One flat block per snapshot, matching what the projector parses. Paths
    // are written with forward slashes regardless of platform.
    fn append_projector_config(
        &self,
        tag: &str,
        snapshot: &EmbeddingSnapshot,
        step: i64,
        subdir: &str,
    ) -> Result<(), LoggerError> {
        let config_path = self.run_dir.join(PROJECTOR_CONFIG_FILE);
        let mut block = String::new();
        block.push_str("embeddings {\n");
        block.push_str(&format!("tensor_name: \"{}:{:05}\"\n", tag, step));
        block.push_str(&format!("tensor_path: \"{}/tensors.tsv\"\n", subdir));
        if snapshot.labels.is_some() {
            block.push_str(&format!("metadata_path: \"{}/metadata.tsv\"\n", subdir));
        }
        if let Some(images) = &snapshot.images {
            block.push_str("sprite {\n");
            block.push_str(&format!("image_path: \"{}/sprite.png\"\n", subdir));
            block.push_str(&format!("single_image_dim: {}\n", images.width()));
            block.push_str(&format!("single_image_dim: {}\n", images.height()));
            block.push_str("}\n");
        }
        block.push_str("}\n");

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config_path)
            .map_err(|e| io_error(&config_path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(block.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| io_error(&config_path, e))
    }
}

// Open, write every line, flush, close; the same scoped discipline the event
// file uses.
fn write_tsv<I: Iterator<Item = String>>(path: &Path, lines: I) -> Result<(), LoggerError> {
    let file = std::fs::File::create(path).map_err(|e| io_error(path, e))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line).map_err(|e| io_error(path, e))?;
    }
    writer.flush().map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> LoggerError {
    LoggerError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event_file::read_events;
    use crate::proto::{event, summary_value};
    use tempfile::tempdir;
    use test_log::test;

    fn scalar_steps(logger: &MetricLogger) -> Vec<i64> {
        read_events(logger.event_file.path())
            .unwrap()
            .iter()
            .filter(|e| matches!(e.what, Some(event::What::Summary(_))))
            .map(|e| e.step)
            .collect()
    }

    #[test]
    fn test_record_resolves_consecutive_steps() {
        let root = tempdir().unwrap();
        let mut logger = MetricLogger::with_root(root.path(), "loss-run").unwrap();
        assert_eq!(logger.record("loss", 0.42, None).unwrap(), 0);
        assert_eq!(logger.record("loss", 0.37, None).unwrap(), 1);
        assert_eq!(scalar_steps(&logger), vec![0, 1]);
    }

    #[test]
    fn test_explicit_step_still_advances_counter() {
        let root = tempdir().unwrap();
        let mut logger = MetricLogger::with_root(root.path(), "override").unwrap();
        assert_eq!(logger.record("loss", 0.5, None).unwrap(), 0);
        assert_eq!(logger.record("loss", 0.5, Some(100)).unwrap(), 100);
        // the counter moved during the explicit-step call, so the next
        // implicit step is 2, not 1
        assert_eq!(logger.record("loss", 0.5, None).unwrap(), 2);
        assert_eq!(logger.next_step(), 3);
    }

    #[test]
    fn test_record_is_durable_before_return() {
        let root = tempdir().unwrap();
        let mut logger = MetricLogger::with_root(root.path(), "durable").unwrap();
        logger.record("loss", 1.25, None).unwrap();
        // the logger is still alive and holds no open handle; the bytes must
        // already be on disk
        let events = read_events(logger.event_file.path()).unwrap();
        let what = events[1].what.as_ref().unwrap();
        match what {
            event::What::Summary(summary) => {
                assert_eq!(
                    summary.value[0].content,
                    Some(summary_value::Content::SimpleValue(1.25))
                );
            }
            other => panic!("expected a summary, got {:?}", other),
        }
    }

    #[test]
    fn test_add_image_writes_decodable_grid() {
        let root = tempdir().unwrap();
        let mut logger = MetricLogger::with_root(root.path(), "images").unwrap();
        let batch = ImageBatch::from_dims(&[2, 1, 4, 4], vec![0.5; 32]).unwrap();
        logger.add_image("one_batch", &batch, 3).unwrap();
        // image writes leave the scalar counter alone
        assert_eq!(logger.next_step(), 0);

        let events = read_events(logger.event_file.path()).unwrap();
        assert_eq!(events[1].step, 3);
        let what = events[1].what.as_ref().unwrap();
        let image = match what {
            event::What::Summary(summary) => match summary.value[0].content.as_ref().unwrap() {
                summary_value::Content::Image(image) => image,
                other => panic!("expected an image, got {:?}", other),
            },
            other => panic!("expected a summary, got {:?}", other),
        };
        assert_eq!(image.colorspace, 1);
        let decoded = image::load_from_memory(&image.encoded_image_string).unwrap();
        assert_eq!(decoded.height(), image.height as u32);
        assert_eq!(decoded.width(), image.width as u32);
    }

    #[test]
    fn test_add_embedding_rejects_mismatched_labels() {
        let root = tempdir().unwrap();
        let mut logger = MetricLogger::with_root(root.path(), "mismatch").unwrap();
        let snapshot = EmbeddingSnapshot {
            vectors: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            labels: Some(vec!["only one".to_string()]),
            images: None,
        };
        let err = logger.add_embedding("default", &snapshot, 0).unwrap_err();
        assert!(matches!(
            err,
            LoggerError::EmbeddingLabelCount {
                vectors: 2,
                labels: 1
            }
        ));
    }

    #[test]
    fn test_add_embedding_rejects_mismatched_images() {
        let root = tempdir().unwrap();
        let mut logger = MetricLogger::with_root(root.path(), "mismatch").unwrap();
        let snapshot = EmbeddingSnapshot {
            vectors: vec![vec![1.0], vec![2.0], vec![3.0]],
            labels: None,
            images: Some(ImageBatch::from_dims(&[2, 1, 2, 2], vec![0.0; 8]).unwrap()),
        };
        let err = logger.add_embedding("default", &snapshot, 0).unwrap_err();
        assert!(matches!(
            err,
            LoggerError::EmbeddingImageCount {
                vectors: 3,
                images: 2
            }
        ));
    }

    #[test]
    fn test_add_embedding_rejects_empty_snapshot() {
        let root = tempdir().unwrap();
        let mut logger = MetricLogger::with_root(root.path(), "empty").unwrap();
        let snapshot = EmbeddingSnapshot {
            vectors: vec![],
            labels: None,
            images: None,
        };
        let err = logger.add_embedding("default", &snapshot, 0).unwrap_err();
        assert!(matches!(err, LoggerError::EmptyEmbedding));
    }
}
