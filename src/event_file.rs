//! Append-only event files in the TensorBoard on-disk format.
//!
//! A run directory holds one or more files named
//! `events.out.tfevents.<seconds>.<pid>`. Each file is a sequence of framed
//! records; each record is a length header, a checksum of the header, a
//! protobuf-encoded [`Event`], and a checksum of the payload. Checksums are
//! CRC-32C, rotated and offset the way TensorFlow masks CRCs of CRC-bearing
//! data. The first record of every file identifies the format version, and
//! every later record carries a [`Summary`](crate::proto::Summary).
//!
//! [`EventFile`] holds no open file handle. Every append opens the file,
//! writes one record, flushes, and closes, so each recorded value is durable
//! on disk before the call returns and a crash mid-run loses at most the
//! record being written.

use crate::proto::{event, summary_value, Event, Summary, SummaryImage, SummaryValue};
use log::trace;
use prost::Message;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Format marker carried by the first record of every event file.
pub const FILE_VERSION: &str = "brain.Event:2";

/// Prefix shared by every event file name.
pub const FILE_PREFIX: &str = "events.out.tfevents";

const CRC_MASK_DELTA: u32 = 0xa282_ead8;

/// One event file inside a run directory.
///
/// Created with [`EventFile::create`], which also writes the leading
/// version record so the file is valid from the moment it exists.
#[derive(Debug, Clone)]
pub struct EventFile {
    path: PathBuf,
}

impl EventFile {
    /// Creates a run directory (and any missing parents) and starts a new
    /// event file inside it, named after the current wall-clock second and
    /// this process id.
    ///
    /// The version record is written immediately, so readers pointed at the
    /// directory recognize the file before any value is recorded.
    pub fn create(run_dir: &Path) -> io::Result<EventFile> {
        std::fs::create_dir_all(run_dir)?;
        let file_name = format!(
            "{}.{}.{}",
            FILE_PREFIX,
            chrono::Local::now().timestamp(),
            std::process::id()
        );
        let event_file = EventFile {
            path: run_dir.join(file_name),
        };
        event_file.append(&version_event())?;
        Ok(event_file)
    }

    /// The full path of this event file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one event as a framed record.
    ///
    /// Opens the file, writes, flushes, and closes before returning. Any
    /// failure leaves the file untouched past its previous complete record,
    /// except a failure mid-write, which can leave one trailing partial
    /// record that readers reject by checksum.
    pub fn append(&self, event: &Event) -> io::Result<()> {
        let payload = event.encode_to_vec();
        trace!(
            "appending {}-byte record to {}",
            payload.len(),
            self.path.display()
        );
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        write_record(&mut writer, &payload)?;
        writer.flush()?;
        Ok(())
    }
}

/// Builds the version-marker event that leads every file.
pub fn version_event() -> Event {
    Event {
        wall_time: wall_time_now(),
        step: 0,
        what: Some(event::What::FileVersion(FILE_VERSION.to_string())),
    }
}

/// Builds an event holding one scalar point for `tag`, stamped with the
/// current wall time.
pub fn scalar_event(tag: &str, value: f32, step: i64) -> Event {
    summary_event(
        step,
        SummaryValue {
            tag: tag.to_string(),
            content: Some(summary_value::Content::SimpleValue(value)),
        },
    )
}

/// Builds an event holding one encoded image for `tag`, stamped with the
/// current wall time.
pub fn image_event(tag: &str, image: SummaryImage, step: i64) -> Event {
    summary_event(
        step,
        SummaryValue {
            tag: tag.to_string(),
            content: Some(summary_value::Content::Image(image)),
        },
    )
}

fn summary_event(step: i64, value: SummaryValue) -> Event {
    Event {
        wall_time: wall_time_now(),
        step,
        what: Some(event::What::Summary(Summary { value: vec![value] })),
    }
}

fn wall_time_now() -> f64 {
    chrono::Local::now().timestamp_micros() as f64 / 1e6
}

/// Reads back every event in a file, validating both checksums of every
/// record. Fails with [`ErrorKind::InvalidData`] on a corrupt or truncated
/// record.
pub fn read_events(path: &Path) -> io::Result<Vec<Event>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    loop {
        let mut header = [0u8; 8];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
        expect_crc(&mut reader, &header, "length checksum mismatch")?;
        let mut payload = vec![0u8; u64::from_le_bytes(header) as usize];
        reader.read_exact(&mut payload)?;
        expect_crc(&mut reader, &payload, "payload checksum mismatch")?;
        let event = Event::decode(payload.as_slice())
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
        events.push(event);
    }
    Ok(events)
}

/// Lists the event files directly inside `run_dir`, sorted by name, which
/// orders them by creation second.
pub fn event_files_in(run_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(run_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(FILE_PREFIX))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn write_record<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let header = (payload.len() as u64).to_le_bytes();
    writer.write_all(&header)?;
    writer.write_all(&masked_crc32c(&header).to_le_bytes())?;
    writer.write_all(payload)?;
    writer.write_all(&masked_crc32c(payload).to_le_bytes())?;
    Ok(())
}

fn expect_crc<R: Read>(reader: &mut R, data: &[u8], context: &str) -> io::Result<()> {
    let mut stored = [0u8; 4];
    reader.read_exact(&mut stored)?;
    if u32::from_le_bytes(stored) != masked_crc32c(data) {
        return Err(io::Error::new(ErrorKind::InvalidData, context));
    }
    Ok(())
}

// TensorFlow stores CRCs rotated and offset so that a CRC computed over
// bytes that themselves contain CRCs stays well distributed.
fn masked_crc32c(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
        .rotate_right(15)
        .wrapping_add(CRC_MASK_DELTA)
}
