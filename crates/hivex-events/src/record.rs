use crate::proto::Event;
use prost::Message;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const MASK_DELTA: u32 = 0xa282_ead8;
const HEADER_LEN: usize = 12;
const FOOTER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("length checksum mismatch at offset {0}")]
    LengthChecksum(u64),
    #[error("payload checksum mismatch at offset {0}")]
    PayloadChecksum(u64),
    #[error("malformed event at offset {offset}: {source}")]
    Decode {
        offset: u64,
        #[source]
        source: prost::DecodeError,
    },
}

#[derive(Debug, Error)]
#[error("{}: {}", .path.display(), .source)]
pub struct EventFileError {
    pub path: PathBuf,
    #[source]
    pub source: RecordError,
}

pub fn masked_crc32c(data: &[u8]) -> u32 {
    let crc = crc32c::crc32c(data);
    crc.rotate_right(15).wrapping_add(MASK_DELTA)
}

/// Reads length-delimited, checksummed records.
pub struct RecordReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Fills `buf` as far as the input allows and returns the byte count.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut read = 0;
        while read < buf.len() {
            match self.inner.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(read)
    }

    /// Next record payload. A record cut short by end of input ends the
    /// stream, since event files are routinely read while still being written.
    pub fn next_record(&mut self) -> Result<Option<Vec<u8>>, RecordError> {
        let start = self.offset;
        let mut header = [0u8; HEADER_LEN];
        let n = self.fill(&mut header)?;
        if n < HEADER_LEN {
            if n > 0 {
                tracing::debug!(offset = start, "truncated record header");
            }
            return Ok(None);
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&header[..8]);
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&header[8..]);
        if masked_crc32c(&len_bytes) != u32::from_le_bytes(crc_bytes) {
            return Err(RecordError::LengthChecksum(start));
        }
        let len = u64::from_le_bytes(len_bytes) as usize;

        let mut payload = vec![0u8; len];
        if self.fill(&mut payload)? < len {
            tracing::debug!(offset = start, "truncated record payload");
            return Ok(None);
        }
        let mut footer = [0u8; FOOTER_LEN];
        if self.fill(&mut footer)? < FOOTER_LEN {
            tracing::debug!(offset = start, "truncated record footer");
            return Ok(None);
        }
        if masked_crc32c(&payload) != u32::from_le_bytes(footer) {
            return Err(RecordError::PayloadChecksum(start));
        }
        self.offset += (HEADER_LEN + len + FOOTER_LEN) as u64;
        Ok(Some(payload))
    }

    pub fn next_event(&mut self) -> Result<Option<Event>, RecordError> {
        let offset = self.offset;
        match self.next_record()? {
            Some(payload) => Event::decode(payload.as_slice())
                .map(Some)
                .map_err(|source| RecordError::Decode { offset, source }),
            None => Ok(None),
        }
    }
}

pub struct RecordWriter<W: Write> {
    inner: W,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_record(&mut self, payload: &[u8]) -> io::Result<()> {
        let len = (payload.len() as u64).to_le_bytes();
        self.inner.write_all(&len)?;
        self.inner.write_all(&masked_crc32c(&len).to_le_bytes())?;
        self.inner.write_all(payload)?;
        self.inner.write_all(&masked_crc32c(payload).to_le_bytes())
    }

    pub fn write_event(&mut self, event: &Event) -> io::Result<()> {
        self.write_record(&event.encode_to_vec())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// One `simple_value` summary entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarPoint {
    pub step: i64,
    pub tag: String,
    pub value: f32,
}

pub fn read_scalars(path: &Path) -> Result<Vec<ScalarPoint>, EventFileError> {
    let wrap = |source: RecordError| EventFileError {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|e| wrap(e.into()))?;
    let mut reader = RecordReader::new(BufReader::new(file));
    let mut points = Vec::new();
    while let Some(event) = reader.next_event().map_err(wrap)? {
        let Some(summary) = event.summary else {
            continue;
        };
        for value in summary.value {
            if let Some(v) = value.simple_value {
                points.push(ScalarPoint {
                    step: event.step,
                    tag: value.tag,
                    value: v,
                });
            }
        }
    }
    Ok(points)
}

/// Writes an event file holding `file_version` followed by the given scalars.
pub fn write_scalar_file(path: &Path, points: &[ScalarPoint]) -> io::Result<()> {
    let mut writer = RecordWriter::new(BufWriter::new(File::create(path)?));
    writer.write_event(&Event {
        wall_time: 0.0,
        step: 0,
        file_version: Some("brain.Event:2".to_string()),
        summary: None,
    })?;
    for point in points {
        writer.write_event(&Event::scalar(
            point.step,
            point.step as f64,
            &point.tag,
            point.value,
        ))?;
    }
    writer.flush()
}
