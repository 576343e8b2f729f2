//! Capture files: a fixed ASCII signature followed by frames, each prefixed
//! with its length as a little-endian `u32`. A zero length or a record cut
//! short by the end of the file marks the end of the capture.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::CaptureError;
use crate::pmd::RawFrame;

pub const SIGNATURE: &[u8] = b"H10 ECG v1.0 binary data";

const LENGTH_PREFIX: usize = 4;

/// File name for a capture started at `started`, e.g. `hr_data_2023-01-13_11-40-07.bin`.
pub fn capture_file_name(started: DateTime<Utc>) -> String {
    started.format("hr_data_%Y-%m-%d_%H-%M-%S.bin").to_string()
}

pub struct CaptureWriter<W: Write> {
    inner: W,
    frames_written: usize,
}

impl CaptureWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> CaptureWriter<W> {
    /// Writes the signature immediately, so `inner` must be positioned at the
    /// start of a new file.
    pub fn new(mut inner: W) -> Result<Self, CaptureError> {
        inner.write_all(SIGNATURE)?;
        Ok(Self {
            inner,
            frames_written: 0,
        })
    }

    pub fn write(&mut self, frame: &[u8]) -> Result<(), CaptureError> {
        if frame.is_empty() {
            return Err(CaptureError::EmptyFrame);
        }
        let len = u32::try_from(frame.len()).map_err(|_| CaptureError::FrameTooLarge(frame.len()))?;
        self.inner.write_all(&len.to_le_bytes())?;
        self.inner.write_all(frame)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn flush(&mut self) -> Result<(), CaptureError> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(mut self) -> Result<W, CaptureError> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Why a capture stopped yielding frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfCapture {
    /// End of file right after a complete record.
    Clean,
    ZeroLength,
    /// Fewer bytes left than the length prefix (or the prefix itself) needs.
    Truncated { declared: usize, available: usize },
}

/// Lazily yields the frames of a capture in file order.
pub struct CaptureReader<R: Read> {
    inner: R,
    end: Option<EndOfCapture>,
}

impl CaptureReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read> CaptureReader<R> {
    /// Fails with `UnrecognizedFormat` unless the input starts with the signature.
    pub fn new(mut inner: R) -> Result<Self, CaptureError> {
        let mut signature = [0u8; SIGNATURE.len()];
        let read = read_full(&mut inner, &mut signature)?;
        if read < SIGNATURE.len() || signature[..] != *SIGNATURE {
            return Err(CaptureError::UnrecognizedFormat);
        }
        Ok(Self { inner, end: None })
    }

    /// Set once the iterator has returned `None`.
    pub fn end(&self) -> Option<EndOfCapture> {
        self.end
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, CaptureError> {
        let mut prefix = [0u8; LENGTH_PREFIX];
        let read = read_full(&mut self.inner, &mut prefix)?;
        if read == 0 {
            self.end = Some(EndOfCapture::Clean);
            return Ok(None);
        }
        if read < LENGTH_PREFIX {
            self.end = Some(EndOfCapture::Truncated {
                declared: LENGTH_PREFIX,
                available: read,
            });
            return Ok(None);
        }

        let declared = u32::from_le_bytes(prefix) as usize;
        if declared == 0 {
            self.end = Some(EndOfCapture::ZeroLength);
            return Ok(None);
        }

        // `take` keeps a bogus length from allocating up front
        let mut frame = Vec::new();
        (&mut self.inner)
            .take(declared as u64)
            .read_to_end(&mut frame)?;
        if frame.len() < declared {
            self.end = Some(EndOfCapture::Truncated {
                declared,
                available: frame.len(),
            });
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl<R: Read> Iterator for CaptureReader<R> {
    type Item = Result<RawFrame, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.is_some() {
            return None;
        }
        self.next_frame().transpose()
    }
}

fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
