//! Destinations for decoded IQ samples.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Default file the session appends samples to.
pub const DEFAULT_SAMPLE_FILE: &str = "samples.bin";

/// Receives the samples of each datagram, in order.
pub trait SampleSink: Send {
    fn write_samples(&mut self, samples: &[u32]) -> io::Result<()>;

    /// Push buffered samples to their destination. Called when ingestion stops.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Appends each sample to a file as a 16-bit little-endian value.
///
/// The file is opened in append mode on the first write, so creating a sink
/// for a session that never streams leaves the filesystem untouched. Writes
/// are buffered until [`SampleSink::flush`] or drop.
#[derive(Debug)]
pub struct FileSampleSink {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl FileSampleSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        let writer = match self.file.take() {
            Some(writer) => writer,
            None => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?;
                tracing::debug!(path = %self.path.display(), "opened sample file");
                BufWriter::new(file)
            }
        };
        Ok(self.file.insert(writer))
    }
}

impl Default for FileSampleSink {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_FILE)
    }
}

impl SampleSink for FileSampleSink {
    fn write_samples(&mut self, samples: &[u32]) -> io::Result<()> {
        let writer = self.writer()?;
        for &sample in samples {
            // Samples are decoded at 16 bits; the upper half is always zero.
            writer.write_all(&(sample as u16).to_le_bytes())?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

/// Collects samples in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySampleSink {
    samples: Arc<Mutex<Vec<u32>>>,
}

impl MemorySampleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn samples(&self) -> Vec<u32> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleSink for MemorySampleSink {
    fn write_samples(&mut self, samples: &[u32]) -> io::Result<()> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(samples);
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSampleSink;

impl SampleSink for NullSampleSink {
    fn write_samples(&mut self, _samples: &[u32]) -> io::Result<()> {
        Ok(())
    }
}
