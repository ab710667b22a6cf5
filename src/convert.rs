//! Turning raw ADC captures into a text grid
//!
//! The capture has no header, so the layout is whatever the chirp profile said
//! it would be: little-endian `i16` samples, receive channels fastest, then
//! samples within a chirp, then chirps.

use std::{
    fmt::Write as _,
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use byte_slice_cast::AsByteSlice;
use tracing::{info, warn};

use crate::{Error, Result, NUM_CHIRPS, NUM_RX, SAMPLES_PER_CHIRP};

const SAMPLE_SIZE: usize = std::mem::size_of::<i16>();

/// Shape of one capture as configured on the sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub rx_channels: usize,
    pub samples_per_chirp: usize,
    pub chirps: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            rx_channels: NUM_RX,
            samples_per_chirp: SAMPLES_PER_CHIRP,
            chirps: NUM_CHIRPS,
        }
    }
}

impl Geometry {
    /// Samples we expect in a full capture
    pub fn expected_len(&self) -> Result<usize> {
        self.chirp_len()?
            .checked_mul(self.chirps)
            .ok_or_else(|| self.overflow())
    }

    /// Samples in one chirp across all receive channels
    pub fn chirp_len(&self) -> Result<usize> {
        self.rx_channels
            .checked_mul(self.samples_per_chirp)
            .ok_or_else(|| self.overflow())
    }

    fn overflow(&self) -> Error {
        Error::Geometry {
            rx_channels: self.rx_channels as u64,
            samples_per_chirp: self.samples_per_chirp as u64,
            chirps: self.chirps as u64,
        }
    }
}

/// Interpret `bytes` as little-endian `i16`s. A dangling odd byte is dropped.
pub fn decode_samples(bytes: &[u8]) -> Vec<i16> {
    let chunks = bytes.chunks_exact(SAMPLE_SIZE);
    if !chunks.remainder().is_empty() {
        warn!("Ignoring trailing odd byte in capture of {} bytes", bytes.len());
    }
    chunks.map(|b| i16::from_le_bytes([b[0], b[1]])).collect()
}

/// Inverse of [`decode_samples`]
pub fn encode_samples(samples: &[i16]) -> Vec<u8> {
    let le: Vec<i16> = samples.iter().map(|s| s.to_le()).collect();
    le.as_byte_slice().to_vec()
}

/// Samples laid out as (chirp, sample, rx), rx contiguous
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleArray {
    data: Vec<i16>,
    rx_channels: usize,
    samples_per_chirp: usize,
}

impl SampleArray {
    /// Reshape a flat capture. The chirp count comes from the data, so it fails
    /// only on an empty capture or one that isn't a whole number of chirps.
    pub fn reshape(data: Vec<i16>, geometry: &Geometry) -> Result<Self> {
        let chirp_len = geometry.chirp_len()?;
        if chirp_len == 0 || data.is_empty() || data.len() % chirp_len != 0 {
            return Err(Error::Reshape {
                len: data.len(),
                chirp_len,
            });
        }
        Ok(Self {
            data,
            rx_channels: geometry.rx_channels,
            samples_per_chirp: geometry.samples_per_chirp,
        })
    }

    pub fn chirps(&self) -> usize {
        self.data.len() / (self.rx_channels * self.samples_per_chirp)
    }

    pub fn rx_channels(&self) -> usize {
        self.rx_channels
    }

    pub fn samples_per_chirp(&self) -> usize {
        self.samples_per_chirp
    }

    pub fn get(&self, chirp: usize, sample: usize, rx: usize) -> Option<i16> {
        if chirp >= self.chirps() || sample >= self.samples_per_chirp || rx >= self.rx_channels {
            return None;
        }
        let idx = (chirp * self.samples_per_chirp + sample) * self.rx_channels + rx;
        Some(self.data[idx])
    }

    /// One slice of rx values per (chirp, sample), chirp-major
    pub fn rows(&self) -> impl Iterator<Item = &[i16]> {
        self.data.chunks_exact(self.rx_channels)
    }
}

/// Write each row as space separated decimals, one row per line.
/// Returns the number of lines written.
pub fn write_rows<W: Write>(array: &SampleArray, writer: &mut W) -> Result<usize> {
    let mut lines = 0usize;
    let mut line = String::new();
    for row in array.rows() {
        line.clear();
        for (i, v) in row.iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            // Writing into a String can't fail
            let _ = write!(line, "{}", v);
        }
        line.push('\n');
        writer.write_all(line.as_bytes())?;
        lines += 1;
    }
    Ok(lines)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertReport {
    pub samples: usize,
    pub chirps: usize,
    pub rows: usize,
    pub mismatch: bool,
}

/// Convert the capture at `bin` into a text grid at `txt`.
///
/// A sample count that disagrees with `geometry` only warns. A count that can't
/// be reshaped at all is an error, and `txt` is never created.
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
    bin: P,
    txt: Q,
    geometry: &Geometry,
) -> Result<ConvertReport> {
    info!(
        "Converting {} to {}...",
        bin.as_ref().display(),
        txt.as_ref().display()
    );
    let raw = decode_samples(&fs::read(bin.as_ref())?);
    let samples = raw.len();
    let expected = geometry.expected_len()?;
    let mismatch = samples != expected;
    if mismatch {
        warn!("Expected {} samples but got {}", expected, samples);
    }

    let array = SampleArray::reshape(raw, geometry)?;
    info!(
        "{} chirps of {} samples across {} rx channels",
        array.chirps(),
        array.samples_per_chirp(),
        array.rx_channels()
    );

    let mut writer = BufWriter::new(File::create(txt.as_ref())?);
    let rows = write_rows(&array, &mut writer)?;
    writer.flush()?;
    info!("Saved readable data to {}", txt.as_ref().display());

    Ok(ConvertReport {
        samples,
        chirps: array.chirps(),
        rows,
        mismatch,
    })
}
