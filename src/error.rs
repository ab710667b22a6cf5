/// Errors that can end a stage of the capture sequence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Cannot reshape {len} samples into chirps of {chirp_len}, check radar config and capture")]
    Reshape { len: usize, chirp_len: usize },

    #[error("Sensor geometry {rx_channels} x {samples_per_chirp} x {chirps} overflows the sample count")]
    Geometry {
        rx_channels: u64,
        samples_per_chirp: u64,
        chirps: u64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
