pub mod capture;
pub mod config;
pub mod convert;
pub mod error;

pub use error::{Error, Result};

// Set by the sensor's chirp profile
pub const NUM_RX: usize = 4;
pub const SAMPLES_PER_CHIRP: usize = 256;
pub const NUM_CHIRPS: usize = 1;

pub const SERIAL_PORT: &str = "/dev/ttyUSB0";
pub const BAUD: u32 = 115_200;
pub const CFG_FILE: &str = "one_frame.cfg";
/// Time the device needs to digest one directive
pub const DIRECTIVE_DELAY_MS: u64 = 100;

pub const UDP_PORT: u16 = 4098;
pub const CAPTURE_SECS: u64 = 5;
pub const BIN_FILE: &str = "adc_raw.bin";
pub const TXT_FILE: &str = "output.txt";
