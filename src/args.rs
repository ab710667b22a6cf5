//! Argument parsing for running from the command line

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use radar_snap::{
    convert::Geometry, Error, BAUD, BIN_FILE, CAPTURE_SECS, CFG_FILE, NUM_CHIRPS, NUM_RX,
    SAMPLES_PER_CHIRP, SERIAL_PORT, TXT_FILE, UDP_PORT,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Which stage(s) to run, defaults to the whole sequence
    #[clap(subcommand)]
    pub stage: Option<Stage>,
    #[clap(flatten)]
    pub serial: SerialArgs,
    #[clap(flatten)]
    pub capture: CaptureArgs,
    #[clap(flatten)]
    pub convert: ConvertArgs,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Send config, capture, then convert
    Run,
    /// Only send the config to the radar
    Send,
    /// Only capture UDP data
    Capture,
    /// Only convert an existing capture to text
    Convert,
}

#[derive(clap::Args, Debug)]
pub struct SerialArgs {
    /// Serial device the radar's config port is on
    #[clap(long, default_value = SERIAL_PORT)]
    pub device: String,
    #[clap(long, default_value_t = BAUD)]
    pub baud: u32,
    /// Radar config file, one directive per line
    #[clap(short, long, default_value = CFG_FILE)]
    pub config: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct CaptureArgs {
    /// Port to capture UDP data from
    #[clap(short, long, default_value_t = UDP_PORT)]
    pub port: u16,
    /// Capture window in seconds
    #[clap(short, long, default_value_t = CAPTURE_SECS)]
    pub duration: u64,
    /// Raw capture file
    #[clap(short, long, default_value = BIN_FILE)]
    pub bin: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Text output file
    #[clap(short, long, default_value = TXT_FILE)]
    pub output: PathBuf,
    /// Receive channels enabled in the chirp profile
    #[clap(long, default_value_t = NUM_RX as u64)]
    #[clap(value_parser = clap::value_parser!(u64).range(1..))]
    pub rx: u64,
    /// ADC samples per chirp
    #[clap(long, default_value_t = SAMPLES_PER_CHIRP as u64)]
    #[clap(value_parser = clap::value_parser!(u64).range(1..))]
    pub samples: u64,
    /// Chirps per frame
    #[clap(long, default_value_t = NUM_CHIRPS as u64)]
    #[clap(value_parser = clap::value_parser!(u64))]
    pub chirps: u64,
}

impl CaptureArgs {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.duration)
    }
}

impl ConvertArgs {
    /// Sensor geometry from the command line, rejected if the sample count overflows
    pub fn geometry(&self) -> radar_snap::Result<Geometry> {
        let overflow = || Error::Geometry {
            rx_channels: self.rx,
            samples_per_chirp: self.samples,
            chirps: self.chirps,
        };
        let geometry = Geometry {
            rx_channels: usize::try_from(self.rx).map_err(|_| overflow())?,
            samples_per_chirp: usize::try_from(self.samples).map_err(|_| overflow())?,
            chirps: usize::try_from(self.chirps).map_err(|_| overflow())?,
        };
        geometry.expected_len()?;
        Ok(geometry)
    }
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}
