use std::time::Duration;

use args::{convert_filter, Args, Stage};
use clap::Parser;
use radar_snap::{
    capture::capture_to_file,
    config::{open_serial, send_config},
    convert::{convert_file, Geometry},
    Error, DIRECTIVE_DELAY_MS,
};
use tracing::{error, info};

mod args;

fn send(args: &Args) -> radar_snap::Result<()> {
    info!("Sending config to radar on {}...", args.serial.device);
    let mut port = open_serial(&args.serial.device, args.serial.baud)?;
    let sent = send_config(
        &args.serial.config,
        &mut port,
        Duration::from_millis(DIRECTIVE_DELAY_MS),
    )?;
    info!("Sent {} directives", sent);
    Ok(())
}

fn capture(args: &Args) -> radar_snap::Result<()> {
    let stats = capture_to_file(args.capture.port, args.capture.window(), &args.capture.bin)?;
    info!(
        "Capture started {} ended after {:?} ({:?})",
        stats.started, stats.elapsed, stats.end
    );
    Ok(())
}

fn convert(args: &Args, geometry: &Geometry) -> radar_snap::Result<()> {
    match convert_file(&args.capture.bin, &args.convert.output, geometry) {
        Ok(report) => {
            info!(
                "Wrote {} rows from {} chirps",
                report.rows, report.chirps
            );
            Ok(())
        }
        // Only this stage is lost, the capture is still on disk
        Err(e @ Error::Reshape { .. }) => {
            error!("{}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn run(args: &Args) -> radar_snap::Result<()> {
    match args.stage.unwrap_or(Stage::Run) {
        Stage::Run => {
            // Catch a bad geometry before touching the radar
            let geometry = args.convert.geometry()?;
            send(args)?;
            capture(args)?;
            convert(args, &geometry)
        }
        Stage::Send => send(args),
        Stage::Capture => capture(args),
        Stage::Convert => convert(args, &args.convert.geometry()?),
    }
}

fn main() -> radar_snap::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(convert_filter(args.verbose.log_level_filter()))
        .init();

    run(&args).map_err(|e| {
        error!("{}", e);
        e
    })
}
