//! This module contains all the capture logic

// The capture loop does one thing: take whatever payloads show up on the
// socket and append them to the output, as-is. No framing, no reordering, no
// loss detection. Whatever the network did to the stream ends up in the file.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    net::{Ipv4Addr, UdpSocket},
    path::Path,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::Result;

/// Largest possible UDP payload, so nothing gets truncated
pub const RECV_BUFFER_SIZE: usize = 65_535;

/// Why the capture loop stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureEnd {
    /// The window elapsed between two datagrams
    Deadline,
    /// A receive timed out, nothing arrived for a whole window
    Timeout,
    /// A socket or file error cut the capture short
    Error,
}

#[derive(Clone, Debug)]
pub struct CaptureStats {
    pub started: DateTime<Utc>,
    pub datagrams: usize,
    pub bytes: usize,
    pub elapsed: Duration,
    pub end: CaptureEnd,
}

fn is_timeout(e: &io::Error) -> bool {
    // Unix reports an expired SO_RCVTIMEO as WouldBlock, Windows as TimedOut
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Append every datagram received on `socket` to `out` until `window` has elapsed.
///
/// Each receive blocks for at most `window`, so with a silent peer this returns
/// within two windows. Errors other than the receive timeout are logged and end
/// the capture; whatever was already written stays written.
pub fn capture_udp<W: Write>(socket: &UdpSocket, window: Duration, out: &mut W) -> CaptureStats {
    let started = Utc::now();
    let start = Instant::now();
    let mut stats = CaptureStats {
        started,
        datagrams: 0,
        bytes: 0,
        elapsed: Duration::ZERO,
        end: CaptureEnd::Deadline,
    };
    if window.is_zero() {
        return stats;
    }
    if let Err(e) = socket.set_read_timeout(Some(window)) {
        error!("UDP capture failed: {}", e);
        stats.end = CaptureEnd::Error;
        return stats;
    }
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    while start.elapsed() < window {
        let n = match socket.recv_from(&mut buf) {
            Ok((n, addr)) => {
                debug!("{} bytes from {}", n, addr);
                n
            }
            Err(e) if is_timeout(&e) => {
                stats.end = CaptureEnd::Timeout;
                break;
            }
            Err(e) => {
                error!("UDP capture failed: {}", e);
                stats.end = CaptureEnd::Error;
                break;
            }
        };
        if let Err(e) = out.write_all(&buf[..n]) {
            error!("UDP capture failed: {}", e);
            stats.end = CaptureEnd::Error;
            break;
        }
        stats.datagrams += 1;
        stats.bytes += n;
    }
    stats.elapsed = start.elapsed();
    stats
}

/// Bind `port` on all interfaces and capture into a fresh file at `path`
pub fn capture_to_file<P: AsRef<Path>>(
    port: u16,
    window: Duration,
    path: P,
) -> Result<CaptureStats> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    info!(
        "Listening for UDP packets on port {} for {}s...",
        port,
        window.as_secs_f32()
    );
    let mut stats = capture_udp(&socket, window, &mut file);
    if let Err(e) = file.flush() {
        error!("UDP capture failed: {}", e);
        stats.end = CaptureEnd::Error;
    }
    info!(
        "Saved {} bytes from {} datagrams to {}",
        stats.bytes,
        stats.datagrams,
        path.as_ref().display()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn local_socket() -> UdpSocket {
        UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap()
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_payloads_concatenated_in_order() {
        let socket = local_socket();
        let addr = socket.local_addr().unwrap();
        let sender = thread::spawn(move || {
            let tx = local_socket();
            for i in 0u8..8 {
                tx.send_to(&[i; 100], addr).unwrap();
            }
        });
        let mut out = Vec::new();
        let stats = capture_udp(&socket, Duration::from_millis(500), &mut out);
        sender.join().unwrap();

        assert_eq!(stats.datagrams, 8);
        assert_eq!(stats.bytes, 800);
        let expected: Vec<u8> = (0u8..8).flat_map(|i| [i; 100]).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_large_datagram_not_truncated() {
        let socket = local_socket();
        let addr = socket.local_addr().unwrap();
        let payload: Vec<u8> = (0..8192).map(|i| (i % 251) as u8).collect();
        let tx = local_socket();
        tx.send_to(&payload, addr).unwrap();
        let mut out = Vec::new();
        capture_udp(&socket, Duration::from_millis(200), &mut out);
        assert_eq!(out, payload);
    }

    #[test]
    fn test_silent_peer_times_out() {
        let socket = local_socket();
        let window = Duration::from_millis(200);
        let mut out = Vec::new();
        let stats = capture_udp(&socket, window, &mut out);
        assert_eq!(stats.end, CaptureEnd::Timeout);
        assert!(out.is_empty());
        // One window of loop plus one receive timeout, with scheduling slack
        assert!(stats.elapsed < 2 * window + Duration::from_millis(300));
    }

    #[test]
    fn test_zero_window() {
        let socket = local_socket();
        let mut out = Vec::new();
        let stats = capture_udp(&socket, Duration::ZERO, &mut out);
        assert_eq!(stats.datagrams, 0);
        assert_eq!(stats.end, CaptureEnd::Deadline);
    }

    #[test]
    fn test_write_error_ends_capture() {
        let socket = local_socket();
        let addr = socket.local_addr().unwrap();
        let tx = local_socket();
        tx.send_to(&[1, 2, 3, 4], addr).unwrap();
        tx.send_to(&[5, 6, 7, 8], addr).unwrap();
        let stats = capture_udp(&socket, Duration::from_secs(2), &mut FullDisk);
        assert_eq!(stats.end, CaptureEnd::Error);
        assert_eq!(stats.datagrams, 0);
        assert!(stats.elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_capture_to_file_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adc_raw.bin");
        // Port 0 gets an ephemeral port nobody is sending to
        let stats = capture_to_file(0, Duration::from_millis(100), &path).unwrap();
        assert_eq!(stats.bytes, 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
