//! Streaming the radar configuration over the serial link

use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
    thread,
    time::Duration,
};

use serialport::SerialPort;
use tracing::{debug, info};

use crate::Result;

const COMMENT_MARKER: char = '%';

/// Lines that aren't blank or comments get sent to the device
pub fn is_directive(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with(COMMENT_MARKER)
}

/// Trimmed directives from `reader`, in file order
pub fn directives<R: BufRead>(reader: R) -> impl Iterator<Item = Result<String>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if is_directive(&line) => Some(Ok(line.trim().to_owned())),
        Ok(_) => None,
        Err(e) => Some(Err(e.into())),
    })
}

/// Write every directive from `reader` to `writer`, one `write_all` per line,
/// sleeping `delay` after each so the device can keep up.
///
/// Nothing is read back from the device. Returns how many directives were sent.
pub fn send_directives<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    delay: Duration,
) -> Result<usize> {
    let mut sent = 0usize;
    for directive in directives(reader) {
        let directive = directive?;
        writer.write_all(format!("{}\n", directive).as_bytes())?;
        info!("> {}", directive);
        sent += 1;
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
    writer.flush()?;
    Ok(sent)
}

/// Send the config file at `path` to `writer`
pub fn send_config<P: AsRef<Path>, W: Write>(
    path: P,
    writer: &mut W,
    delay: Duration,
) -> Result<usize> {
    let file = File::open(path.as_ref())?;
    debug!("Opened config {}", path.as_ref().display());
    send_directives(BufReader::new(file), writer, delay)
}

pub fn open_serial(device: &str, baud: u32) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(device, baud)
        .timeout(Duration::from_secs(1))
        .open()?;
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Keeps every individual write so we can count them
    #[derive(Default)]
    struct RecordingWriter {
        writes: Vec<Vec<u8>>,
    }

    impl Write for RecordingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    const CFG: &str = "% header comment\n\
                       sensorStop\n\
                       \n\
                       flushCfg\n\
                       \t% indented comment\n\
                       \x20 dfeDataOutputMode 1  \n\
                       channelCfg 15 7 0\n\
                       \n\
                       % trailing comment\n\
                       sensorStart";

    #[test]
    fn test_is_directive() {
        assert!(is_directive("sensorStart"));
        assert!(is_directive("  lowPower 0 0 "));
        assert!(!is_directive(""));
        assert!(!is_directive("   \t"));
        assert!(!is_directive("% comment"));
        assert!(!is_directive("  %indented"));
    }

    #[test]
    fn test_one_write_per_directive() {
        let mut writer = RecordingWriter::default();
        let sent = send_directives(Cursor::new(CFG), &mut writer, Duration::ZERO).unwrap();
        assert_eq!(sent, 5);
        let expected: Vec<&[u8]> = vec![
            b"sensorStop\n",
            b"flushCfg\n",
            b"dfeDataOutputMode 1\n",
            b"channelCfg 15 7 0\n",
            b"sensorStart\n",
        ];
        assert_eq!(writer.writes, expected);
    }

    #[test]
    fn test_comments_only() {
        let mut writer = RecordingWriter::default();
        let sent =
            send_directives(Cursor::new("%a\n\n   \n%b\n"), &mut writer, Duration::ZERO).unwrap();
        assert_eq!(sent, 0);
        assert!(writer.writes.is_empty());
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let res = send_directives(Cursor::new(CFG), &mut BrokenPipe, Duration::ZERO);
        assert!(matches!(res, Err(crate::Error::Io(_))));
    }

    #[test]
    fn test_send_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CFG.as_bytes()).unwrap();
        let mut out = Vec::new();
        let sent = send_config(file.path(), &mut out, Duration::ZERO).unwrap();
        assert_eq!(sent, 5);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "sensorStop\nflushCfg\ndfeDataOutputMode 1\nchannelCfg 15 7 0\nsensorStart\n"
        );
    }

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let res = send_config(dir.path().join("nope.cfg"), &mut Vec::new(), Duration::ZERO);
        assert!(matches!(res, Err(crate::Error::Io(_))));
    }
}
