//! Pcap recording sink.
//!
//! Records relayed frames as a pcap stream served through a named pipe, so
//! standard analysis tools can consume the capture live (`wireshark -k -i
//! <path>`, `tcpdump -r <path>`) without the relay ever touching a regular
//! file.

use std::ffi::CString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::TempDir;
use tracing::info;

use crate::error::SinkError;
use crate::pcap::{FileHeader, RecordHeader};
use crate::sink::CaptureSink;

/// Sink that appends pcap records to a fifo.
///
/// Construction blocks until a reader attaches to the fifo. This is a
/// deliberate rendezvous: the relay does not start consuming datagrams
/// until someone is there to see the capture. The fifo path is logged
/// before the blocking open so the operator knows where to attach.
#[derive(Debug)]
pub struct PcapSink {
    writer: File,
    path: PathBuf,
    name: String,
    /// Backing directory for fifos created by `new`. Removed best-effort
    /// on drop.
    dir: Option<TempDir>,
}

impl PcapSink {
    /// Create a fifo in a fresh uniquely-named temporary directory and
    /// wait for a reader.
    pub fn new() -> Result<Self, SinkError> {
        let dir = tempfile::Builder::new()
            .prefix("udptap-")
            .tempdir()
            .map_err(SinkError::CaptureDir)?;

        let mut sink = Self::at_path(&dir.path().join("frames.pcap"))?;
        sink.dir = Some(dir);
        Ok(sink)
    }

    /// Create a fifo at an explicit path and wait for a reader.
    ///
    /// The parent directory must already exist and outlive the sink; only
    /// the fifo itself is unlinked on drop. The pcap global header is
    /// written as soon as the reader attaches.
    pub fn at_path(path: &Path) -> Result<Self, SinkError> {
        mkfifo(path).map_err(|e| SinkError::FifoCreate {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            "created pcap fifo at {}, waiting for a reader",
            path.display()
        );

        // Blocks until the read end opens.
        let mut writer = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| SinkError::FifoOpen {
                path: path.to_path_buf(),
                source: e,
            })?;

        let name = path.to_string_lossy().into_owned();
        writer
            .write_all(&FileHeader::ethernet().to_bytes())
            .map_err(|e| SinkError::Write {
                name: name.clone(),
                source: e,
            })?;

        info!("pcap reader attached on {}", path.display());

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            name,
            dir: None,
        })
    }

    fn write_record_part(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.writer.write_all(bytes).map_err(|e| SinkError::Write {
            name: self.name.clone(),
            source: e,
        })
    }
}

impl CaptureSink for PcapSink {
    fn consume(&mut self, frame: &[u8]) -> Result<(), SinkError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let header =
            RecordHeader::for_frame(now.as_secs() as u32, now.subsec_micros(), frame.len() as u32);

        // Header and frame form one logical record. A failure on either
        // write leaves the stream unusable for any correct reader, so both
        // are terminal.
        self.write_record_part(&header.to_bytes())?;
        self.write_record_part(frame)?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for PcapSink {
    fn drop(&mut self) {
        // Best-effort teardown: the write end closes with `writer`, the
        // backing directory with `dir`. Leak rather than panic on failure.
        let _ = fs::remove_file(&self.path);
    }
}

fn mkfifo(path: &Path) -> io::Result<()> {
    use std::os::unix::ffi::OsStrExt;

    let cpath = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    if unsafe { libc::mkfifo(cpath.as_ptr(), 0o600) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcap::{FILE_HEADER_LEN, RECORD_HEADER_LEN};
    use std::io::Read;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn wait_for_fifo(path: &Path) {
        for _ in 0..400 {
            if path.exists() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("fifo was never created at {}", path.display());
    }

    fn read_u32(buf: &[u8]) -> u32 {
        u32::from_ne_bytes(buf.try_into().unwrap())
    }

    #[test]
    fn records_frames_through_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.pcap");

        let fifo_path = path.clone();
        let writer = thread::spawn(move || {
            let mut sink = PcapSink::at_path(&fifo_path).unwrap();
            assert_eq!(sink.name(), fifo_path.to_string_lossy());
            for (len, fill) in [(14usize, 0xAAu8), (46, 0xBB), (1500, 0xCC)] {
                sink.consume(&vec![fill; len]).unwrap();
            }
        });

        wait_for_fifo(&path);
        let mut stream = Vec::new();
        File::open(&path).unwrap().read_to_end(&mut stream).unwrap();
        writer.join().unwrap();

        assert_eq!(
            &stream[..FILE_HEADER_LEN],
            FileHeader::ethernet().to_bytes().as_slice()
        );

        let mut offset = FILE_HEADER_LEN;
        for (len, fill) in [(14usize, 0xAAu8), (46, 0xBB), (1500, 0xCC)] {
            let header = &stream[offset..offset + RECORD_HEADER_LEN];
            assert_eq!(read_u32(&header[8..12]) as usize, len); // incl_len
            assert_eq!(read_u32(&header[12..16]) as usize, len); // orig_len
            offset += RECORD_HEADER_LEN;
            assert!(stream[offset..offset + len].iter().all(|&b| b == fill));
            offset += len;
        }
        // Records tile the entire remaining stream.
        assert_eq!(offset, stream.len());

        // The fifo was unlinked when the sink dropped.
        assert!(!path.exists());
    }

    #[test]
    fn detached_reader_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.pcap");

        let (wrote_tx, wrote_rx) = mpsc::channel();
        let (closed_tx, closed_rx) = mpsc::channel::<()>();

        let fifo_path = path.clone();
        let writer = thread::spawn(move || {
            let mut sink = PcapSink::at_path(&fifo_path).unwrap();
            sink.consume(&[0u8; 14]).unwrap();
            wrote_tx.send(()).unwrap();
            closed_rx.recv().unwrap();

            let err = sink.consume(&[0u8; 14]).unwrap_err();
            assert!(matches!(err, SinkError::Write { .. }));
        });

        wait_for_fifo(&path);
        let reader = File::open(&path).unwrap();
        wrote_rx.recv().unwrap();
        drop(reader);
        closed_tx.send(()).unwrap();
        writer.join().unwrap();
    }

    #[test]
    fn fifo_creation_fails_on_missing_directory() {
        let err = PcapSink::at_path(Path::new("/nonexistent/dir/test.pcap")).unwrap_err();
        assert!(matches!(err, SinkError::FifoCreate { .. }));
    }
}
