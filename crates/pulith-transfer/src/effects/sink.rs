//! Response body capture, to memory or to a file.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use super::transport::BodySink;
use crate::data::OutputTarget;

/// Collects the response body for one transfer.
///
/// With a file target the file is created on the first write and closed by
/// [`close`](ResponseSink::close). Writes go straight to the file, so a full
/// disk or a file that cannot be created refuses the bytes and the transport
/// fails the transfer with a write error.
#[derive(Debug, Default)]
pub struct ResponseSink {
    target: OutputTarget,
    buffer: Vec<u8>,
    file: Option<File>,
    written: u64,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear captured data and switch to `target` for the next transfer.
    pub fn reset(&mut self, target: OutputTarget) {
        self.file = None;
        self.buffer.clear();
        self.written = 0;
        self.target = target;
    }

    /// Close the output file, if one was opened.
    pub fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }

    /// Body captured in memory. Empty when writing to a file.
    pub fn body(&self) -> &[u8] {
        &self.buffer
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    fn write_file(file: &mut Option<File>, path: &Path, data: &[u8]) -> io::Result<()> {
        if file.is_none() {
            *file = Some(File::create(path)?);
        }
        match file {
            Some(file) => file.write_all(data),
            None => Ok(()),
        }
    }
}

impl BodySink for ResponseSink {
    fn write(&mut self, data: &[u8]) -> usize {
        let result = match &self.target {
            OutputTarget::Memory => {
                self.buffer.extend_from_slice(data);
                Ok(())
            }
            OutputTarget::File(path) => Self::write_file(&mut self.file, path, data),
        };

        if let Err(e) = result {
            if let OutputTarget::File(path) = &self.target {
                warn!(path = %path.display(), error = %e, "cannot write response body to output file");
            }
            return 0;
        }
        self.written += data.len() as u64;
        data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_accumulates() {
        let mut sink = ResponseSink::new();
        assert_eq!(sink.write(b"hello "), 6);
        assert_eq!(sink.write(b"world"), 5);
        assert_eq!(sink.body(), b"hello world");
        assert_eq!(sink.bytes_written(), 11);

        sink.reset(OutputTarget::Memory);
        assert!(sink.body().is_empty());
    }

    #[test]
    fn test_file_sink_opens_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut sink = ResponseSink::new();
        sink.reset(OutputTarget::File(path.clone()));
        assert!(!path.exists());

        sink.write(b"abc");
        sink.write(b"def");
        sink.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
        assert!(sink.body().is_empty());
    }

    #[test]
    fn test_file_sink_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "previous contents").unwrap();

        let mut sink = ResponseSink::new();
        sink.reset(OutputTarget::File(path.clone()));
        sink.write(b"new");
        sink.close().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_unopenable_file_refuses_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.bin");

        let mut sink = ResponseSink::new();
        sink.reset(OutputTarget::File(path));
        assert_eq!(sink.write(b"data"), 0);
        assert_eq!(sink.bytes_written(), 0);
        assert!(sink.close().is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_full_disk_refuses_bytes() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }

        let mut sink = ResponseSink::new();
        sink.reset(OutputTarget::File(full.to_path_buf()));
        assert_eq!(sink.write(b"small body"), 0);
        assert_eq!(sink.bytes_written(), 0);
    }
}
