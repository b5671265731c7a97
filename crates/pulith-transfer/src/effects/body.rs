//! Request body sources for streamed uploads.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::trace;

use super::transport::{BodySource, SeekOutcome, Seeker, UploadStream, Whence};
use crate::data::ChunkWindow;
use crate::error::{Error, Result};

/// File-backed body, optionally restricted to a chunk window.
///
/// The file handle lives as long as the source, so dropping the source at the
/// end of a transfer closes it on every path.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    path: PathBuf,
    file_size: u64,
    window: Option<ChunkWindow>,
    position: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>, window: Option<ChunkWindow>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| Error::SourceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let file_size = file
            .metadata()
            .map_err(|source| Error::SourceSize {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let position = match window {
            Some(w) => file
                .seek(SeekFrom::Start(w.offset))
                .map_err(|source| Error::SourceOpen {
                    path: path.to_path_buf(),
                    source,
                })?,
            None => 0,
        };

        Ok(Self {
            file,
            path: path.to_path_buf(),
            file_size,
            window,
            position,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl BodySource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let want = match self.window {
            Some(w) => {
                let end = w.end();
                if self.position >= end {
                    return Ok(0);
                }
                buf.len().min(usize::try_from(end - self.position).unwrap_or(usize::MAX))
            }
            None => buf.len(),
        };

        let n = self.file.read(&mut buf[..want])?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Seeker for FileSource {
    fn seek(&mut self, offset: i64, whence: Whence) -> SeekOutcome {
        let target = match whence {
            Whence::End => return SeekOutcome::CantSeek,
            Whence::Start => {
                let Ok(offset) = u64::try_from(offset) else {
                    return SeekOutcome::Fail;
                };
                let base = self.window.map_or(0, |w| w.offset);
                SeekFrom::Start(base.saturating_add(offset))
            }
            Whence::Current => SeekFrom::Current(offset),
        };

        match self.file.seek(target) {
            Ok(position) => {
                trace!(path = %self.path.display(), position, "upload source rewound");
                self.position = position;
                SeekOutcome::Ok
            }
            Err(_) => SeekOutcome::Fail,
        }
    }
}

impl UploadStream for FileSource {
    fn declared_size(&self) -> u64 {
        self.window.map_or(self.file_size, |w| w.size)
    }
}

/// In-memory body. Reads start at the upload offset and advance it.
#[derive(Debug, Clone)]
pub struct BufferSource {
    data: Vec<u8>,
    window: Option<ChunkWindow>,
    offset: i64,
}

impl BufferSource {
    pub fn new(data: Vec<u8>, window: Option<ChunkWindow>) -> Self {
        let offset = window.map_or(0, |w| i64::try_from(w.offset).unwrap_or(i64::MAX));
        Self {
            data,
            window,
            offset,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn start(&self) -> i64 {
        self.window
            .map_or(0, |w| i64::try_from(w.offset).unwrap_or(i64::MAX))
    }

    fn end(&self) -> usize {
        match self.window {
            Some(w) => usize::try_from(w.end()).map_or(self.data.len(), |e| e.min(self.data.len())),
            None => self.data.len(),
        }
    }

    fn visible_len(&self) -> u64 {
        self.window.map_or(self.data.len() as u64, |w| w.size)
    }
}

impl BodySource for BufferSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(start) = usize::try_from(self.offset) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "upload offset is before the start of the buffer",
            ));
        };
        let end = self.end();
        if start >= end {
            return Ok(0);
        }

        let n = buf.len().min(end - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.offset += n as i64;
        Ok(n)
    }
}

impl Seeker for BufferSource {
    fn seek(&mut self, offset: i64, whence: Whence) -> SeekOutcome {
        match whence {
            Whence::Start => {
                if offset < 0 || offset as u64 >= self.visible_len() {
                    return SeekOutcome::CantSeek;
                }
                self.offset = self.start().saturating_add(offset);
                SeekOutcome::Ok
            }
            // Caller keeps relative seeks in range.
            Whence::Current => {
                self.offset = self.offset.saturating_add(offset);
                SeekOutcome::Ok
            }
            Whence::End => SeekOutcome::CantSeek,
        }
    }
}

impl UploadStream for BufferSource {
    fn declared_size(&self) -> u64 {
        self.visible_len()
    }
}

/// The body of a raw upload: a file on disk or bytes in memory.
#[derive(Debug)]
pub enum UploadSource {
    File(FileSource),
    Buffer(BufferSource),
}

impl UploadSource {
    /// Size of the whole source, ignoring any chunk window.
    pub fn total_size(&self) -> u64 {
        match self {
            Self::File(f) => f.file_size(),
            Self::Buffer(b) => b.len() as u64,
        }
    }
}

impl BodySource for UploadSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(f) => f.read(buf),
            Self::Buffer(b) => b.read(buf),
        }
    }
}

impl Seeker for UploadSource {
    fn seek(&mut self, offset: i64, whence: Whence) -> SeekOutcome {
        match self {
            Self::File(f) => f.seek(offset, whence),
            Self::Buffer(b) => b.seek(offset, whence),
        }
    }
}

impl UploadStream for UploadSource {
    fn declared_size(&self) -> u64 {
        match self {
            Self::File(f) => f.declared_size(),
            Self::Buffer(b) => b.declared_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn read_all(source: &mut dyn BodySource, step: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; step];
        loop {
            let n = source.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn write_temp(data: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_file_chunk_window_yields_exact_slice() {
        let data = sample(10_000);
        let file = write_temp(&data);

        for (offset, size, step) in [(0, 10_000, 4096), (5000, 3000, 700), (9999, 1, 16), (1, 2, 1)] {
            let window = ChunkWindow { offset, size };
            let mut source = FileSource::open(file.path(), Some(window)).unwrap();
            let body = read_all(&mut source, step);
            assert_eq!(body, &data[offset as usize..(offset + size) as usize]);
            assert_eq!(source.position(), offset + size);
            assert_eq!(source.declared_size(), size);
        }
    }

    #[test]
    fn test_file_without_window_reads_everything() {
        let data = sample(3000);
        let file = write_temp(&data);
        let mut source = FileSource::open(file.path(), None).unwrap();

        assert_eq!(source.declared_size(), 3000);
        assert_eq!(read_all(&mut source, 512), data);
    }

    #[test]
    fn test_file_seek_is_relative_to_chunk() {
        let data = sample(1000);
        let file = write_temp(&data);
        let mut source =
            FileSource::open(file.path(), Some(ChunkWindow { offset: 100, size: 50 })).unwrap();

        let mut buf = [0u8; 20];
        source.read(&mut buf).unwrap();
        assert_eq!(source.seek(0, Whence::Start), SeekOutcome::Ok);
        assert_eq!(source.position(), 100);
        assert_eq!(read_all(&mut source, 64), &data[100..150]);

        assert_eq!(source.seek(10, Whence::Start), SeekOutcome::Ok);
        assert_eq!(read_all(&mut source, 64), &data[110..150]);
    }

    #[test]
    fn test_file_seek_from_end_is_refused() {
        let file = write_temp(b"abc");
        let mut source = FileSource::open(file.path(), None).unwrap();
        assert_eq!(source.seek(0, Whence::End), SeekOutcome::CantSeek);
        assert_eq!(source.seek(-1, Whence::Start), SeekOutcome::Fail);
    }

    #[test]
    fn test_missing_file_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::open(dir.path().join("nope.bin"), None).unwrap_err();
        assert!(matches!(err, Error::SourceOpen { .. }));
    }

    #[test]
    fn test_buffer_reads_from_offset() {
        let mut source = BufferSource::new(b"hello world".to_vec(), None);
        assert_eq!(read_all(&mut source, 4), b"hello world");
        assert_eq!(source.offset(), 11);
    }

    #[test]
    fn test_buffer_honours_chunk_window() {
        let data = sample(100);
        let mut source = BufferSource::new(data.clone(), Some(ChunkWindow { offset: 10, size: 25 }));
        assert_eq!(source.declared_size(), 25);
        assert_eq!(read_all(&mut source, 7), &data[10..35]);
    }

    #[test]
    fn test_buffer_rejects_out_of_range_seek_without_moving() {
        let mut source = BufferSource::new(b"0123456789".to_vec(), None);
        let mut buf = [0u8; 3];
        source.read(&mut buf).unwrap();

        assert_eq!(source.seek(-1, Whence::Start), SeekOutcome::CantSeek);
        assert_eq!(source.seek(10, Whence::Start), SeekOutcome::CantSeek);
        assert_eq!(source.seek(0, Whence::End), SeekOutcome::CantSeek);
        assert_eq!(source.offset(), 3);

        assert_eq!(source.seek(9, Whence::Start), SeekOutcome::Ok);
        assert_eq!(source.offset(), 9);
    }

    #[test]
    fn test_buffer_seek_is_bounded_by_chunk_window() {
        let data = sample(100);
        let mut source = BufferSource::new(data.clone(), Some(ChunkWindow { offset: 10, size: 25 }));

        assert_eq!(source.seek(25, Whence::Start), SeekOutcome::CantSeek);
        assert_eq!(source.seek(50, Whence::Start), SeekOutcome::CantSeek);
        assert_eq!(source.offset(), 10);

        assert_eq!(source.seek(24, Whence::Start), SeekOutcome::Ok);
        assert_eq!(source.offset(), 34);
        assert_eq!(read_all(&mut source, 8), &data[34..35]);
    }

    #[test]
    fn test_buffer_relative_seek() {
        let mut source = BufferSource::new(b"0123456789".to_vec(), None);
        assert_eq!(source.seek(4, Whence::Current), SeekOutcome::Ok);
        assert_eq!(source.seek(-2, Whence::Current), SeekOutcome::Ok);
        assert_eq!(read_all(&mut source, 100), b"23456789");
    }

    #[test]
    fn test_buffer_negative_offset_fails_read() {
        let mut source = BufferSource::new(b"abc".to_vec(), None);
        source.seek(-5, Whence::Current);
        let mut buf = [0u8; 4];
        assert!(source.read(&mut buf).is_err());
    }

    #[test]
    fn test_upload_source_sizes() {
        let file = write_temp(&sample(500));
        let source = UploadSource::File(
            FileSource::open(file.path(), Some(ChunkWindow { offset: 0, size: 100 })).unwrap(),
        );
        assert_eq!(source.total_size(), 500);
        assert_eq!(source.declared_size(), 100);

        let source = UploadSource::Buffer(BufferSource::new(vec![1, 2, 3], None));
        assert_eq!(source.total_size(), 3);
        assert_eq!(source.declared_size(), 3);
    }
}
