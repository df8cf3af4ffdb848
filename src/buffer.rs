//! Random-access byte source for the scanner.
//!
//! Three backings are supported:
//!
//! - in-memory bytes (also used for any seekable source that fits in one
//!   window, whose handle is dropped right after the initial read),
//! - a seekable source larger than one window, re-windowed on demand,
//! - a non-seekable stream, accumulated into a growing buffer since past
//!   data cannot be fetched again.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use bstr::ByteSlice;
use tracing::trace;

use crate::parser_diagnostics::FatalError;

/// Initial capacity of a stream buffer.
pub const MIN_BUFFER_LENGTH: usize = 1024;
/// Window size for seekable sources.
pub const MAX_BUFFER_LENGTH: usize = MIN_BUFFER_LENGTH * 64;

pub trait SeekRead: Read + Seek {}

impl<T: Read + Seek> SeekRead for T {}

enum Backing {
    Memory,
    Seekable(Box<dyn SeekRead>),
    Stream(Box<dyn Read>),
}

pub struct Buffer {
    buf: Vec<u8>,
    /// Source position of `buf[0]`.
    buf_start: usize,
    /// Number of valid bytes in `buf`.
    buf_len: usize,
    /// Total source length; for a stream, the number of bytes read so far.
    file_len: usize,
    /// Read position relative to `buf_start`.
    buf_pos: usize,
    backing: Backing,
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backing = match self.backing {
            Backing::Memory => "memory",
            Backing::Seekable(_) => "seekable",
            Backing::Stream(_) => "stream",
        };
        f.debug_struct("Buffer")
            .field("backing", &backing)
            .field("buf_start", &self.buf_start)
            .field("buf_len", &self.buf_len)
            .field("file_len", &self.file_len)
            .field("pos", &self.pos())
            .finish()
    }
}

impl Buffer {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FatalError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| FatalError::Open {
            path: path.to_owned(),
            source,
        })?;
        Self::from_seekable(file)
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let buf = bytes.into();
        let len = buf.len();
        Buffer {
            buf,
            buf_start: 0,
            buf_len: len,
            file_len: len,
            buf_pos: 0,
            backing: Backing::Memory,
        }
    }

    pub fn from_seekable(mut source: impl Read + Seek + 'static) -> Result<Self, FatalError> {
        let file_len = source.seek(SeekFrom::End(0))? as usize;
        source.seek(SeekFrom::Start(0))?;
        if file_len <= MAX_BUFFER_LENGTH {
            let mut buf = Vec::with_capacity(file_len);
            source.read_to_end(&mut buf)?;
            // The handle is dropped here; everything lives in memory now.
            return Ok(Self::from_bytes(buf));
        }
        let mut buffer = Buffer {
            buf: vec![0; MAX_BUFFER_LENGTH],
            buf_start: usize::MAX,
            buf_len: 0,
            file_len,
            buf_pos: 0,
            backing: Backing::Seekable(Box::new(source)),
        };
        buffer.set_pos(0)?;
        Ok(buffer)
    }

    pub fn from_stream(source: impl Read + 'static) -> Self {
        Buffer {
            buf: vec![0; MIN_BUFFER_LENGTH],
            buf_start: 0,
            buf_len: 0,
            file_len: 0,
            buf_pos: 0,
            backing: Backing::Stream(Box::new(source)),
        }
    }

    /// Reads one byte, or `None` at end of input.
    pub fn read(&mut self) -> Result<Option<u8>, FatalError> {
        if self.buf_pos >= self.buf_len {
            if self.pos() < self.file_len {
                // Re-window around the current position.
                self.set_pos(self.pos())?;
            } else {
                self.read_next_stream_chunk()?;
            }
        }
        if self.buf_pos < self.buf_len {
            let b = self.buf[self.buf_pos];
            self.buf_pos += 1;
            Ok(Some(b))
        } else {
            Ok(None)
        }
    }

    pub fn peek(&mut self) -> Result<Option<u8>, FatalError> {
        let pos = self.pos();
        let b = self.read()?;
        self.set_pos(pos)?;
        Ok(b)
    }

    pub fn pos(&self) -> usize {
        self.buf_start.wrapping_add(self.buf_pos)
    }

    pub fn set_pos(&mut self, value: usize) -> Result<(), FatalError> {
        if matches!(self.backing, Backing::Stream(_)) {
            while value >= self.file_len && self.read_next_stream_chunk()? > 0 {}
        }
        if value > self.len() {
            return Err(FatalError::OutOfBounds(value));
        }
        if value >= self.buf_start && value - self.buf_start < self.buf_len {
            self.buf_pos = value - self.buf_start;
        } else if let Backing::Seekable(source) = &mut self.backing {
            source.seek(SeekFrom::Start(value as u64))?;
            let len = fill(&mut **source, &mut self.buf)?;
            trace!(start = value, len, "moved buffer window");
            self.buf_start = value;
            self.buf_len = len;
            self.buf_pos = 0;
        } else {
            // Only the end position is left; it lies just past the buffer.
            self.buf_pos = value - self.buf_start;
        }
        Ok(())
    }

    /// Text of the source range `beg..end`, decoded lossily.
    ///
    /// The read position is left unchanged.
    pub fn slice(&mut self, beg: usize, end: usize) -> Result<String, FatalError> {
        let old_pos = self.pos();
        let mut bytes = Vec::with_capacity(end.saturating_sub(beg));
        self.set_pos(beg)?;
        while self.pos() < end {
            match self.read()? {
                Some(b) => bytes.push(b),
                None => break,
            }
        }
        self.set_pos(old_pos)?;
        Ok(bytes.to_str_lossy().into_owned())
    }

    /// Total length of the input, or the bytes seen so far for a stream
    /// that has not reached its end.
    pub fn len(&self) -> usize {
        self.file_len
    }

    fn read_next_stream_chunk(&mut self) -> Result<usize, FatalError> {
        let source = match &mut self.backing {
            Backing::Stream(source) => source,
            _ => return Ok(0),
        };
        if self.buf_len == self.buf.len() {
            let new_len = self.buf.len() * 2;
            trace!(len = new_len, "growing stream buffer");
            self.buf.resize(new_len, 0);
        }
        let read = loop {
            match source.read(&mut self.buf[self.buf_len..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.buf_len += read;
        self.file_len = self.buf_len;
        Ok(read)
    }
}

/// Reads until `buf` is full or the source is exhausted.
fn fill(source: &mut dyn SeekRead, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match source.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    /// Hands out at most `chunk` bytes per call.
    struct Chunked {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn read_all(buffer: &mut Buffer) -> Vec<u8> {
        let mut out = vec![];
        while let Some(b) = buffer.read().unwrap() {
            out.push(b);
        }
        out
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_memory() {
        let mut buffer = Buffer::from_bytes(&b"abc"[..]);
        assert_eq!(buffer.peek().unwrap(), Some(b'a'));
        assert_eq!(buffer.pos(), 0);
        assert_eq!(read_all(&mut buffer), b"abc");
        assert_eq!(buffer.pos(), 3);
        assert_eq!(buffer.read().unwrap(), None);
        buffer.set_pos(1).unwrap();
        assert_eq!(buffer.read().unwrap(), Some(b'b'));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut buffer = Buffer::from_bytes(&b"abc"[..]);
        buffer.set_pos(3).unwrap();
        assert!(matches!(
            buffer.set_pos(4),
            Err(FatalError::OutOfBounds(4))
        ));
    }

    #[test]
    fn test_stream_grows() {
        let data = sample(5000);
        let mut buffer = Buffer::from_stream(Chunked {
            data: data.clone(),
            pos: 0,
            chunk: 300,
        });
        assert_eq!(read_all(&mut buffer), data);
        assert_eq!(buffer.len(), 5000);
        // Everything stays addressable after the stream is drained.
        buffer.set_pos(10).unwrap();
        assert_eq!(buffer.read().unwrap(), Some(data[10]));
        assert!(matches!(
            buffer.set_pos(5001),
            Err(FatalError::OutOfBounds(5001))
        ));
    }

    #[test]
    fn test_stream_seek_ahead() {
        let data = sample(4000);
        let mut buffer = Buffer::from_stream(Chunked {
            data: data.clone(),
            pos: 0,
            chunk: 100,
        });
        buffer.set_pos(3500).unwrap();
        assert_eq!(buffer.read().unwrap(), Some(data[3500]));
        assert_eq!(buffer.slice(0, 3).unwrap(), "\u{0}\u{1}\u{2}");
        assert_eq!(buffer.pos(), 3501);
    }

    #[test]
    fn test_seekable_windows() {
        let len = MAX_BUFFER_LENGTH * 3 + 17;
        let data = sample(len);
        let mut buffer = Buffer::from_seekable(Cursor::new(data.clone())).unwrap();
        assert_eq!(buffer.len(), len);
        assert_eq!(read_all(&mut buffer), data);

        buffer.set_pos(MAX_BUFFER_LENGTH * 2 + 5).unwrap();
        assert_eq!(buffer.read().unwrap(), Some(data[MAX_BUFFER_LENGTH * 2 + 5]));
        buffer.set_pos(3).unwrap();
        assert_eq!(buffer.peek().unwrap(), Some(data[3]));
        assert_eq!(buffer.pos(), 3);
        buffer.set_pos(len).unwrap();
        assert_eq!(buffer.read().unwrap(), None);
    }

    #[test]
    fn test_small_seekable_is_loaded() {
        let buffer = Buffer::from_seekable(Cursor::new(b"tiny".to_vec())).unwrap();
        assert!(matches!(buffer.backing, Backing::Memory));
    }

    #[test]
    fn test_slice_is_lossy() {
        let mut buffer = Buffer::from_bytes(b"a\xffb".to_vec());
        buffer.read().unwrap();
        assert_eq!(buffer.slice(0, 3).unwrap(), "a\u{FFFD}b");
        assert_eq!(buffer.pos(), 1);
    }
}
