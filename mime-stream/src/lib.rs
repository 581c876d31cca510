//! Seekable byte streams with a single contract over several backing stores.
//!
//! Every stream implements [`Stream`]. Positions are absolute offsets into the
//! backing store and always stay inside the stream's bounds window. The four
//! variants are interchangeable:
//!
//! * [`FsStream`] reads and writes a file
//! * [`MemStream`] owns a growable byte buffer
//! * [`MmapStream`] reads (and optionally writes) a memory mapped file
//! * [`BufferStream`] wraps any other stream and batches small I/O into blocks
//!
//! # Example
//! ```
//! use mime_stream::{BufferMode, BufferStream, MemStream, Stream};
//! use std::io::SeekFrom;
//!
//! let mem = MemStream::from_slice(b"Subject: hello\r\n\r\nbody\r\n");
//! let mut stream = BufferStream::new(mem, BufferMode::BlockRead);
//! let mut line = Vec::new();
//! stream.read_line(&mut line)?;
//! assert_eq!(line, b"Subject: hello\r\n");
//! assert_eq!(stream.tell(), 16);
//! stream.seek(SeekFrom::Start(18))?;
//! line.clear();
//! stream.read_line(&mut line)?;
//! assert_eq!(line, b"body\r\n");
//! # Ok::<(), mime_stream::Error>(())
//! ```

mod buffer;
mod err;
mod fs;
mod mem;
mod mmap;

pub use crate::buffer::{BufferMode, BufferStream, BLOCK_SIZE};
pub use crate::err::{Error, Result};
pub use crate::fs::FsStream;
pub use crate::mem::MemStream;
pub use crate::mmap::{Access, MmapStream};
pub use std::io::SeekFrom;

use log::trace;
use std::io;
use std::ops::Range;

/// The operations shared by all stream variants.
///
/// `SeekFrom::Start` takes an absolute position, `SeekFrom::Current` is
/// relative to [`Stream::tell`] and `SeekFrom::End` is relative to the end of
/// the bounds window, or to the end of the backing store for unbounded
/// streams. Seeking outside the window fails with [`Error::OutOfBounds`].
pub trait Stream {
    /// Read up to `buf.len()` bytes. Returns 0 at the end of the stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write up to `buf.len()` bytes, returning the number written.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Push any buffered writes to the backing store.
    fn flush(&mut self) -> Result<()>;

    /// Move the stream position, returning the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// The current absolute position.
    fn tell(&self) -> u64;

    /// Rewind to the start of the bounds window.
    fn reset(&mut self) -> Result<()>;

    /// Number of bytes in the bounds window, `None` if it cannot be known.
    fn length(&mut self) -> Result<Option<u64>>;

    /// True once a read has hit the end of the stream.
    fn eos(&self) -> bool;

    /// Release the backing resource. Later I/O fails with [`Error::Closed`].
    fn close(&mut self) -> Result<()>;

    /// Write the whole buffer, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => {
                    let err = io::Error::new(io::ErrorKind::WriteZero, "stream is full");
                    return Err(Error::Write(err));
                }
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}

impl<S: Stream + ?Sized> Stream for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos)
    }

    fn tell(&self) -> u64 {
        (**self).tell()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn length(&mut self) -> Result<Option<u64>> {
        (**self).length()
    }

    fn eos(&self) -> bool {
        (**self).eos()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos)
    }

    fn tell(&self) -> u64 {
        (**self).tell()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn length(&mut self) -> Result<Option<u64>> {
        (**self).length()
    }

    fn eos(&self) -> bool {
        (**self).eos()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Copy everything from the current position of `src` to `dst`.
/// Returns the number of bytes copied.
pub fn copy<R, W>(src: &mut R, dst: &mut W) -> Result<u64>
where
    R: Stream + ?Sized,
    W: Stream + ?Sized,
{
    let mut buf = [0u8; BLOCK_SIZE];
    let mut total = 0;
    loop {
        let n = src.read(&mut buf)?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n])?;
        total += n as u64;
    }
    trace!("copied {} bytes between streams", total);
    Ok(total)
}

/// Read the bytes in an absolute range, e.g. the body range of a MIME part.
/// The result is shorter than the range if the stream ends first.
pub fn read_range<S>(stream: &mut S, range: Range<u64>) -> Result<Vec<u8>>
where
    S: Stream + ?Sized,
{
    let wanted = range.end.saturating_sub(range.start) as usize;
    let mut ret = vec![0u8; wanted];
    stream.seek(SeekFrom::Start(range.start))?;
    let mut filled = 0;
    while filled < wanted {
        match stream.read(&mut ret[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    ret.truncate(filled);
    Ok(ret)
}

// The bounds window shared by the concrete stream variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    pub(crate) start: u64,
    pub(crate) end: Option<u64>,
}

impl Default for Window {
    fn default() -> Self {
        Window::new(0, None)
    }
}

impl Window {
    pub(crate) fn new(start: u64, end: Option<u64>) -> Self {
        let end = end.map(|e| e.max(start));
        Self { start, end }
    }

    // Resolve a seek request to an absolute position.
    // `size` gives the size of the backing store and `upper` the highest
    // position the variant allows, if any.
    pub(crate) fn resolve<F>(
        &self,
        pos: SeekFrom,
        current: u64,
        size: F,
        upper: Option<u64>,
    ) -> Result<u64>
    where
        F: FnOnce() -> Result<u64>,
    {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(current) + i128::from(delta),
            SeekFrom::End(delta) => {
                let end = match self.end {
                    Some(end) => end,
                    None => size()?,
                };
                i128::from(end) + i128::from(delta)
            }
        };
        let below = target < i128::from(self.start);
        let above = upper.map_or(false, |u| target > i128::from(u));
        if below || above {
            return Err(Error::OutOfBounds {
                position: target,
                start: self.start,
                end: upper,
            });
        }
        Ok(target as u64)
    }

    // Number of bytes that may be transferred at `position`, given a request of `wanted`
    pub(crate) fn clamp(&self, position: u64, wanted: usize) -> usize {
        match self.end {
            Some(end) => {
                let left = end.saturating_sub(position);
                wanted.min(usize::try_from(left).unwrap_or(usize::MAX))
            }
            None => wanted,
        }
    }
}
