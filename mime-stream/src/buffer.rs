use crate::err::Result;
use crate::Stream;
use std::io::SeekFrom;

/// Size of the blocks read from, or written to, the wrapped stream
pub const BLOCK_SIZE: usize = 4096;

/// The direction a `BufferStream` batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    /// Read the wrapped stream a block at a time
    BlockRead,
    /// Collect writes into blocks before passing them on
    BlockWrite,
}

/// A decorator that batches small reads or writes on another stream.
///
/// The decorator owns whatever it is given: wrap a `&mut` stream to borrow
/// it instead. Positions reported by [`Stream::tell`] include buffered bytes
/// so the decorator is indistinguishable from the wrapped stream.
pub struct BufferStream<S: Stream> {
    inner: S,
    mode: BufferMode,
    buffer: Box<[u8]>,
    // Read cursor into the buffer, only used in BlockRead mode
    pos: usize,
    // Read mode: bytes read from inner. Write mode: bytes waiting to be written.
    filled: usize,
}

impl<S: Stream> BufferStream<S> {
    /// Wrap a stream
    pub fn new(inner: S, mode: BufferMode) -> Self {
        Self {
            inner,
            mode,
            buffer: vec![0u8; BLOCK_SIZE].into_boxed_slice(),
            pos: 0,
            filled: 0,
        }
    }

    /// The buffering mode
    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    /// The wrapped stream. Its position runs ahead of this stream by the
    /// number of buffered bytes.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwrap the stream, writing pending data and moving the wrapped
    /// stream back over any unread buffered bytes.
    pub fn into_inner(mut self) -> Result<S> {
        self.sync()?;
        Ok(self.inner)
    }

    /// Read a line, including its terminating `\n`, appending it to `out`.
    /// Returns the number of bytes appended, 0 at the end of the stream.
    pub fn read_line(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        if self.mode == BufferMode::BlockWrite {
            self.flush_pending()?;
            return self.read_line_unbuffered(out);
        }
        let mut total = 0;
        loop {
            if self.pos == self.filled && self.fill()? == 0 {
                break;
            }
            let available = &self.buffer[self.pos..self.filled];
            let (n, done) = match available.iter().position(|b| *b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };
            out.extend_from_slice(&available[..n]);
            self.pos += n;
            total += n;
            if done {
                break;
            }
        }
        Ok(total)
    }

    fn read_line_unbuffered(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut total = 0;
        let mut byte = [0u8; 1];
        while self.inner.read(&mut byte)? == 1 {
            out.push(byte[0]);
            total += 1;
            if byte[0] == b'\n' {
                break;
            }
        }
        Ok(total)
    }

    fn unread(&self) -> usize {
        match self.mode {
            BufferMode::BlockRead => self.filled - self.pos,
            BufferMode::BlockWrite => 0,
        }
    }

    fn fill(&mut self) -> Result<usize> {
        self.pos = 0;
        self.filled = 0;
        self.filled = self.inner.read(&mut self.buffer)?;
        Ok(self.filled)
    }

    // Write mode: pass pending bytes to the wrapped stream
    fn flush_pending(&mut self) -> Result<()> {
        if self.mode == BufferMode::BlockWrite && self.filled > 0 {
            self.inner.write_all(&self.buffer[..self.filled])?;
            self.filled = 0;
        }
        Ok(())
    }

    // Read mode: drop the buffer and put the wrapped stream back at our position
    fn discard(&mut self) -> Result<()> {
        let unread = self.unread();
        if unread > 0 {
            self.inner.seek(SeekFrom::Current(-(unread as i64)))?;
        }
        self.pos = 0;
        self.filled = 0;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        match self.mode {
            BufferMode::BlockRead => self.discard(),
            BufferMode::BlockWrite => self.flush_pending(),
        }
    }
}

impl<S: Stream> Stream for BufferStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.mode == BufferMode::BlockWrite {
            self.flush_pending()?;
            return self.inner.read(buf);
        }
        if self.pos == self.filled {
            if buf.len() >= BLOCK_SIZE {
                return self.inner.read(buf);
            }
            if self.fill()? == 0 {
                return Ok(0);
            }
        }
        let n = (self.filled - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.mode == BufferMode::BlockRead {
            self.discard()?;
            return self.inner.write(buf);
        }
        if self.filled + buf.len() > BLOCK_SIZE {
            self.flush_pending()?;
        }
        if buf.len() >= BLOCK_SIZE {
            return self.inner.write(buf);
        }
        self.buffer[self.filled..self.filled + buf.len()].copy_from_slice(buf);
        self.filled += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_pending()?;
        self.inner.flush()
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let pos = match (self.mode, pos) {
            (BufferMode::BlockRead, SeekFrom::Current(delta)) => {
                SeekFrom::Current(delta - self.unread() as i64)
            }
            (BufferMode::BlockWrite, pos) => {
                self.flush_pending()?;
                pos
            }
            (_, pos) => pos,
        };
        let target = self.inner.seek(pos)?;
        self.pos = 0;
        self.filled = 0;
        Ok(target)
    }

    fn tell(&self) -> u64 {
        match self.mode {
            BufferMode::BlockRead => self.inner.tell() - self.unread() as u64,
            BufferMode::BlockWrite => self.inner.tell() + self.filled as u64,
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.flush_pending()?;
        self.pos = 0;
        self.filled = 0;
        self.inner.reset()
    }

    fn length(&mut self) -> Result<Option<u64>> {
        self.flush_pending()?;
        self.inner.length()
    }

    fn eos(&self) -> bool {
        self.unread() == 0 && self.inner.eos()
    }

    fn close(&mut self) -> Result<()> {
        let pending = self.flush_pending();
        self.pos = 0;
        self.filled = 0;
        let closed = self.inner.close();
        pending.and(closed)
    }
}
