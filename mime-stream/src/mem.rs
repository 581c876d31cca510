use crate::err::{Error, Result};
use crate::{Stream, Window};
use std::io::SeekFrom;

/// A stream over a growable in-memory buffer
#[derive(Debug, Default)]
pub struct MemStream {
    data: Vec<u8>,
    window: Window,
    position: u64,
    eos: bool,
    closed: bool,
}

impl MemStream {
    /// Create an empty stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream that owns the given bytes
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Create a stream holding a copy of the given bytes
    pub fn from_slice(data: &[u8]) -> Self {
        Self::with_data(data.to_vec())
    }

    /// Create a stream over `start..end` of the given bytes.
    /// A bounded stream can be written up to `end` even if `data` is shorter.
    pub fn with_bounds(data: Vec<u8>, start: u64, end: Option<u64>) -> Self {
        Self {
            data,
            window: Window::new(start, end),
            position: start,
            eos: false,
            closed: false,
        }
    }

    /// The bytes inside the bounds window
    pub fn as_bytes(&self) -> &[u8] {
        let start = (self.window.start as usize).min(self.data.len());
        let end = self.readable_end() as usize;
        &self.data[start..end.max(start)]
    }

    /// Take back the whole buffer
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    // Highest position a seek may reach
    fn bound_end(&self) -> u64 {
        self.window.end.unwrap_or(self.data.len() as u64)
    }

    // End of the bytes that can actually be read
    fn readable_end(&self) -> u64 {
        self.bound_end().min(self.data.len() as u64)
    }
}

impl Stream for MemStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        let available = self.readable_end().saturating_sub(self.position) as usize;
        let n = available.min(buf.len());
        if n == 0 {
            self.eos = !buf.is_empty();
            return Ok(0);
        }
        let start = self.position as usize;
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.position += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.check_open()?;
        let n = self.window.clamp(self.position, buf.len());
        let start = self.position as usize;
        let end = start + n;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(&buf[..n]);
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.check_open()
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.check_open()?;
        let size = self.data.len() as u64;
        let target = self
            .window
            .resolve(pos, self.position, || Ok(size), Some(self.bound_end()))?;
        self.position = target;
        self.eos = false;
        Ok(target)
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn reset(&mut self) -> Result<()> {
        self.seek(SeekFrom::Start(self.window.start)).map(|_| ())
    }

    fn length(&mut self) -> Result<Option<u64>> {
        self.check_open()?;
        Ok(Some(self.bound_end().saturating_sub(self.window.start)))
    }

    fn eos(&self) -> bool {
        self.eos || self.position >= self.readable_end()
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.data = Vec::new();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_extend_the_buffer() {
        let mut stream = MemStream::new();
        stream.write_all(b"Subject: a\n").unwrap();
        stream.write_all(b"\nbody\n").unwrap();
        assert_eq!(stream.length().unwrap(), Some(17));
        assert!(stream.eos());
        stream.seek(SeekFrom::Start(9)).unwrap();
        stream.write_all(b"b\n\nlonger body\n").unwrap();
        assert_eq!(stream.as_bytes(), b"Subject: b\n\nlonger body\n");
    }

    #[test]
    fn reads_and_rewinds() {
        let mut stream = MemStream::from_slice(b"abcdef");
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert!(stream.eos());
        stream.reset().unwrap();
        assert_eq!(stream.tell(), 0);
        assert!(!stream.eos());
    }

    #[test]
    fn seeking_past_the_end_fails() {
        let mut stream = MemStream::from_slice(b"abc");
        assert_eq!(stream.seek(SeekFrom::End(0)).unwrap(), 3);
        assert!(matches!(
            stream.seek(SeekFrom::Current(1)),
            Err(Error::OutOfBounds { position: 4, .. })
        ));
        assert_eq!(stream.tell(), 3);
    }

    #[test]
    fn bounded_window() {
        let mut stream = MemStream::with_bounds(b"0123456789".to_vec(), 3, Some(7));
        assert_eq!(stream.tell(), 3);
        assert_eq!(stream.as_bytes(), b"3456");
        let mut buf = [0u8; 10];
        assert_eq!(stream.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"3456");
        stream.seek(SeekFrom::Start(5)).unwrap();
        assert_eq!(stream.write(b"abcdef").unwrap(), 2);
        assert_eq!(stream.into_inner(), b"01234ab789");
    }

    #[test]
    fn close_releases_buffer() {
        let mut stream = MemStream::from_slice(b"abc");
        stream.close().unwrap();
        assert!(matches!(stream.length(), Err(Error::Closed)));
        assert!(stream.into_inner().is_empty());
    }
}
