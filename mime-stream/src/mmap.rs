use crate::err::{Error, Result};
use crate::{Stream, Window};
use log::trace;
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::File;
use std::io::SeekFrom;
use std::path::Path;

/// How a file is mapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Shared read-only mapping, writes are refused
    ReadOnly,
    /// Shared writable mapping, writes cannot grow the file
    ReadWrite,
}

enum Mapping {
    // Zero length files cannot be mapped
    Empty,
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

impl Mapping {
    fn bytes(&self) -> &[u8] {
        match self {
            Mapping::Empty => &[],
            Mapping::ReadOnly(map) => &map[..],
            Mapping::ReadWrite(map) => &map[..],
        }
    }
}

/// A stream over a memory mapped file
pub struct MmapStream {
    map: Option<Mapping>,
    window: Window,
    position: u64,
    eos: bool,
}

impl MmapStream {
    /// Map the whole of an open file
    pub fn new(file: &File, access: Access) -> Result<Self> {
        Self::with_bounds(file, access, 0, None)
    }

    /// Map an open file, limiting the stream to `start..end`
    pub fn with_bounds(file: &File, access: Access, start: u64, end: Option<u64>) -> Result<Self> {
        let len = file.metadata().map_err(Error::Map)?.len();
        let map = if len == 0 {
            Mapping::Empty
        } else {
            // The mapping is only sound while no other process truncates the file.
            match access {
                Access::ReadOnly => {
                    let map = unsafe { MmapOptions::new().map(file) }.map_err(Error::Map)?;
                    Mapping::ReadOnly(map)
                }
                Access::ReadWrite => {
                    let map = unsafe { MmapOptions::new().map_mut(file) }.map_err(Error::Map)?;
                    Mapping::ReadWrite(map)
                }
            }
        };
        trace!("mapped {} bytes ({:?})", len, access);
        let window = Window::new(start.min(len), end.map(|e| e.min(len)));
        Ok(Self {
            map: Some(map),
            position: window.start,
            window,
            eos: false,
        })
    }

    /// Open and map a file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::Open(path.to_path_buf(), e))?;
        Self::new(&file, Access::ReadOnly)
    }

    /// True if the mapping accepts writes
    pub fn is_writable(&self) -> bool {
        matches!(self.map, Some(Mapping::ReadWrite(_)))
    }

    fn map(&self) -> Result<&Mapping> {
        self.map.as_ref().ok_or(Error::Closed)
    }

    fn bound_end(&self, map: &Mapping) -> u64 {
        let len = map.bytes().len() as u64;
        self.window.end.unwrap_or(len).min(len)
    }
}

impl Stream for MmapStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let map = self.map.as_ref().ok_or(Error::Closed)?;
        let end = self.bound_end(map);
        let n = (end.saturating_sub(self.position) as usize).min(buf.len());
        if n == 0 {
            self.eos = !buf.is_empty();
            return Ok(0);
        }
        let start = self.position as usize;
        buf[..n].copy_from_slice(&map.bytes()[start..start + n]);
        self.position += n as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let end = self.bound_end(self.map()?);
        let start = self.position as usize;
        match self.map.as_mut() {
            Some(Mapping::ReadWrite(map)) => {
                let n = (end.saturating_sub(self.position) as usize).min(buf.len());
                map[start..start + n].copy_from_slice(&buf[..n]);
                self.position += n as u64;
                Ok(n)
            }
            Some(_) => Err(Error::Unsupported("write to a read-only mapping")),
            None => Err(Error::Closed),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self.map()? {
            Mapping::ReadWrite(map) => map.flush().map_err(Error::Write),
            _ => Ok(()),
        }
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let end = self.bound_end(self.map()?);
        let target = self.window.resolve(pos, self.position, || Ok(end), Some(end))?;
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
        let end = self.bound_end(self.map()?);
        Ok(Some(end - self.window.start))
    }

    fn eos(&self) -> bool {
        self.eos
            || self
                .map
                .as_ref()
                .map_or(true, |map| self.position >= self.bound_end(map))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(map) = self.map.take() {
            if let Mapping::ReadWrite(map) = &map {
                map.flush().map_err(Error::Write)?;
            }
            trace!("unmapping stream at {}", self.position);
        }
        Ok(())
    }
}
