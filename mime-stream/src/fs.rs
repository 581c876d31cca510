use crate::err::{Error, Result};
use crate::{Stream, Window};
use log::trace;
use std::fs::{File, OpenOptions};
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

// ESPIPE, the same value on Linux and the BSDs
const ESPIPE: i32 = 29;

/// A stream that reads and writes a file
#[derive(Debug)]
pub struct FsStream {
    file: Option<File>,
    window: Window,
    position: u64,
    eos: bool,
    // Pipes and FIFOs can only be read forwards
    seekable: bool,
}

impl FsStream {
    /// Wrap an open file. The stream starts at the file's current position
    /// and runs to the end of the file.
    ///
    /// Pipes and other files that cannot seek are accepted: positions then
    /// count from 0, the length is unknown and `seek`/`reset` fail.
    pub fn new(mut file: File) -> Result<Self> {
        match file.stream_position() {
            Ok(start) => Self::with_bounds(file, start, None),
            Err(e) if e.raw_os_error() == Some(ESPIPE) => {
                trace!("wrapping a file that cannot seek");
                Ok(Self {
                    file: Some(file),
                    window: Window::new(0, None),
                    position: 0,
                    eos: false,
                    seekable: false,
                })
            }
            Err(e) => Err(Error::Seek(e)),
        }
    }

    /// Wrap an open file, limiting the stream to `start..end`.
    pub fn with_bounds(mut file: File, start: u64, end: Option<u64>) -> Result<Self> {
        file.seek(SeekFrom::Start(start)).map_err(Error::Seek)?;
        Ok(Self {
            file: Some(file),
            window: Window::new(start, end),
            position: start,
            eos: false,
            seekable: true,
        })
    }

    /// Open a file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::Open(path.to_path_buf(), e))?;
        trace!("opened {} for reading", path.display());
        Self::new(file)
    }

    /// Create, or truncate, a file for reading and writing
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::Open(path.to_path_buf(), e))?;
        Self::new(file)
    }

    /// False for pipes, FIFOs and terminals
    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::Closed)
    }

    fn file_size(&self) -> Result<u64> {
        let file = self.file.as_ref().ok_or(Error::Closed)?;
        file.metadata().map(|m| m.len()).map_err(Error::Seek)
    }
}

impl Stream for FsStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = self.window.clamp(self.position, buf.len());
        let file = self.file.as_mut().ok_or(Error::Closed)?;
        if len == 0 {
            self.eos = !buf.is_empty();
            return Ok(0);
        }
        let n = loop {
            match file.read(&mut buf[..len]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Read(e)),
            }
        };
        self.position += n as u64;
        if n == 0 {
            self.eos = true;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let len = self.window.clamp(self.position, buf.len());
        let file = self.file.as_mut().ok_or(Error::Closed)?;
        if len == 0 {
            return Ok(0);
        }
        let n = loop {
            match file.write(&buf[..len]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Write(e)),
            }
        };
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.file()?.flush().map_err(Error::Write)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        if !self.seekable {
            self.file()?;
            return Err(Error::Seek(io::Error::from_raw_os_error(ESPIPE)));
        }
        let target = self
            .window
            .resolve(pos, self.position, || self.file_size(), self.window.end)?;
        self.file()?
            .seek(SeekFrom::Start(target))
            .map_err(Error::Seek)?;
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
        if let Some(end) = self.window.end {
            return Ok(Some(end - self.window.start));
        }
        let file = self.file.as_ref().ok_or(Error::Closed)?;
        if !self.seekable {
            return Ok(None);
        }
        let metadata = file.metadata().map_err(Error::Read)?;
        if metadata.is_file() {
            Ok(Some(metadata.len().saturating_sub(self.window.start)))
        } else {
            Ok(None)
        }
    }

    fn eos(&self) -> bool {
        self.eos || self.window.end.map_or(false, |end| self.position >= end)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            trace!("closing file stream at {}", self.position);
            file.flush().map_err(Error::Write)?;
        }
        Ok(())
    }
}
