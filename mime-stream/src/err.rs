use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a stream's backing store
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("read failed")]
    Read(#[source] io::Error),
    #[error("write failed")]
    Write(#[source] io::Error),
    #[error("seek failed")]
    Seek(#[source] io::Error),
    #[error("position {position} is outside the stream bounds [{start}, {}]", display_end(.end))]
    OutOfBounds {
        position: i128,
        start: u64,
        end: Option<u64>,
    },
    #[error("{0} is not supported by this stream")]
    Unsupported(&'static str),
    #[error("cannot map file")]
    Map(#[source] io::Error),
    #[error("{} - cannot open", .0.display())]
    Open(PathBuf, #[source] io::Error),
    #[error("stream is closed")]
    Closed,
}

impl Error {
    /// True if the error came from the backing store rather than from a
    /// request the stream refused.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Read(_) | Error::Write(_) | Error::Seek(_) | Error::Map(_) | Error::Open(..)
        )
    }
}

fn display_end(end: &Option<u64>) -> String {
    end.map(|e| e.to_string()).unwrap_or_else(|| "eof".to_owned())
}
