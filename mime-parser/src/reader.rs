use log::trace;
use mime_stream::{Result, SeekFrom, Stream, BLOCK_SIZE};

// Smaller than a block so a BufferStream batches the reads
const CHUNK_SIZE: usize = BLOCK_SIZE / 4;

// Length of the line terminator at the end of a line, 0 for the final
// unterminated line of a stream
pub(crate) fn eol_len(line: &[u8]) -> usize {
    if line.ends_with(b"\r\n") {
        2
    } else if line.ends_with(b"\n") {
        1
    } else {
        0
    }
}

pub(crate) fn is_blank(line: &[u8]) -> bool {
    line == b"\n" || line == b"\r\n"
}

// Line oriented reader over a Stream with absolute offsets.
// Lines are peeked and then consumed, so a delimiter line can be left in
// place for an enclosing parser.
pub(crate) struct LineReader<S> {
    stream: S,
    buf: Vec<u8>,
    start: usize,
    offset: u64,
    eof: bool,
    after_blank: bool,
    last_eol: usize,
}

impl<S: Stream> LineReader<S> {
    pub(crate) fn new(stream: S) -> Self {
        let offset = stream.tell();
        Self {
            stream,
            buf: Vec::with_capacity(CHUNK_SIZE),
            start: 0,
            offset,
            eof: false,
            after_blank: true,
            last_eol: 0,
        }
    }

    // Absolute offset of the next unconsumed byte
    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    // True at stream start or when the last consumed line was blank
    pub(crate) fn after_blank(&self) -> bool {
        self.after_blank
    }

    // Terminator length of the last consumed line
    pub(crate) fn last_eol(&self) -> usize {
        self.last_eol
    }

    // The next line including its terminator, None at end of stream
    pub(crate) fn peek_line(&mut self) -> Result<Option<&[u8]>> {
        // Bytes after start already known to hold no line feed
        let mut searched = 0;
        let end = loop {
            let from = self.start + searched;
            if let Some(i) = self.buf[from..].iter().position(|&c| c == b'\n') {
                break from + i + 1;
            }
            if self.eof {
                break self.buf.len();
            }
            searched = self.buf.len() - self.start;
            self.fill()?;
        };
        if end == self.start {
            Ok(None)
        } else {
            Ok(Some(&self.buf[self.start..end]))
        }
    }

    pub(crate) fn consume(&mut self, len: usize) {
        let line = &self.buf[self.start..self.start + len];
        self.after_blank = is_blank(line);
        self.last_eol = eol_len(line);
        self.start += len;
        self.offset += len as u64;
    }

    // Read and consume the next line
    pub(crate) fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        let line = match self.peek_line()? {
            Some(line) => line.to_vec(),
            None => return Ok(None),
        };
        self.consume(line.len());
        Ok(Some(line))
    }

    pub(crate) fn eos(&self) -> bool {
        self.start == self.buf.len() && (self.eof || self.stream.eos())
    }

    pub(crate) fn reset(&mut self) -> Result<()> {
        self.stream.reset()?;
        self.buf.clear();
        self.start = 0;
        self.offset = self.stream.tell();
        self.eof = false;
        self.after_blank = true;
        self.last_eol = 0;
        Ok(())
    }

    // Give the stream back, positioned after the last consumed byte
    pub(crate) fn into_inner(mut self) -> Result<S> {
        if self.start < self.buf.len() {
            self.stream.seek(SeekFrom::Start(self.offset))?;
        }
        Ok(self.stream)
    }

    // Discard consumed bytes and read another chunk
    fn fill(&mut self) -> Result<()> {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        let len = self.buf.len();
        self.buf.resize(len + CHUNK_SIZE, 0);
        let n = self.stream.read(&mut self.buf[len..])?;
        self.buf.truncate(len + n);
        if n == 0 {
            trace!("end of stream at {}", self.offset);
            self.eof = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mime_stream::{BufferMode, BufferStream, MemStream};
    use pretty_assertions::assert_eq;

    // Counts the read calls made on the wrapped stream
    struct Counting<S> {
        inner: S,
        reads: usize,
    }

    impl<S> Counting<S> {
        fn new(inner: S) -> Self {
            Self { inner, reads: 0 }
        }
    }

    impl<S: Stream> Stream for Counting<S> {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.reads += 1;
            self.inner.read(buf)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.inner.write(buf)
        }

        fn flush(&mut self) -> Result<()> {
            self.inner.flush()
        }

        fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
            self.inner.seek(pos)
        }

        fn tell(&self) -> u64 {
            self.inner.tell()
        }

        fn reset(&mut self) -> Result<()> {
            self.inner.reset()
        }

        fn length(&mut self) -> Result<Option<u64>> {
            self.inner.length()
        }

        fn eos(&self) -> bool {
            self.inner.eos()
        }

        fn close(&mut self) -> Result<()> {
            self.inner.close()
        }
    }

    #[test]
    fn lines_and_offsets() {
        let mut reader = LineReader::new(MemStream::from_slice(b"a: 1\r\n\nlast"));
        assert!(reader.after_blank());
        assert_eq!(reader.next_line().unwrap().unwrap(), b"a: 1\r\n");
        assert_eq!(reader.last_eol(), 2);
        assert!(!reader.after_blank());
        assert_eq!(reader.offset(), 6);
        assert_eq!(reader.next_line().unwrap().unwrap(), b"\n");
        assert!(reader.after_blank());
        assert_eq!(reader.peek_line().unwrap().unwrap(), b"last");
        assert_eq!(reader.offset(), 7);
        assert_eq!(reader.next_line().unwrap().unwrap(), b"last");
        assert_eq!(reader.last_eol(), 0);
        assert_eq!(reader.next_line().unwrap(), None);
        assert!(reader.eos());
    }

    #[test]
    fn long_lines_span_chunks() {
        let mut data = vec![b'x'; CHUNK_SIZE * 2 + 10];
        data.push(b'\n');
        data.extend_from_slice(b"tail\n");
        let mut reader = LineReader::new(MemStream::with_data(data));
        let first = reader.next_line().unwrap().unwrap();
        assert_eq!(first.len(), CHUNK_SIZE * 2 + 11);
        assert_eq!(reader.next_line().unwrap().unwrap(), b"tail\n");
        assert_eq!(reader.offset(), (CHUNK_SIZE * 2 + 16) as u64);
    }

    #[test]
    fn block_buffer_batches_reads() {
        assert!(CHUNK_SIZE < BLOCK_SIZE);
        let mut line = vec![b'x'; 63];
        line.push(b'\n');
        let data = line.repeat(BLOCK_SIZE * 10 / line.len());
        let mut file = Counting::new(MemStream::with_data(data.clone()));
        let buffered = BufferStream::new(&mut file, BufferMode::BlockRead);
        let mut reader = LineReader::new(Counting::new(buffered));
        let mut lines = 0;
        while let Some(next) = reader.next_line().unwrap() {
            assert_eq!(next, line);
            lines += 1;
        }
        assert_eq!(lines, data.len() / line.len());
        let requests = reader.into_inner().unwrap().reads;
        // One read per chunk or block, plus the one that sees the end
        assert_eq!(requests, data.len() / CHUNK_SIZE + 1);
        assert_eq!(file.reads, data.len() / BLOCK_SIZE + 1);
    }

    #[test]
    fn reset_and_into_inner() {
        let mut reader = LineReader::new(MemStream::from_slice(b"one\ntwo\nthree\n"));
        reader.next_line().unwrap();
        reader.reset().unwrap();
        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.next_line().unwrap().unwrap(), b"one\n");
        let stream = reader.into_inner().unwrap();
        assert_eq!(stream.tell(), 4);
    }

    #[test]
    fn helpers() {
        assert_eq!(eol_len(b"x\r\n"), 2);
        assert_eq!(eol_len(b"x\n"), 1);
        assert_eq!(eol_len(b"x"), 0);
        assert!(is_blank(b"\r\n"));
        assert!(!is_blank(b" \r\n"));
    }
}
