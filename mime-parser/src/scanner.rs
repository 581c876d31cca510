use crate::header::{Header, Headers};
use crate::header_buffer::HeaderBuffer;
use crate::line_parser::header_field;
use crate::matcher::HeaderCallbacks;
use crate::reader::{is_blank, LineReader};
use log::trace;
use mime_stream::{Result, Stream};
use std::ops::Range;

/// A header block as read from the stream
#[derive(Debug, Default)]
pub(crate) struct HeaderBlock {
    pub(crate) headers: Headers,
    // Header lines, without the blank line that ends them
    pub(crate) range: Range<u64>,
    // The stream ended before the blank line
    pub(crate) truncated: bool,
}

// Read header lines up to a blank line (consumed), the end of the stream or
// a delimiter line (left for the caller). Never fails on bad syntax: a line
// that is neither a header nor a continuation is folded into the previous
// header, or starts the body if there is none.
pub(crate) fn scan_headers<S, F>(
    reader: &mut LineReader<S>,
    callbacks: &mut HeaderCallbacks,
    is_delimiter: F,
) -> Result<HeaderBlock>
where
    S: Stream,
    F: Fn(&[u8], bool) -> bool,
{
    let start = reader.offset();
    let mut headers = Headers::default();
    let mut buffer = HeaderBuffer::default();
    let mut truncated = false;
    let end = loop {
        let offset = reader.offset();
        let after_blank = reader.after_blank();
        let line = match reader.peek_line()? {
            Some(line) => line,
            None => {
                truncated = true;
                break offset;
            }
        };
        let len = line.len();
        if is_blank(line) {
            reader.consume(len);
            break offset;
        }
        if is_delimiter(line, after_blank) {
            break offset;
        }
        if line[0] == b' ' || line[0] == b'\t' {
            if !buffer.append(line) {
                break offset;
            }
        } else if let Ok((value, name)) = header_field(line) {
            let done = buffer.start(name, value, offset);
            complete(done, &mut headers, callbacks);
        } else if !buffer.append(line) {
            trace!("body starts without headers at {}", offset);
            break offset;
        }
        reader.consume(len);
    };
    complete(buffer.take(), &mut headers, callbacks);

    Ok(HeaderBlock {
        headers,
        range: start..end,
        truncated,
    })
}

// Matchers fire before the header is stored and scanning goes on
fn complete(header: Option<Header>, headers: &mut Headers, callbacks: &mut HeaderCallbacks) {
    if let Some(header) = header {
        callbacks.dispatch(header.name(), header.value(), header.offset());
        headers.push(header);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::HeaderName;
    use mime_stream::MemStream;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn never(_: &[u8], _: bool) -> bool {
        false
    }

    fn scan(data: &[u8]) -> (HeaderBlock, LineReader<MemStream>) {
        let mut reader = LineReader::new(MemStream::from_slice(data));
        let mut callbacks = HeaderCallbacks::default();
        let block = scan_headers(&mut reader, &mut callbacks, never).unwrap();
        (block, reader)
    }

    #[test]
    fn simple_block() {
        let (block, mut reader) = scan(b"Subject: hi\r\nTo: a@b\r\n\r\nbody\r\n");
        assert_eq!(block.headers.len(), 2);
        assert_eq!(block.headers.get("to").unwrap().value(), b"a@b");
        assert_eq!(block.headers.get("to").unwrap().offset(), 13);
        assert_eq!(block.range, 0..22);
        assert!(!block.truncated);
        assert_eq!(reader.next_line().unwrap().unwrap(), b"body\r\n");
    }

    #[test]
    fn folding_and_garbage_lines() {
        let (block, _) = scan(b"Subject: one\n two\nnot a header\nX: y\n\n");
        let subject = block.headers.get("Subject").unwrap();
        assert_eq!(subject.value(), b"one\n two\nnot a header");
        assert_eq!(block.headers.get("X").unwrap().value(), b"y");
    }

    #[test]
    fn truncated_block() {
        let (block, reader) = scan(b"Subject: cut");
        assert!(block.truncated);
        assert_eq!(block.headers.get("subject").unwrap().value(), b"cut");
        assert!(reader.eos());
    }

    #[test]
    fn body_without_headers() {
        let (block, mut reader) = scan(b"just text\nmore\n");
        assert!(block.headers.is_empty());
        assert!(!block.truncated);
        assert_eq!(reader.next_line().unwrap().unwrap(), b"just text\n");
    }

    #[test]
    fn stops_at_delimiter() {
        let mut reader = LineReader::new(MemStream::from_slice(b"A: 1\n--b\nB: 2\n"));
        let mut callbacks = HeaderCallbacks::default();
        let block =
            scan_headers(&mut reader, &mut callbacks, |line, _| line.starts_with(b"--b")).unwrap();
        assert_eq!(block.headers.len(), 1);
        assert_eq!(reader.offset(), 5);
    }

    #[test]
    fn callbacks_see_completed_headers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut callbacks = HeaderCallbacks::default();
        callbacks.push(
            HeaderName::new("x-evolution"),
            move |name: &[u8], value: &[u8], offset: u64| {
                sink.lock().unwrap().push((name.to_vec(), value.to_vec(), offset))
            },
        );
        let data = b"From: a\nX-Evolution: 0001-0010\n\tfolded\n\n";
        let mut reader = LineReader::new(MemStream::from_slice(data));
        scan_headers(&mut reader, &mut callbacks, never).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(b"X-Evolution".to_vec(), b"0001-0010\n\tfolded".to_vec(), 8)]
        );
    }
}
