use crate::boundary::{Boundaries, LineKind};
use crate::content_type::ContentType;
use crate::header::Headers;
use crate::matcher::{HeaderCallbacks, HeaderHandler, HeaderMatcher};
use crate::message::{Anomaly, Diagnostic, LeafPart, Message, MessagePart, Multipart, Part};
use crate::reader::{eol_len, is_blank, LineReader};
use crate::scanner::{scan_headers, HeaderBlock};
use log::{debug, trace};
use mime_stream::{Result, Stream};
use std::mem;
use std::ops::Range;

/// Nesting limit used when none is configured
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configures and creates a [`Parser`]
pub struct ParserBuilder {
    scan_from: bool,
    max_depth: usize,
    callbacks: HeaderCallbacks,
}

impl Default for ParserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserBuilder {
    pub fn new() -> Self {
        Self {
            scan_from: false,
            max_depth: DEFAULT_MAX_DEPTH,
            callbacks: HeaderCallbacks::default(),
        }
    }

    /// Treat the input as an mbox: messages are split on "From " lines
    pub fn scan_from(mut self, scan_from: bool) -> Self {
        self.scan_from = scan_from;
        self
    }

    /// Containers nested deeper than this are kept as leaves
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Call `handler` for every header whose name matches `matcher`
    pub fn header_callback<M, H>(mut self, matcher: M, handler: H) -> Self
    where
        M: HeaderMatcher + Send + 'static,
        H: HeaderHandler + Send + 'static,
    {
        self.callbacks.push(matcher, handler);
        self
    }

    /// Bind a parser to a stream, reading from the stream's current position
    pub fn build<S: Stream>(self, stream: S) -> Parser<S> {
        Parser {
            reader: LineReader::new(stream),
            boundaries: Boundaries::new(self.scan_from),
            callbacks: self.callbacks,
            scan_from: self.scan_from,
            max_depth: self.max_depth,
            envelope: None,
            diagnostics: Vec::new(),
        }
    }
}

/// Builds MIME trees from a stream in one forward pass
pub struct Parser<S> {
    reader: LineReader<S>,
    boundaries: Boundaries,
    callbacks: HeaderCallbacks,
    scan_from: bool,
    max_depth: usize,
    envelope: Option<String>,
    // Anomalies of the message being built
    diagnostics: Vec<Diagnostic>,
}

impl<S: Stream> Parser<S> {
    /// Parse the next message. Returns None at the end of the stream.
    pub fn next_message(&mut self) -> Result<Option<Message>> {
        self.boundaries.clear();
        if !self.skip_blank_lines()? {
            return Ok(None);
        }
        let message = self.parse_message(0, true)?;
        debug!(
            "message at {} with {} diagnostics",
            message.offset,
            message.diagnostics.len()
        );
        self.envelope = message.envelope.clone();
        Ok(Some(message))
    }

    /// Parse a bare MIME part, headers then body, with no message around it.
    /// Anomalies are logged but not kept.
    pub fn next_part(&mut self) -> Result<Option<Part>> {
        self.boundaries.clear();
        if self.reader.peek_line()?.is_none() {
            return Ok(None);
        }
        let block = self.headers()?;
        let content_type = self.content_type(&block.headers, ContentType::default());
        let part = self.parse_body(block.headers, content_type, 0)?;
        self.diagnostics.clear();
        Ok(Some(part))
    }

    /// Iterate over the remaining messages
    pub fn messages(&mut self) -> Messages<'_, S> {
        Messages { parser: self }
    }

    /// Envelope of the last message returned
    pub fn envelope(&self) -> Option<&str> {
        self.envelope.as_deref()
    }

    /// True when all input has been consumed
    pub fn eos(&self) -> bool {
        self.reader.eos()
    }

    /// Offset of the next unparsed byte
    pub fn tell(&self) -> u64 {
        self.reader.offset()
    }

    /// Rewind the stream to its start and forget all state
    pub fn reset(&mut self) -> Result<()> {
        self.reader.reset()?;
        self.boundaries.clear();
        self.envelope = None;
        self.diagnostics.clear();
        Ok(())
    }

    /// Return the stream, positioned after the last parsed byte
    pub fn into_inner(self) -> Result<S> {
        self.reader.into_inner()
    }

    //------ Messages ----------------------------------------------------------

    fn parse_message(&mut self, depth: usize, top_level: bool) -> Result<Message> {
        let outer = mem::take(&mut self.diagnostics);
        let offset = self.reader.offset();
        let envelope = self.envelope_line(top_level)?;
        if envelope.is_none() && top_level && self.scan_from {
            self.note(offset, Anomaly::MissingEnvelope);
        }
        let block = self.headers()?;
        let content_type = self.content_type(&block.headers, ContentType::default());
        let body = self.parse_body(block.headers.content_headers(), content_type, depth)?;
        let diagnostics = mem::replace(&mut self.diagnostics, outer);
        Ok(Message {
            envelope,
            offset,
            headers: block.headers,
            header_range: block.range,
            body,
            diagnostics,
        })
    }

    // Only mbox input has envelopes. A nested message only takes a "From "
    // line that is not a delimiter.
    fn envelope_line(&mut self, top_level: bool) -> Result<Option<String>> {
        if !self.scan_from {
            return Ok(None);
        }
        let kind = match self.peek_kind()? {
            Some((kind, _)) => kind,
            None => return Ok(None),
        };
        if !top_level && !kind.is_content() {
            return Ok(None);
        }
        let line = match self.reader.peek_line()? {
            Some(line) if line.starts_with(b"From ") => line,
            _ => return Ok(None),
        };
        let len = line.len();
        let text = String::from_utf8_lossy(&line[..len - eol_len(line)]).into_owned();
        self.reader.consume(len);
        trace!("envelope {}", text);
        Ok(Some(text))
    }

    fn skip_blank_lines(&mut self) -> Result<bool> {
        loop {
            let len = match self.reader.peek_line()? {
                None => return Ok(false),
                Some(line) if is_blank(line) => line.len(),
                Some(_) => return Ok(true),
            };
            self.reader.consume(len);
        }
    }

    //------ Headers -----------------------------------------------------------

    fn headers(&mut self) -> Result<HeaderBlock> {
        let boundaries = &self.boundaries;
        let block = scan_headers(&mut self.reader, &mut self.callbacks, |line, after_blank| {
            !boundaries.classify(line, after_blank).is_content()
        })?;
        if block.truncated {
            self.note(block.range.end, Anomaly::TruncatedHeaders);
        }
        Ok(block)
    }

    fn content_type(&mut self, headers: &Headers, default: ContentType) -> ContentType {
        match headers.get("Content-Type") {
            None => default,
            Some(header) => match ContentType::parse(header.value()) {
                Some(content_type) => content_type,
                None => {
                    self.note(header.offset(), Anomaly::InvalidContentType);
                    default
                }
            },
        }
    }

    //------ Bodies ------------------------------------------------------------

    fn parse_body(
        &mut self,
        headers: Headers,
        content_type: ContentType,
        depth: usize,
    ) -> Result<Part> {
        let container = content_type.is_multipart() || content_type.is_encapsulated();
        if container && depth > self.max_depth {
            let offset = self.reader.offset();
            self.note(offset, Anomaly::DepthLimit);
            return self.leaf(headers, content_type);
        }
        if content_type.is_multipart() {
            self.parse_multipart(headers, content_type, depth)
        } else if content_type.is_encapsulated() {
            self.parse_encapsulated(headers, content_type, depth)
        } else {
            self.leaf(headers, content_type)
        }
    }

    fn leaf(&mut self, headers: Headers, content_type: ContentType) -> Result<Part> {
        let (body, _) = self.scan_content()?;
        Ok(Part::Leaf(LeafPart {
            headers,
            content_type,
            body,
        }))
    }

    fn parse_multipart(
        &mut self,
        headers: Headers,
        content_type: ContentType,
        depth: usize,
    ) -> Result<Part> {
        let offset = self.reader.offset();
        let boundary = match content_type.boundary() {
            Some(boundary) => boundary.to_string(),
            None => {
                self.note(offset, Anomaly::MissingBoundary);
                return self.leaf(headers, content_type);
            }
        };
        let level = self.boundaries.push(&boundary);
        let (preamble, stop) = self.scan_content()?;
        if stop != Some(LineKind::Separator(level)) {
            self.note(offset, Anomaly::NoSeparators);
            let own_terminator = stop == Some(LineKind::Terminator(level));
            let body = self.without_separators(preamble, own_terminator)?;
            return Ok(Part::Leaf(LeafPart {
                headers,
                content_type,
                body,
            }));
        }

        let digest = content_type.is("multipart", "digest");
        let mut children = Vec::new();
        let terminated = loop {
            self.consume_line()?;
            let child = self.parse_child(depth + 1, digest)?;
            children.push(child);
            match self.peek_kind()? {
                Some((LineKind::Separator(i), _)) if i == level => continue,
                Some((LineKind::Terminator(i), _)) if i == level => break true,
                _ => break false,
            }
        };
        self.boundaries.pop();
        let epilogue = if terminated {
            self.consume_line()?;
            self.scan_content()?.0
        } else {
            let end = self.reader.offset();
            self.note(end, Anomaly::Unterminated);
            end..end
        };
        trace!("multipart {} with {} parts", boundary, children.len());
        Ok(Part::Multipart(Multipart {
            headers,
            content_type,
            boundary,
            children,
            preamble,
            epilogue,
        }))
    }

    // The whole body becomes one leaf. A closing boundary with no opening
    // one is part of that leaf.
    fn without_separators(
        &mut self,
        preamble: Range<u64>,
        own_terminator: bool,
    ) -> Result<Range<u64>> {
        self.boundaries.pop();
        if !own_terminator {
            return Ok(preamble);
        }
        let line_start = self.reader.offset();
        let line = self.consume_line()?;
        let (rest, _) = self.scan_content()?;
        let end = if rest.is_empty() {
            line_start + (line.len() - eol_len(&line)) as u64
        } else {
            rest.end
        };
        Ok(preamble.start..end)
    }

    fn parse_child(&mut self, depth: usize, digest: bool) -> Result<Part> {
        let block = self.headers()?;
        let default = if digest {
            ContentType::new("message", "rfc822")
        } else {
            ContentType::default()
        };
        let content_type = self.content_type(&block.headers, default);
        self.parse_body(block.headers, content_type, depth)
    }

    fn parse_encapsulated(
        &mut self,
        headers: Headers,
        content_type: ContentType,
        depth: usize,
    ) -> Result<Part> {
        let offset = self.reader.offset();
        let empty = match self.peek_kind()? {
            Some((kind, _)) => !kind.is_content(),
            None => true,
        };
        let message = if empty {
            self.note(offset, Anomaly::EmptyMessage);
            None
        } else {
            Some(Box::new(self.parse_message(depth + 1, false)?))
        };
        Ok(Part::Message(MessagePart {
            headers,
            content_type,
            message,
        }))
    }

    //------ Lines -------------------------------------------------------------

    // Consume content lines up to a delimiter (left in place) or the end of
    // the stream. The line break before a delimiter is not part of the range.
    fn scan_content(&mut self) -> Result<(Range<u64>, Option<LineKind>)> {
        let start = self.reader.offset();
        let mut consumed = false;
        loop {
            let offset = self.reader.offset();
            match self.peek_kind()? {
                None => return Ok((start..offset, None)),
                Some((LineKind::Content, len)) => {
                    self.reader.consume(len);
                    consumed = true;
                }
                Some((kind, _)) => {
                    let end = if consumed {
                        offset - self.reader.last_eol() as u64
                    } else {
                        start
                    };
                    return Ok((start..end, Some(kind)));
                }
            }
        }
    }

    fn peek_kind(&mut self) -> Result<Option<(LineKind, usize)>> {
        let after_blank = self.reader.after_blank();
        let boundaries = &self.boundaries;
        let line = self.reader.peek_line()?;
        Ok(line.map(|line| (boundaries.classify(line, after_blank), line.len())))
    }

    fn consume_line(&mut self) -> Result<Vec<u8>> {
        Ok(self.reader.next_line()?.unwrap_or_default())
    }

    fn note(&mut self, offset: u64, anomaly: Anomaly) {
        debug!("{} at offset {}", anomaly, offset);
        self.diagnostics.push(Diagnostic { offset, anomaly });
    }
}

/// Iterator over the messages of a [`Parser`]
pub struct Messages<'a, S> {
    parser: &'a mut Parser<S>,
}

impl<S: Stream> Iterator for Messages<'_, S> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_message().transpose()
    }
}
