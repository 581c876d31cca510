use crate::content_type::ContentType;
use crate::header::Headers;
use std::fmt;
use std::ops::Range;

/// A structural problem found while parsing. Anomalies never fail a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// A multipart without a usable boundary parameter
    MissingBoundary,
    /// A multipart body that never mentions its boundary
    NoSeparators,
    /// A multipart that ended without its closing boundary
    Unterminated,
    /// An encapsulated message with no content
    EmptyMessage,
    /// The stream ended inside a header block
    TruncatedHeaders,
    /// A Content-Type header that could not be parsed
    InvalidContentType,
    /// Nesting deeper than the configured limit
    DepthLimit,
    /// A message in mbox mode without a "From " line
    MissingEnvelope,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            Anomaly::MissingBoundary => "multipart without boundary",
            Anomaly::NoSeparators => "multipart without separators",
            Anomaly::Unterminated => "unterminated multipart",
            Anomaly::EmptyMessage => "empty encapsulated message",
            Anomaly::TruncatedHeaders => "truncated header block",
            Anomaly::InvalidContentType => "invalid content type",
            Anomaly::DepthLimit => "nesting too deep",
            Anomaly::MissingEnvelope => "missing envelope",
        };
        f.write_str(text)
    }
}

/// An anomaly and the stream offset where it was noticed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    pub offset: u64,
    pub anomaly: Anomaly,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at offset {}", self.anomaly, self.offset)
    }
}

/// A part whose content is not interpreted
#[derive(Debug, Clone, PartialEq)]
pub struct LeafPart {
    pub(crate) headers: Headers,
    pub(crate) content_type: ContentType,
    pub(crate) body: Range<u64>,
}

/// A multipart container
#[derive(Debug, Clone, PartialEq)]
pub struct Multipart {
    pub(crate) headers: Headers,
    pub(crate) content_type: ContentType,
    pub(crate) boundary: String,
    pub(crate) children: Vec<Part>,
    pub(crate) preamble: Range<u64>,
    pub(crate) epilogue: Range<u64>,
}

impl Multipart {
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Text before the first separator
    pub fn preamble(&self) -> Range<u64> {
        self.preamble.clone()
    }

    /// Text after the closing boundary
    pub fn epilogue(&self) -> Range<u64> {
        self.epilogue.clone()
    }
}

/// An encapsulated message (message/rfc822 and friends)
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePart {
    pub(crate) headers: Headers,
    pub(crate) content_type: ContentType,
    pub(crate) message: Option<Box<Message>>,
}

/// A node of the MIME tree
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Leaf(LeafPart),
    Multipart(Multipart),
    Message(MessagePart),
}

impl Part {
    pub fn headers(&self) -> &Headers {
        match self {
            Part::Leaf(p) => &p.headers,
            Part::Multipart(p) => &p.headers,
            Part::Message(p) => &p.headers,
        }
    }

    pub fn content_type(&self) -> &ContentType {
        match self {
            Part::Leaf(p) => &p.content_type,
            Part::Multipart(p) => &p.content_type,
            Part::Message(p) => &p.content_type,
        }
    }

    /// Children of a multipart, empty for other parts
    pub fn children(&self) -> &[Part] {
        match self {
            Part::Multipart(p) => &p.children,
            _ => &[],
        }
    }

    /// The encapsulated message, if any
    pub fn message(&self) -> Option<&Message> {
        match self {
            Part::Message(p) => p.message.as_deref(),
            _ => None,
        }
    }

    /// Location of a leaf body in the source stream
    pub fn body_range(&self) -> Option<Range<u64>> {
        match self {
            Part::Leaf(p) => Some(p.body.clone()),
            _ => None,
        }
    }

    pub fn as_multipart(&self) -> Option<&Multipart> {
        match self {
            Part::Multipart(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Part::Leaf(_))
    }

    /// Depth first, pre-order. Encapsulated messages are entered.
    pub fn walk<F>(&self, mut f: F)
    where
        F: FnMut(&Part, usize),
    {
        self.walk_at(&mut f, 0)
    }

    fn walk_at(&self, f: &mut dyn FnMut(&Part, usize), depth: usize) {
        f(self, depth);
        match self {
            Part::Multipart(p) => {
                for child in &p.children {
                    child.walk_at(f, depth + 1);
                }
            }
            Part::Message(p) => {
                if let Some(message) = &p.message {
                    message.body.walk_at(f, depth + 1);
                }
            }
            Part::Leaf(_) => (),
        }
    }
}

/// A parsed message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub(crate) envelope: Option<String>,
    pub(crate) offset: u64,
    pub(crate) headers: Headers,
    pub(crate) header_range: Range<u64>,
    pub(crate) body: Part,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl Message {
    /// The mbox "From " line without its line break
    pub fn envelope(&self) -> Option<&str> {
        self.envelope.as_deref()
    }

    /// Offset of the envelope, or of the headers when there is none
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header_range(&self) -> Range<u64> {
        self.header_range.clone()
    }

    /// The root part
    pub fn body(&self) -> &Part {
        &self.body
    }

    pub fn content_type(&self) -> &ContentType {
        self.body.content_type()
    }

    /// Anomalies found in this message, nested messages keep their own
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Visit every part with its depth, the root part at depth 0
    pub fn walk<F>(&self, f: F)
    where
        F: FnMut(&Part, usize),
    {
        self.body.walk(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leaf(subtype: &str) -> Part {
        Part::Leaf(LeafPart {
            headers: Headers::default(),
            content_type: ContentType::new("text", subtype),
            body: 0..0,
        })
    }

    #[test]
    fn walk_visits_nested_messages() {
        let inner = Message {
            envelope: None,
            offset: 0,
            headers: Headers::default(),
            header_range: 0..0,
            body: leaf("html"),
            diagnostics: Vec::new(),
        };
        let root = Part::Multipart(Multipart {
            headers: Headers::default(),
            content_type: ContentType::new("multipart", "mixed"),
            boundary: "b".to_string(),
            children: vec![
                leaf("plain"),
                Part::Message(MessagePart {
                    headers: Headers::default(),
                    content_type: ContentType::new("message", "rfc822"),
                    message: Some(Box::new(inner)),
                }),
            ],
            preamble: 0..0,
            epilogue: 0..0,
        });
        let mut seen = Vec::new();
        root.walk(|part, depth| seen.push(format!("{}:{}", depth, part.content_type())));
        assert_eq!(
            seen,
            vec!["0:multipart/mixed", "1:text/plain", "1:message/rfc822", "2:text/html"]
        );
        assert_eq!(root.children().len(), 2);
        assert!(root.children()[1].message().is_some());
        assert_eq!(root.body_range(), None);
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic {
            offset: 42,
            anomaly: Anomaly::Unterminated,
        };
        assert_eq!(d.to_string(), "unterminated multipart at offset 42");
    }
}
