//! A streaming MIME structure parser.
//!
//! The parser reads any [`mime_stream::Stream`] line by line and builds a
//! tree of [`Part`]s for each message in one forward pass. Bodies are never
//! decoded or copied, leaf parts only record where their content lies in the
//! stream. In mbox mode (`scan_from`) the input is split into messages on
//! "From " envelope lines.
//!
//! # Example
//! ```
//! use mime_parser::ParserBuilder;
//! use mime_stream::MemStream;
//!
//! let mbox: &[u8] = b"From a@example.com Mon Jan  1 00:00:00 2024\n\
//! Subject: hi\n\
//! Content-Type: multipart/mixed; boundary=xyz\n\
//! \n\
//! --xyz\n\
//! \n\
//! first\n\
//! --xyz--\n";
//!
//! let stream = MemStream::from_slice(mbox);
//! let mut parser = ParserBuilder::new().scan_from(true).build(stream);
//! let message = parser.next_message()?.unwrap();
//! assert_eq!(message.envelope(), Some("From a@example.com Mon Jan  1 00:00:00 2024"));
//! assert_eq!(message.content_type().to_string(), "multipart/mixed");
//! assert_eq!(message.body().children().len(), 1);
//! assert!(parser.next_message()?.is_none());
//! # Ok::<(), mime_parser::Error>(())
//! ```
//!
//! Headers of interest can be reported while scanning:
//! ```
//! use mime_parser::{HeaderName, ParserBuilder};
//! use mime_stream::MemStream;
//! use std::sync::{Arc, Mutex};
//!
//! let found = Arc::new(Mutex::new(Vec::new()));
//! let sink = found.clone();
//! let mut parser = ParserBuilder::new()
//!     .header_callback(HeaderName::new("subject"), move |_: &[u8], value: &[u8], offset: u64| {
//!         sink.lock().unwrap().push((value.to_vec(), offset));
//!     })
//!     .build(MemStream::from_slice(b"To: x@y\nSubject: hello\n\nbody\n"));
//! parser.next_message()?;
//! assert_eq!(*found.lock().unwrap(), vec![(b"hello".to_vec(), 8)]);
//! # Ok::<(), mime_parser::Error>(())
//! ```

mod boundary;
mod content_type;
mod debug;
mod header;
mod header_buffer;
mod line_parser;
mod matcher;
mod message;
mod parser;
mod reader;
mod scanner;

pub use crate::content_type::ContentType;
pub use crate::header::{Header, Headers};
pub use crate::matcher::{HeaderHandler, HeaderMatcher, HeaderName};
pub use crate::message::{
    Anomaly, Diagnostic, LeafPart, Message, MessagePart, Multipart, Part,
};
pub use crate::parser::{Messages, Parser, ParserBuilder, DEFAULT_MAX_DEPTH};
pub use mime_stream::{Error, Result};
