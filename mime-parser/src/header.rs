use crate::debug::{dbg_single, BytesDbg};
use std::borrow::Cow;
use std::fmt;
use std::slice;

/// A single header field, as found in the stream
#[derive(PartialEq, Eq, Clone)]
pub struct Header {
    name: Vec<u8>,
    // Raw value, folding kept, final line break removed
    value: Vec<u8>,
    offset: u64,
}

impl Header {
    /// Create a header from its name, raw value and stream offset
    pub fn new<N, V>(name: N, value: V, offset: u64) -> Self
    where
        N: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        Self {
            name: name.into(),
            value: value.into(),
            offset,
        }
    }

    /// The field name as it appeared in the stream
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// The raw, undecoded value
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Byte offset of the start of the header line
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The value as text, invalid UTF-8 replaced
    pub fn value_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    /// Case insensitive name comparison
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.as_bytes())
    }

    pub(crate) fn value_mut(&mut self) -> &mut Vec<u8> {
        &mut self.value
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut d = f.debug_struct("Header");
        d.field("name", &BytesDbg(&self.name));
        d.field("value", &BytesDbg(&self.value));
        d.field("offset", &self.offset);
        d.finish()
    }
}

/// The headers of a message or part, in stream order.
/// Repeated fields are all kept.
#[derive(Default, PartialEq, Eq, Clone)]
pub struct Headers(Vec<Header>);

impl Headers {
    /// The first header with the given name
    pub fn get(&self, name: &str) -> Option<&Header> {
        self.0.iter().find(|h| h.is(name))
    }

    /// Every header with the given name
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Header> + 'a {
        self.0.iter().filter(move |h| h.is(name))
    }

    pub fn iter(&self) -> slice::Iter<'_, Header> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // The Content-* fields, which describe the body rather than the message
    pub(crate) fn content_headers(&self) -> Headers {
        let content = self
            .0
            .iter()
            .filter(|h| h.name.len() > 8 && h.name[..8].eq_ignore_ascii_case(b"content-"))
            .cloned()
            .collect();
        Headers(content)
    }

    pub(crate) fn push(&mut self, header: Header) {
        self.0.push(header)
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a Header;
    type IntoIter = slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut d = f.debug_list();
        for header in &self.0 {
            d.entry(&HeaderLine(header));
        }
        d.finish()
    }
}

// Compact single line debug output for header lists
struct HeaderLine<'a>(&'a Header);

impl fmt::Debug for HeaderLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut label = String::from_utf8_lossy(&self.0.name).into_owned();
        label.push_str(&format!("@{}", self.0.offset));
        dbg_single(f, &label, &self.0.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn headers() -> Headers {
        let mut ret = Headers::default();
        ret.push(Header::new("Received", "from a", 0));
        ret.push(Header::new("Content-Type", "text/plain", 15));
        ret.push(Header::new("received", "from b", 40));
        ret.push(Header::new("Subject", "hi", 55));
        ret
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let headers = headers();
        assert_eq!(headers.get("RECEIVED").unwrap().value(), b"from a");
        assert_eq!(headers.get("content-type").unwrap().offset(), 15);
        assert!(headers.get("X-Evolution").is_none());
    }

    #[test]
    fn duplicates_are_kept_in_order() {
        let headers = headers();
        let values: Vec<_> = headers.get_all("Received").map(|h| h.value_str()).collect();
        assert_eq!(values, vec!["from a", "from b"]);
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn content_subset() {
        let content = headers().content_headers();
        assert_eq!(content.len(), 1);
        assert!(content.iter().all(|h| h.is("Content-Type")));
    }

    #[test]
    fn debug_output_is_readable() {
        let header = Header::new("Subject", b"caf\xc3\xa9".to_vec(), 3);
        let text = format!("{:?}", header);
        assert!(text.contains("Subject"));
        assert!(text.contains("offset: 3"));
    }
}
