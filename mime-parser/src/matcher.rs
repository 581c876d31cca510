use regex::Regex;

/// Decides whether a header, by name, is of interest
pub trait HeaderMatcher {
    fn matches(&self, name: &[u8]) -> bool;
}

/// Receives every header whose name matched: name, raw value and the
/// absolute offset of the header line
pub trait HeaderHandler {
    fn header(&mut self, name: &[u8], value: &[u8], offset: u64);
}

impl<F> HeaderHandler for F
where
    F: FnMut(&[u8], &[u8], u64),
{
    fn header(&mut self, name: &[u8], value: &[u8], offset: u64) {
        self(name, value, offset)
    }
}

// Non UTF-8 names never match a regex
impl HeaderMatcher for Regex {
    fn matches(&self, name: &[u8]) -> bool {
        match std::str::from_utf8(name) {
            Ok(name) => self.is_match(name),
            Err(_) => false,
        }
    }
}

/// Matches one header name exactly, ignoring case
#[derive(Debug, Clone)]
pub struct HeaderName(String);

impl HeaderName {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }
}

impl HeaderMatcher for HeaderName {
    fn matches(&self, name: &[u8]) -> bool {
        name.eq_ignore_ascii_case(self.0.as_bytes())
    }
}

type Entry = (Box<dyn HeaderMatcher + Send>, Box<dyn HeaderHandler + Send>);

// Matcher and handler pairs, called in registration order
#[derive(Default)]
pub(crate) struct HeaderCallbacks {
    entries: Vec<Entry>,
}

impl HeaderCallbacks {
    pub(crate) fn push<M, H>(&mut self, matcher: M, handler: H)
    where
        M: HeaderMatcher + Send + 'static,
        H: HeaderHandler + Send + 'static,
    {
        self.entries.push((Box::new(matcher), Box::new(handler)));
    }

    // Fire every matching handler for a completed header
    pub(crate) fn dispatch(&mut self, name: &[u8], value: &[u8], offset: u64) {
        for (matcher, handler) in self.entries.iter_mut() {
            if matcher.matches(name) {
                handler.header(name, value, offset);
            }
        }
    }
}
