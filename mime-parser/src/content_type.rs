use crate::line_parser;
use std::fmt;

/// A parsed Content-Type value.
///
/// Type and subtype are lower-cased, parameter values are kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    media_type: String,
    subtype: String,
    params: Vec<(String, String)>,
}

impl Default for ContentType {
    fn default() -> Self {
        Self::new("text", "plain")
    }
}

impl ContentType {
    pub fn new(media_type: &str, subtype: &str) -> Self {
        Self {
            media_type: media_type.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Parse a raw header value, folding included. Returns None when the
    /// value has no recognisable type/subtype.
    pub fn parse(value: &[u8]) -> Option<Self> {
        let unfolded: Vec<u8> = value
            .iter()
            .copied()
            .filter(|&c| c != b'\r' && c != b'\n')
            .collect();
        let (_, (mtype, subtype, params)) = line_parser::content_type(&unfolded).ok()?;
        let params = params
            .into_iter()
            .map(|(k, v)| {
                (
                    String::from_utf8_lossy(&k).into_owned(),
                    String::from_utf8_lossy(&v).into_owned(),
                )
            })
            .collect();
        Some(Self {
            media_type: String::from_utf8_lossy(mtype).to_ascii_lowercase(),
            subtype: String::from_utf8_lossy(subtype).to_ascii_lowercase(),
            params,
        })
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Look up a parameter, ignoring the case of its name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// The multipart boundary, if present and not empty
    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary").filter(|b| !b.is_empty())
    }

    /// Compare type and subtype case insensitively, `*` matches anything
    pub fn is(&self, media_type: &str, subtype: &str) -> bool {
        (media_type == "*" || self.media_type.eq_ignore_ascii_case(media_type))
            && (subtype == "*" || self.subtype.eq_ignore_ascii_case(subtype))
    }

    pub fn is_multipart(&self) -> bool {
        self.media_type == "multipart"
    }

    /// message/rfc822, message/news and message/global carry a whole message
    pub fn is_encapsulated(&self) -> bool {
        self.media_type == "message"
            && matches!(self.subtype.as_str(), "rfc822" | "news" | "global")
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.subtype)
    }
}
