use display_bytes::{display_bytes, display_bytes_string};
use std::fmt;

// Debug a single entry tuple
pub(crate) fn dbg_single(f: &mut fmt::Formatter<'_>, name: &str, value: &[u8]) -> fmt::Result {
    let mut d = f.debug_tuple(name);
    d.field(&display_bytes_string(value));
    d.finish()
}

// Debug a byte string as readable text
pub(crate) struct BytesDbg<'a>(pub(crate) &'a [u8]);

impl fmt::Debug for BytesDbg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", display_bytes(self.0))
    }
}
