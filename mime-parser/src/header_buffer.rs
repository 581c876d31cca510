use crate::header::Header;
use crate::reader::eol_len;
use std::mem;

// Concatenates folded header lines
#[derive(Default)]
pub(crate) struct HeaderBuffer {
    pending: Option<Header>,
}

impl HeaderBuffer {
    // Begin a new header, returning the previous one if it is now complete
    pub(crate) fn start(&mut self, name: &[u8], value: &[u8], offset: u64) -> Option<Header> {
        let value = trim_leading_wsp(value);
        mem::replace(&mut self.pending, Some(Header::new(name, value, offset))).map(complete)
    }

    // Append a continuation line verbatim. Returns false if there is no
    // header to continue.
    pub(crate) fn append(&mut self, line: &[u8]) -> bool {
        match self.pending.as_mut() {
            Some(header) => {
                header.value_mut().extend_from_slice(line);
                true
            }
            None => false,
        }
    }

    // Get the remaining header and clear the buffer
    pub(crate) fn take(&mut self) -> Option<Header> {
        self.pending.take().map(complete)
    }
}

fn trim_leading_wsp(value: &[u8]) -> &[u8] {
    let skip = value.iter().take_while(|&&c| c == b' ' || c == b'\t').count();
    &value[skip..]
}

// Drop the terminator of the last line
fn complete(mut header: Header) -> Header {
    let value = header.value_mut();
    let len = value.len() - eol_len(value);
    value.truncate(len);
    header
}
