// How a line relates to the delimiters currently in scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    Content,
    // Index into the boundary stack, 0 is outermost
    Separator(usize),
    Terminator(usize),
    Envelope,
}

impl LineKind {
    pub(crate) fn is_content(self) -> bool {
        self == LineKind::Content
    }
}

// Stack of active multipart boundaries plus the mbox envelope rule
#[derive(Debug, Default)]
pub(crate) struct Boundaries {
    frames: Vec<Vec<u8>>,
    scan_from: bool,
}

impl Boundaries {
    pub(crate) fn new(scan_from: bool) -> Self {
        Self {
            frames: Vec::new(),
            scan_from,
        }
    }

    // Returns the index of the new frame
    pub(crate) fn push(&mut self, boundary: &str) -> usize {
        let mut frame = Vec::with_capacity(boundary.len() + 2);
        frame.extend_from_slice(b"--");
        frame.extend_from_slice(boundary.as_bytes());
        self.frames.push(frame);
        self.frames.len() - 1
    }

    pub(crate) fn pop(&mut self) {
        self.frames.pop();
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
    }

    // Innermost boundary is tried first. An envelope line must follow a
    // blank line or start the stream.
    pub(crate) fn classify(&self, line: &[u8], after_blank: bool) -> LineKind {
        if line.starts_with(b"--") {
            for (i, frame) in self.frames.iter().enumerate().rev() {
                if !line.starts_with(frame) {
                    continue;
                }
                let rest = &line[frame.len()..];
                if rest.starts_with(b"--") && all_space(&rest[2..]) {
                    return LineKind::Terminator(i);
                }
                if all_space(rest) {
                    return LineKind::Separator(i);
                }
            }
        }
        if self.scan_from && after_blank && line.starts_with(b"From ") {
            return LineKind::Envelope;
        }
        LineKind::Content
    }
}

fn all_space(buf: &[u8]) -> bool {
    buf.iter().all(|c| c.is_ascii_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;

    #[test]
    fn separators_and_terminators() {
        let mut b = Boundaries::new(false);
        b.push("outer");
        b.push("inner");
        assert_eq!(b.classify(b"--inner\r\n", false), LineKind::Separator(1));
        assert_eq!(b.classify(b"--outer--  \n", false), LineKind::Terminator(0));
        assert_eq!(b.classify(b"--outer", false), LineKind::Separator(0));
        assert_matches!(b.classify(b"--outerx\n", false), LineKind::Content);
        assert_matches!(b.classify(b"--inner-- trailing\n", false), LineKind::Content);
        b.pop();
        assert_eq!(b.classify(b"--inner\n", false), LineKind::Content);
    }

    #[test]
    fn innermost_wins_on_identical_boundaries() {
        let mut b = Boundaries::new(false);
        b.push("same");
        b.push("same");
        assert_eq!(b.classify(b"--same\n", false), LineKind::Separator(1));
        assert_eq!(b.classify(b"--same--\n", false), LineKind::Terminator(1));
    }

    #[test]
    fn envelope_needs_blank_line_and_scan_mode() {
        let scan = Boundaries::new(true);
        assert_eq!(scan.classify(b"From a@b Mon\n", true), LineKind::Envelope);
        assert!(scan.classify(b"From a@b Mon\n", false).is_content());
        assert!(scan.classify(b">From a@b\n", true).is_content());
        let plain = Boundaries::new(false);
        assert!(plain.classify(b"From a@b Mon\n", true).is_content());
    }
}
