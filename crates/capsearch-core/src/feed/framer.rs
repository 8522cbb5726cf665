//! Newline framing for the result feed
//!
//! Buffers at the byte level so a multi-byte character split across two
//! network chunks is decoded only once the whole line has arrived.

use bytes::BytesMut;
use tracing::{debug, warn};

/// A non-empty trailing buffer that never got its newline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedRecord {
    pub len: usize,
}

/// Splits an arbitrary chunk sequence into complete text lines
#[derive(Debug, Default)]
pub struct LineFramer {
    /// Bytes of the line currently being received
    partial: BytesMut,
    /// Prefix of `partial` already known to hold no newline
    scanned: usize,
    /// Bytes received counter
    bytes_received: usize,
    /// Complete non-blank lines produced
    lines_emitted: usize,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every line it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.bytes_received += chunk.len();
        self.partial.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(offset) = self.partial[self.scanned..].iter().position(|b| *b == b'\n') {
            let pos = self.scanned + offset;
            let line = self.partial.split_to(pos + 1);
            self.scanned = 0;
            if let Some(text) = self.line_text(&line[..pos]) {
                lines.push(text);
            }
        }
        self.scanned = self.partial.len();

        debug!(
            "Framer chunk: {} bytes (total: {} bytes), {} lines, {} bytes pending",
            chunk.len(),
            self.bytes_received,
            lines.len(),
            self.partial.len()
        );
        lines
    }

    /// Signal end of input; a half-delivered record is dropped
    pub fn finish(&mut self) -> Option<TruncatedRecord> {
        let rest = self.partial.split();
        self.scanned = 0;
        if rest.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        warn!(
            "Discarding truncated record: {} bytes without trailing newline",
            rest.len()
        );
        Some(TruncatedRecord { len: rest.len() })
    }

    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    pub fn lines_emitted(&self) -> usize {
        self.lines_emitted
    }

    fn line_text(&mut self, raw: &[u8]) -> Option<String> {
        let text = match std::str::from_utf8(raw) {
            Ok(text) => text.to_string(),
            Err(e) => {
                warn!("Feed line is not valid UTF-8 ({}), decoding lossily", e);
                String::from_utf8_lossy(raw).into_owned()
            }
        };
        if text.trim().is_empty() {
            return None;
        }
        self.lines_emitted += 1;
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk_lines() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"{\"a\":\"A\"}\nnull\n");
        assert_eq!(lines, vec!["{\"a\":\"A\"}", "null"]);
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_partial_line_kept_across_chunks() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"{\"classname\":").is_empty());
        assert!(framer.feed(b"\"svc\"}").is_empty());
        assert_eq!(framer.feed(b"\nnu"), vec!["{\"classname\":\"svc\"}"]);
        assert_eq!(framer.feed(b"ll\n"), vec!["null"]);
    }

    #[test]
    fn test_blank_lines_suppressed() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"\n   \n\t\nnull\n\n");
        assert_eq!(lines, vec!["null"]);
        assert_eq!(framer.lines_emitted(), 1);
    }

    #[test]
    fn test_split_multibyte_character() {
        let line = "{\"yt\":\"Vidéo – 日本\"}";
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');

        // Every possible split point, including inside multi-byte sequences
        for split in 0..bytes.len() {
            let mut framer = LineFramer::new();
            let mut lines = framer.feed(&bytes[..split]);
            lines.extend(framer.feed(&bytes[split..]));
            assert_eq!(lines, vec![line.to_string()], "split at {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time_reconstructs_line() {
        let line = "{\"note\":\"ünïcödé ✓ 🎬\"}";
        let mut framer = LineFramer::new();
        let mut lines = Vec::new();
        for b in line.as_bytes().iter().chain(b"\n") {
            lines.extend(framer.feed(std::slice::from_ref(b)));
        }
        assert_eq!(lines, vec![line.to_string()]);
        assert_eq!(framer.bytes_received(), line.len() + 1);
    }

    #[test]
    fn test_long_line_scan_resumes() {
        let mut framer = LineFramer::new();
        for _ in 0..100 {
            assert!(framer.feed(b"xxxxxxxxxx").is_empty());
        }
        // Only the new tail is searched once the prefix is known newline-free
        assert_eq!(framer.scanned, 1000);

        let lines = framer.feed(b"y\nab");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 1001);
        assert_eq!(framer.scanned, 2);
        assert_eq!(framer.feed(b"c\n"), vec!["abc"]);
        assert_eq!(framer.scanned, 0);
    }

    #[test]
    fn test_truncated_trailing_record() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.feed(b"null\n{\"classname\":"), vec!["null"]);
        assert_eq!(framer.finish(), Some(TruncatedRecord { len: 13 }));
        // The buffer is gone after finishing
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_whitespace_tail_is_not_truncation() {
        let mut framer = LineFramer::new();
        framer.feed(b"null\n  ");
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"ab\xffcd\n");
        assert_eq!(lines, vec!["ab\u{FFFD}cd".to_string()]);
    }
}
