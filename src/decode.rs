//! Incremental UTF-8 decoding of a chunked response body.
//!
//! Response chunks carry no alignment guarantee, so a multi-byte character
//! may be split across two (or more) chunks. [`Utf8StreamDecoder`] holds the
//! incomplete tail of one chunk and completes it with the head of the next.
//!
//! # Example
//!
//! ```rust
//! use stream_chat::decode::Utf8StreamDecoder;
//!
//! let mut decoder = Utf8StreamDecoder::new();
//! let euro = "€".as_bytes();
//! let mut text = decoder.decode(&euro[..1]);
//! text.push_str(&decoder.decode(&euro[1..]));
//! text.push_str(&decoder.finish());
//! assert_eq!(text, "€");
//! ```

use std::borrow::Cow;

const REPLACEMENT: char = '\u{FFFD}';
const BOM: char = '\u{FEFF}';

/// Streaming UTF-8 decoder.
///
/// Invalid sequences become U+FFFD, one per maximal invalid subpart. A
/// byte-order mark at the very start of the stream is dropped.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    /// Incomplete trailing sequence from the previous chunk (at most 3 bytes).
    pending: Vec<u8>,
    /// Whether any text has been produced yet (for BOM stripping).
    started: bool,
}

impl Utf8StreamDecoder {
    /// Create a decoder for a new stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning every character it completes.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let input: Cow<'_, [u8]> = if self.pending.is_empty() {
            Cow::Borrowed(chunk)
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            Cow::Owned(joined)
        };

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, tail) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &tail[len..];
                        }
                        None => {
                            // Truncated sequence at the end of the chunk.
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        self.strip_bom(out)
    }

    /// Flush the decoder at end of stream.
    ///
    /// A dangling partial sequence can never complete and is reported as a
    /// single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        self.strip_bom(REPLACEMENT.to_string())
    }

    /// Whether an incomplete sequence is waiting for more bytes.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn strip_bom(&mut self, text: String) -> String {
        if self.started || text.is_empty() {
            return text;
        }
        self.started = true;
        match text.strip_prefix(BOM) {
            Some(stripped) => stripped.to_string(),
            None => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"hello "), "hello ");
        assert_eq!(decoder.decode(b"world"), "world");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_three_byte_char_split_across_chunks() {
        let bytes = "질문 안녕".as_bytes();
        // one byte into "안" (EC 95 88)
        let split = "질문 ".len() + 1;
        let mut decoder = Utf8StreamDecoder::new();

        let first = decoder.decode(&bytes[..split]);
        assert!(decoder.has_pending());
        let second = decoder.decode(&bytes[split..]);

        assert_eq!(format!("{first}{second}"), "질문 안녕");
        assert!(!first.contains(REPLACEMENT));
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_four_byte_char_one_byte_per_chunk() {
        let crab = "🦀".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();
        let mut out = String::new();
        for b in crab {
            out.push_str(&decoder.decode(std::slice::from_ref(b)));
        }
        out.push_str(&decoder.finish());
        assert_eq!(out, "🦀");
    }

    #[test]
    fn test_invalid_byte_replaced() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_truncated_sequence_flushed_on_finish() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"ok\xE2\x82"), "ok");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_leading_bom_stripped_once() {
        let mut decoder = Utf8StreamDecoder::new();
        // BOM split across the first two chunks.
        assert_eq!(decoder.decode(b"\xEF\xBB"), "");
        assert_eq!(decoder.decode(b"\xBFhi"), "hi");
        assert_eq!(decoder.decode("\u{FEFF}".as_bytes()), "\u{FEFF}");
    }
}
