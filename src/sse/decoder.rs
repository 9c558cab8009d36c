//! Incremental byte-to-line decoding for SSE bodies.
//!
//! Chunks arrive with arbitrary boundaries: a line, or even a single UTF-8
//! character, may be split across two reads. [`LineDecoder`] carries both the
//! incomplete byte sequence and the unterminated text tail between calls.

/// Stateful decoder turning byte chunks into complete `\n`-terminated lines.
#[derive(Debug, Default, Clone)]
pub struct LineDecoder {
    /// Bytes of a multi-byte character whose remainder has not arrived yet.
    pending: Vec<u8>,
    /// Decoded text after the last newline.
    buffer: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completes, in order.
    ///
    /// Lines keep their original whitespace (including a trailing `\r`);
    /// the text after the last `\n` stays buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode_into_buffer(chunk);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        // `complete` ends with '\n', so the final split element is empty.
        let mut lines: Vec<String> = complete.split('\n').map(str::to_string).collect();
        lines.pop();
        lines
    }

    /// Drain whatever is left once the byte stream has ended.
    ///
    /// An incomplete trailing character decodes to U+FFFD. Returns `None`
    /// when nothing is buffered.
    pub fn flush(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            self.pending.clear();
            self.buffer.push(char::REPLACEMENT_CHARACTER);
        }

        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    /// Text currently held back as an unterminated line.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Whether an incomplete multi-byte character is waiting for more bytes.
    pub fn has_pending_bytes(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.buffer.clear();
    }

    fn decode_into_buffer(&mut self, chunk: &[u8]) {
        let owned;
        let mut input: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            self.pending.extend_from_slice(chunk);
            owned = std::mem::take(&mut self.pending);
            &owned
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    // Safe: `valid_up_to` marks the end of a valid prefix.
                    if let Ok(text) = std::str::from_utf8(valid) {
                        self.buffer.push_str(text);
                    }

                    match err.error_len() {
                        Some(invalid_len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[invalid_len..];
                        }
                        None => {
                            // Truncated sequence at the end of the input.
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(decoder: &mut LineDecoder, chunks: &[&[u8]]) -> Vec<String> {
        chunks.iter().flat_map(|c| decoder.feed(c)).collect()
    }

    #[test]
    fn test_single_complete_line() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.feed(b"data: {}\n"), vec!["data: {}"]);
        assert_eq!(decoder.buffered(), "");
    }

    #[test]
    fn test_tail_is_withheld() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.feed(b"first\nsecond"), vec!["first"]);
        assert_eq!(decoder.buffered(), "second");

        assert_eq!(decoder.feed(b" half\n"), vec!["second half"]);
        assert_eq!(decoder.buffered(), "");
    }

    #[test]
    fn test_no_newline_emits_nothing() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.feed(b"data: {\"a\"").is_empty());
        assert!(decoder.feed(b":1}").is_empty());
        assert_eq!(decoder.buffered(), "data: {\"a\":1}");
    }

    #[test]
    fn test_whitespace_is_preserved() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.feed(b"  data: 1  \r\n\n");
        assert_eq!(lines, vec!["  data: 1  \r", ""]);
    }

    #[test]
    fn test_chunking_does_not_change_lines() {
        let body = "data: {\"x\":1}\n\ndata: {\"text\":\"h\u{e9}llo \u{1F600}\"}\nrandom\ntail".as_bytes();
        let expected = vec![
            "data: {\"x\":1}".to_string(),
            String::new(),
            "data: {\"text\":\"h\u{e9}llo \u{1F600}\"}".to_string(),
            "random".to_string(),
        ];

        for size in 1..=body.len() {
            let mut decoder = LineDecoder::new();
            let chunks: Vec<&[u8]> = body.chunks(size).collect();
            let lines = feed_all(&mut decoder, &chunks);
            assert_eq!(lines, expected, "chunk size {}", size);
            assert_eq!(decoder.buffered(), "tail", "chunk size {}", size);
        }
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let emoji = "\u{1F600}".as_bytes();
        assert_eq!(emoji.len(), 4);

        let mut decoder = LineDecoder::new();
        assert!(decoder.feed(&emoji[..1]).is_empty());
        assert!(decoder.has_pending_bytes());
        assert!(decoder.feed(&emoji[1..3]).is_empty());
        let mut last = emoji[3..].to_vec();
        last.push(b'\n');
        assert_eq!(decoder.feed(&last), vec!["\u{1F600}"]);
        assert!(!decoder.has_pending_bytes());
    }

    #[test]
    fn test_invalid_bytes_become_replacement_character() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.feed(b"ab\xFFcd\n");
        assert_eq!(lines, vec!["ab\u{FFFD}cd"]);
    }

    #[test]
    fn test_flush_returns_unterminated_tail() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"line\ndata: [DONE]");
        assert_eq!(decoder.flush(), Some("data: [DONE]".to_string()));
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn test_flush_empty_decoder() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.flush(), None);
        decoder.feed(b"complete\n");
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn test_flush_truncated_character() {
        let mut decoder = LineDecoder::new();
        decoder.feed(&"\u{e9}".as_bytes()[..1]);
        assert_eq!(decoder.flush(), Some("\u{FFFD}".to_string()));
    }

    #[test]
    fn test_reset() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"partial");
        decoder.feed(&"\u{e9}".as_bytes()[..1]);
        decoder.reset();
        assert_eq!(decoder.buffered(), "");
        assert!(!decoder.has_pending_bytes());
        assert_eq!(decoder.flush(), None);
    }
}
