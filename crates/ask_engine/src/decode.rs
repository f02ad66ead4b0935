use encoding_rs::{CoderResult, Decoder, UTF_8};

/// Streaming UTF-8 decoder for answer bodies.
///
/// Keeps incomplete multi-byte sequences across chunk boundaries; malformed
/// bytes are replaced with U+FFFD. A leading BOM is passed through untouched
/// so the event-stream parser can strip it.
pub struct Utf8StreamDecoder {
    decoder: Decoder,
    had_errors: bool,
}

impl Default for Utf8StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_without_bom_handling(),
            had_errors: false,
        }
    }

    /// Decodes one chunk; trailing partial characters are held back.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.decode_inner(bytes, false)
    }

    /// Flushes whatever is held back at end of stream.
    pub fn finish(&mut self) -> String {
        self.decode_inner(&[], true)
    }

    /// Whether any replacement character has been produced so far.
    pub fn had_errors(&self) -> bool {
        self.had_errors
    }

    fn decode_inner(&mut self, bytes: &[u8], last: bool) -> String {
        let mut out = String::new();
        let mut src = bytes;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or(src.len().saturating_mul(3).saturating_add(4));
            out.reserve(needed);
            let (result, read, had_errors) = self.decoder.decode_to_string(src, &mut out, last);
            self.had_errors |= had_errors;
            src = &src[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
        out
    }
}
