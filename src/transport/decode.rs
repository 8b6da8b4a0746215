//! Incremental UTF-8 decoding of a chunked response body.
//!
//! Network chunks can split a multi-byte character. The incomplete tail
//! is held back until the next chunk arrives, invalid sequences become
//! U+FFFD.
use std::char::REPLACEMENT_CHARACTER;

#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            let (valid, invalid_len) = match std::str::from_utf8(&self.pending) {
                Ok(_) => (self.pending.len(), None),
                Err(e) => (e.valid_up_to(), e.error_len()),
            };
            out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));

            match invalid_len {
                Some(len) => {
                    out.push(REPLACEMENT_CHARACTER);
                    self.pending.drain(..valid + len);
                }
                // Either everything was consumed or the rest is an
                // incomplete character
                None => {
                    self.pending.drain(..valid);
                    break;
                }
            }
        }

        out
    }

    /// Flush at end of stream. A dangling partial character is replaced.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out
    }
}
