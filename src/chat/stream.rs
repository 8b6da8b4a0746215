//! Accumulates the text chunks of one in-flight answer.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
}

/// Append-only buffer for a single streamed answer.
///
/// Every accepted chunk republishes the full accumulated text so
/// consumers never have to track deltas themselves. Whatever was
/// accumulated before the stream ends, normally or not, stays
/// readable via `text()`.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    state: StreamState,
    chunks: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new answer, discarding text from any previous one.
    pub fn start(&mut self) {
        self.text.clear();
        self.chunks = 0;
        self.state = StreamState::Streaming;
    }

    /// Append a chunk and return the full text so far. Chunks arriving
    /// while idle are dropped.
    pub fn push(&mut self, chunk: &str) -> Option<&str> {
        if self.state != StreamState::Streaming {
            tracing::debug!("Dropping chunk received while idle");
            return None;
        }
        self.text.push_str(chunk);
        self.chunks += 1;
        Some(&self.text)
    }

    /// End of stream.
    pub fn finish(&mut self) -> &str {
        self.state = StreamState::Idle;
        &self.text
    }

    /// Stream halted by an error. The partial text is kept.
    pub fn fail(&mut self) -> &str {
        if self.state == StreamState::Streaming {
            tracing::debug!("Stream failed after {} chunk(s)", self.chunks);
        }
        self.state = StreamState::Idle;
        &self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == StreamState::Streaming
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_republishes_full_text() {
        let mut acc = StreamAccumulator::new();
        acc.start();
        assert_eq!(acc.push("He"), Some("He"));
        assert_eq!(acc.push("llo"), Some("Hello"));
        assert_eq!(acc.chunk_count(), 2);
        assert_eq!(acc.finish(), "Hello");
        assert_eq!(acc.state(), StreamState::Idle);
    }

    #[test]
    fn test_push_while_idle_is_dropped() {
        let mut acc = StreamAccumulator::new();
        assert_eq!(acc.push("stray"), None);
        assert_eq!(acc.text(), "");

        acc.start();
        acc.push("a");
        acc.finish();
        assert_eq!(acc.push("late"), None);
        assert_eq!(acc.text(), "a");
    }

    #[test]
    fn test_fail_keeps_partial_text() {
        let mut acc = StreamAccumulator::new();
        acc.start();
        acc.push("partial ");
        acc.push("answer");
        assert_eq!(acc.fail(), "partial answer");
        assert!(!acc.is_streaming());
    }

    #[test]
    fn test_start_resets_previous_answer() {
        let mut acc = StreamAccumulator::new();
        acc.start();
        acc.push("old");
        acc.finish();
        acc.start();
        assert_eq!(acc.text(), "");
        assert!(acc.is_streaming());
    }

    #[test]
    fn test_final_text_is_exact_concatenation() {
        let chunks = ["", "多", "字节", " ", "\n", "done"];
        let mut acc = StreamAccumulator::new();
        acc.start();
        for c in chunks {
            acc.push(c);
        }
        assert_eq!(acc.finish(), chunks.concat());
    }
}
