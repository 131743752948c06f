//! Stream Decoder
//!
//! Decodes the provider's SSE-style incremental body (`data: {json}` lines,
//! `data: [DONE]` terminator) into text fragments paired with a cumulative
//! progress estimate.
//!
//! Total response length is unknown until the stream ends, so progress is a
//! heuristic ramp: it never decreases within one call, stays below 100 while
//! the stream is open, and reaches exactly 100 only through the terminal
//! fragment emitted at normal completion.

use serde::Deserialize;
use tracing::debug;

use crate::constants::stream as stream_constants;
use crate::types::{ClassifiedError, ErrorKind};

/// One decoded increment: a text fragment and the progress estimate after it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFragment {
    pub text: String,
    pub progress: u8,
}

/// Incremental SSE decoder for one streaming call.
///
/// Holds only per-call state: the partial-line carry buffer and the progress
/// counter. Restart means constructing a fresh decoder.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: String,
    progress: u8,
    fragments: u32,
    finished: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cumulative progress estimate
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Number of content-bearing fragments decoded so far
    pub fn fragments_seen(&self) -> u32 {
        self.fragments
    }

    /// Whether the provider signalled end-of-stream
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one raw chunk from the transport; returns the content-bearing
    /// fragments it completed. Structural deltas (no text) are decoded but
    /// not forwarded.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<DecodedFragment>, ClassifiedError> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut fragments = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            if let Some(fragment) = self.decode_line(line.trim_end())? {
                fragments.push(fragment);
            }
        }

        Ok(fragments)
    }

    /// Terminal fragment: empty text at exactly 100, emitted once the
    /// provider's sequence terminates.
    pub fn finish(&mut self) -> DecodedFragment {
        self.finished = true;
        self.progress = stream_constants::PROGRESS_DONE;
        DecodedFragment {
            text: String::new(),
            progress: stream_constants::PROGRESS_DONE,
        }
    }

    fn decode_line(&mut self, line: &str) -> Result<Option<DecodedFragment>, ClassifiedError> {
        let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
            // Comment lines and blank keep-alives between events
            return Ok(None);
        };

        if payload == "[DONE]" {
            debug!(fragments = self.fragments, "Stream terminator received");
            self.finished = true;
            return Ok(None);
        }

        let chunk: ChatCompletionChunk = serde_json::from_str(payload).map_err(|e| {
            ClassifiedError::new(
                ErrorKind::StreamError,
                format!("malformed stream delta: {e}"),
            )
        })?;

        let text = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .unwrap_or_default();

        if text.is_empty() {
            return Ok(None);
        }

        self.fragments += 1;
        self.progress = self
            .progress
            .saturating_add(stream_constants::PROGRESS_STEP)
            .min(stream_constants::PROGRESS_CAP);

        Ok(Some(DecodedFragment {
            text,
            progress: self.progress,
        }))
    }
}

// Streaming wire types

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_line(text: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    #[test]
    fn test_decodes_fragments_in_order() {
        let mut decoder = StreamDecoder::new();
        let body = format!("{}{}{}", delta_line("A"), delta_line("B"), delta_line("C"));

        let fragments = decoder.feed(body.as_bytes()).unwrap();
        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();

        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_progress_monotone_and_capped() {
        let mut decoder = StreamDecoder::new();
        let mut last = 0;

        for _ in 0..40 {
            let fragments = decoder.feed(delta_line("x").as_bytes()).unwrap();
            let progress = fragments[0].progress;
            assert!(progress >= last);
            assert!(progress < 100);
            last = progress;
        }

        assert_eq!(decoder.progress(), 95);
    }

    #[test]
    fn test_finish_reports_exactly_100() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(delta_line("x").as_bytes()).unwrap();

        let terminal = decoder.finish();
        assert_eq!(terminal.text, "");
        assert_eq!(terminal.progress, 100);
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_partial_lines_buffered_across_chunks() {
        let mut decoder = StreamDecoder::new();
        let line = delta_line("hello");
        let (head, tail) = line.split_at(10);

        assert!(decoder.feed(head.as_bytes()).unwrap().is_empty());
        let fragments = decoder.feed(tail.as_bytes()).unwrap();

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "hello");
    }

    #[test]
    fn test_done_marker_sets_finished_without_fragment() {
        let mut decoder = StreamDecoder::new();
        let fragments = decoder.feed(b"data: [DONE]\n").unwrap();

        assert!(fragments.is_empty());
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_empty_deltas_not_forwarded() {
        let mut decoder = StreamDecoder::new();
        let body = "data: {\"choices\":[{\"delta\":{}}]}\n";

        let fragments = decoder.feed(body.as_bytes()).unwrap();
        assert!(fragments.is_empty());
        assert_eq!(decoder.progress(), 0);
    }

    #[test]
    fn test_non_data_lines_skipped() {
        let mut decoder = StreamDecoder::new();
        let fragments = decoder.feed(b": keep-alive\n\n").unwrap();
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_malformed_delta_is_stream_error() {
        let mut decoder = StreamDecoder::new();
        let err = decoder.feed(b"data: {not json}\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::StreamError);
    }

    #[cfg(test)]
    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn progress_never_decreases(fragments in proptest::collection::vec("[a-z]{1,8}", 1..50)) {
                let mut decoder = StreamDecoder::new();
                let mut last = 0u8;

                for text in &fragments {
                    for decoded in decoder.feed(delta_line(text).as_bytes()).unwrap() {
                        prop_assert!(decoded.progress >= last);
                        last = decoded.progress;
                    }
                }

                let terminal = decoder.finish();
                prop_assert!(terminal.progress >= last);
                prop_assert_eq!(terminal.progress, 100);
            }
        }
    }
}
