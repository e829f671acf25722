//! SSE frame parsing for streamed chat responses.
//!
//! The backend emits `text/event-stream` frames of the form
//! `data: {"delta": "<fragment>"}` terminated by `data: [DONE]`. Network
//! reads do not align with frame boundaries, so the parser keeps the
//! unterminated tail of the previous read and assigns chunk indices in
//! arrival order.

use crate::domain::conversation::StreamChunk;
use crate::ports::ProtocolError;

use super::dto::StreamFrame;

/// Marker the backend sends as the terminal frame.
const DONE_MARKER: &str = "[DONE]";

/// Incremental SSE parser; one instance per open stream.
pub(crate) struct SseParser {
    // Byte buffer, not text: a read may end in the middle of a UTF-8
    // sequence, so decoding happens per complete line.
    buf: Vec<u8>,
    next_index: u64,
    finished: bool,
}

impl SseParser {
    pub(crate) fn new() -> Self {
        Self {
            buf: Vec::new(),
            next_index: 0,
            finished: false,
        }
    }

    /// Feeds one network read and returns the chunks completed by it.
    ///
    /// Frames after the `[DONE]` marker are ignored. A frame that is not
    /// valid JSON yields a `ProtocolError` in place of a chunk.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk, ProtocolError>> {
        let mut out = Vec::new();
        self.buf.extend_from_slice(bytes);

        while let Some(newline) = self.buf.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buf.drain(..=newline).collect();
            if self.finished {
                continue;
            }
            let line = String::from_utf8_lossy(&line_bytes);
            if let Some(result) = self.parse_line(line.trim_end_matches(['\n', '\r'])) {
                out.push(result);
            }
        }

        out
    }

    /// Parses a single complete line. Blank lines, comments, and non-data
    /// fields are not frames and yield nothing.
    fn parse_line(&mut self, line: &str) -> Option<Result<StreamChunk, ProtocolError>> {
        let data = line.strip_prefix("data: ").or_else(|| {
            line.strip_prefix("data:")
        })?;

        if data.trim() == DONE_MARKER {
            self.finished = true;
            let chunk = StreamChunk::done(self.next_index);
            self.next_index += 1;
            return Some(Ok(chunk));
        }

        match serde_json::from_str::<StreamFrame>(data) {
            Ok(frame) => {
                let chunk = StreamChunk::content(self.next_index, frame.delta);
                self.next_index += 1;
                Some(Ok(chunk))
            }
            Err(e) => {
                if data.trim().is_empty() {
                    return None;
                }
                tracing::warn!("unparseable stream frame: {}", e);
                Some(Err(ProtocolError::malformed(format!(
                    "bad data frame: {}",
                    e
                ))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(parser: &mut SseParser, input: &str) -> Vec<Result<StreamChunk, ProtocolError>> {
        parser.feed(input.as_bytes())
    }

    #[test]
    fn parses_single_delta_frame() {
        let mut parser = SseParser::new();
        let chunks = collect(&mut parser, "data: {\"delta\": \"Hello\"}\n\n");

        assert_eq!(chunks.len(), 1);
        let chunk = chunks[0].as_ref().unwrap();
        assert_eq!(chunk.index, 0);
        assert_eq!(chunk.delta, "Hello");
        assert!(!chunk.done);
    }

    #[test]
    fn parses_multiple_frames_in_one_read() {
        let mut parser = SseParser::new();
        let chunks = collect(
            &mut parser,
            "data: {\"delta\": \"Hello, \"}\n\ndata: {\"delta\": \"world\"}\n\ndata: [DONE]\n\n",
        );

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].as_ref().unwrap().delta, "Hello, ");
        assert_eq!(chunks[1].as_ref().unwrap().delta, "world");
        assert!(chunks[2].as_ref().unwrap().done);
    }

    #[test]
    fn assigns_indices_in_arrival_order() {
        let mut parser = SseParser::new();
        let chunks = collect(
            &mut parser,
            "data: {\"delta\": \"a\"}\n\ndata: {\"delta\": \"b\"}\n\ndata: [DONE]\n\n",
        );

        let indices: Vec<u64> = chunks.iter().map(|c| c.as_ref().unwrap().index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn reassembles_frame_split_across_reads() {
        let mut parser = SseParser::new();
        let first = parser.feed(b"data: {\"del");
        assert!(first.is_empty());

        let second = parser.feed(b"ta\": \"Hello\"}\n\n");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].as_ref().unwrap().delta, "Hello");
    }

    #[test]
    fn multibyte_character_split_across_reads_survives() {
        let mut parser = SseParser::new();
        let frame = "data: {\"delta\": \"Grüße\"}\n\n".as_bytes();
        // Byte 20 is the second byte of 'ü'; split inside the character.
        assert!(parser.feed(&frame[..20]).is_empty());

        let chunks = parser.feed(&frame[20..]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta, "Grüße");
    }

    #[test]
    fn handles_crlf_line_endings() {
        let mut parser = SseParser::new();
        let chunks = collect(&mut parser, "data: {\"delta\": \"hi\"}\r\n\r\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta, "hi");
    }

    #[test]
    fn done_marker_yields_terminal_chunk() {
        let mut parser = SseParser::new();
        let chunks = collect(&mut parser, "data: [DONE]\n\n");

        assert_eq!(chunks.len(), 1);
        let chunk = chunks[0].as_ref().unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.delta, "");
    }

    #[test]
    fn frames_after_done_are_ignored() {
        let mut parser = SseParser::new();
        let chunks = collect(
            &mut parser,
            "data: [DONE]\n\ndata: {\"delta\": \"late\"}\n\n",
        );
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].as_ref().unwrap().done);
    }

    #[test]
    fn malformed_json_is_a_protocol_error() {
        let mut parser = SseParser::new();
        let chunks = collect(&mut parser, "data: {not json}\n\n");

        assert_eq!(chunks.len(), 1);
        assert!(matches!(
            chunks[0],
            Err(ProtocolError::MalformedFrame(_))
        ));
    }

    #[test]
    fn non_data_lines_are_skipped() {
        let mut parser = SseParser::new();
        let chunks = collect(
            &mut parser,
            ": keep-alive\nevent: message\ndata: {\"delta\": \"x\"}\n\n",
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta, "x");
    }

    #[test]
    fn delta_preserves_whitespace_and_newlines() {
        let mut parser = SseParser::new();
        let chunks = collect(&mut parser, "data: {\"delta\": \"line\\n\"}\n\n");
        assert_eq!(chunks[0].as_ref().unwrap().delta, "line\n");
    }

    #[test]
    fn empty_delta_frame_is_a_valid_chunk() {
        let mut parser = SseParser::new();
        let chunks = collect(&mut parser, "data: {\"delta\": \"\"}\n\n");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta, "");
        assert!(!chunks[0].as_ref().unwrap().done);
    }
}
