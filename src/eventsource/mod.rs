use crate::core::StreamError;
use async_stream::try_stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::{self, Display, Formatter};
use std::pin::Pin;

const FRAME_DELIMITER: &str = "\n\n";
const EVENT_FIELD: &str = "event:";
const DATA_FIELD: &str = "data:";

/// One structured unit of the event stream: a header line naming the event
/// and a data line carrying its JSON payload.
///
/// Frames are ephemeral; they are decoded into events and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Event name from the `event:` header line, if one was present
    pub event: Option<String>,
    /// Payload from the `data:` line, if one was present
    pub data: Option<String>,
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame {{ event: {:?}, data: {:?} }}",
            self.event, self.data
        )
    }
}

impl Frame {
    /// Parses one delimiter-separated block into a frame.
    ///
    /// Lines that are neither an `event:` header nor a `data:` line are
    /// ignored; a block with no recognized line at all parses to an empty
    /// frame rather than an error.
    pub fn parse(input: &str) -> Self {
        let mut event = None;
        let mut data = None;

        for line in input.lines() {
            if let Some(value) = line.strip_prefix(EVENT_FIELD) {
                event = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix(DATA_FIELD) {
                data = Some(value.trim().to_string());
            }
        }

        Self { event, data }
    }

    pub fn is_empty(&self) -> bool {
        self.event.is_none() && self.data.is_none()
    }
}

/// Incremental buffer that turns raw transport chunks into complete frames.
///
/// Chunks may split frames, lines, or even multi-byte characters at
/// arbitrary positions. Text not yet terminated by the blank-line delimiter
/// stays buffered for the next chunk; an incomplete trailing UTF-8 sequence
/// stays buffered as bytes. No frame is parsed twice and no byte is dropped.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    text: String,
    partial: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            text: String::with_capacity(1024),
            partial: Vec::new(),
        }
    }

    /// Feeds one chunk of bytes and returns every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.push_bytes(chunk);

        let mut frames = Vec::new();
        while let Some(end) = self.text.find(FRAME_DELIMITER) {
            let frame = Frame::parse(&self.text[..end]);
            if !frame.is_empty() {
                frames.push(frame);
            }
            self.text.drain(..end + FRAME_DELIMITER.len());
        }
        frames
    }

    /// Flushes whatever remains after the transport ended.
    ///
    /// The final frame of a stream is often not followed by the delimiter.
    pub fn finish(&mut self) -> Option<Frame> {
        // A dangling partial sequence at end of stream is decoded lossily;
        // there are no further bytes that could complete it.
        if !self.partial.is_empty() {
            let partial = std::mem::take(&mut self.partial);
            self.text.push_str(&String::from_utf8_lossy(&partial));
        }

        if self.text.is_empty() {
            return None;
        }

        let frame = Frame::parse(&self.text);
        self.text.clear();
        (!frame.is_empty()).then_some(frame)
    }

    /// Appends decoded text, holding back an incomplete trailing multi-byte
    /// sequence until the next chunk supplies the rest of it.
    fn push_bytes(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.partial);
        bytes.extend_from_slice(chunk);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    self.text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        // Genuinely invalid bytes are replaced, not retained
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the chunk boundary
                        None => {
                            self.partial = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }
}

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, StreamError>> + Send>>;

/// Extension trait for converting a raw byte stream into a stream of frames.
pub trait FrameStreamExt {
    fn frames(self) -> FrameStream;
}

impl<S> FrameStreamExt for S
where
    S: Stream<Item = Result<Bytes, StreamError>> + Send + 'static,
{
    fn frames(self) -> FrameStream {
        Box::pin(try_stream! {
            let mut stream = Box::pin(self);
            let mut buffer = FrameBuffer::new();

            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                for frame in buffer.push(&chunk) {
                    yield frame;
                }
            }

            if let Some(frame) = buffer.finish() {
                yield frame;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_parse_header_and_data() {
        let frame = Frame::parse("event: thread.message.delta\ndata: {\"id\":\"1\"}");
        assert_eq!(frame.event.as_deref(), Some("thread.message.delta"));
        assert_eq!(frame.data.as_deref(), Some("{\"id\":\"1\"}"));
    }

    #[test]
    fn test_frame_parse_without_header() {
        let frame = Frame::parse("data: [DONE]");
        assert!(frame.event.is_none());
        assert_eq!(frame.data.as_deref(), Some("[DONE]"));
    }

    #[test]
    fn test_frame_parse_unrecognized_lines() {
        let frame = Frame::parse(": comment\nretry: 500");
        assert!(frame.is_empty());
    }

    #[test]
    fn test_buffer_whole_frame() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(b"event: a\ndata: 1\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("a"));
    }

    #[test]
    fn test_buffer_split_mid_frame() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(b"event: a\nda").is_empty());
        let frames = buffer.push(b"ta: 1\n\nevent: b\ndata: 2\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data.as_deref(), Some("1"));
        assert_eq!(frames[1].event.as_deref(), Some("b"));
    }

    #[test]
    fn test_buffer_no_frame_parsed_twice() {
        let mut buffer = FrameBuffer::new();
        assert_eq!(buffer.push(b"event: a\ndata: 1\n\n").len(), 1);
        assert!(buffer.push(b"").is_empty());
        assert!(buffer.finish().is_none());
    }

    #[test]
    fn test_buffer_utf8_split_across_chunks() {
        // U+00E9 is 0xC3 0xA9 in UTF-8
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(b"data: caf\xc3").is_empty());
        let frames = buffer.push(b"\xa9\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data.as_deref(), Some("café"));
    }

    #[test]
    fn test_buffer_invalid_byte_replaced() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(b"data: a\xffb\n\n");
        assert_eq!(frames[0].data.as_deref(), Some("a\u{FFFD}b"));
    }

    #[test]
    fn test_finish_flushes_trailing_frame() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(b"event: last\ndata: 9").is_empty());
        let frame = buffer.finish().unwrap();
        assert_eq!(frame.event.as_deref(), Some("last"));
        assert_eq!(frame.data.as_deref(), Some("9"));
    }
}
