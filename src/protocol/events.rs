use crate::core::StreamError;
use crate::eventsource::Frame;
use crate::protocol::message::Role;
use serde::Deserialize;

pub const EVENT_MESSAGE_DELTA: &str = "thread.message.delta";
pub const EVENT_MESSAGE_COMPLETED: &str = "thread.message.completed";
pub const EVENT_REQUIRES_ACTION: &str = "thread.run.requires_action";

/// Decoded run-stream event.
///
/// The wire stream carries many more event names than these; everything the
/// stream core does not act on decodes to `Unknown` and is skipped.
#[derive(Debug)]
pub enum ThreadEvent {
    MessageDelta(MessageDeltaEvent),
    MessageCompleted(MessageCompletedEvent),
    RequiresAction(RequiresActionEvent),
    Unknown,
}

impl ThreadEvent {
    /// Decodes one frame.
    ///
    /// A recognized event name whose payload is missing or fails to
    /// deserialize is a hard error: it means the reader has lost sync with
    /// the protocol, and skipping it would silently corrupt the message.
    pub fn decode(frame: &Frame) -> Result<Self, StreamError> {
        let Some(event) = frame.event.as_deref() else {
            return Ok(Self::Unknown);
        };

        match event {
            EVENT_MESSAGE_DELTA => decode_payload(event, frame).map(Self::MessageDelta),
            EVENT_MESSAGE_COMPLETED => decode_payload(event, frame).map(Self::MessageCompleted),
            EVENT_REQUIRES_ACTION => decode_payload(event, frame).map(Self::RequiresAction),
            _ => Ok(Self::Unknown),
        }
    }
}

fn decode_payload<'de, T: Deserialize<'de>>(
    event: &str,
    frame: &'de Frame,
) -> Result<T, StreamError> {
    let data = frame.data.as_deref().unwrap_or_default();
    serde_json::from_str(data).map_err(|source| StreamError::MalformedFrame {
        event: event.to_string(),
        source,
    })
}

#[derive(Debug, Deserialize)]
pub struct TextValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageFileRef {
    pub file_id: String,
}

/// `thread.message.delta` payload
#[derive(Debug, Deserialize)]
pub struct MessageDeltaEvent {
    pub id: String,
    pub delta: MessageDelta,
}

#[derive(Debug, Deserialize)]
pub struct MessageDelta {
    #[serde(default)]
    pub content: Vec<DeltaContent>,
}

/// One indexed fragment inside a delta event
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeltaContent {
    Text {
        index: usize,
        text: Option<TextValue>,
    },
    ImageFile {
        index: usize,
        image_file: Option<ImageFileRef>,
    },
}

/// `thread.message.completed` payload
#[derive(Debug, Deserialize)]
pub struct MessageCompletedEvent {
    pub id: String,
    pub created_at: i64,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<CompletedContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletedContent {
    Text { text: TextValue },
    ImageFile { image_file: ImageFileRef },
}

/// `thread.run.requires_action` payload
#[derive(Debug, Deserialize)]
pub struct RequiresActionEvent {
    /// Run id, needed to address the tool-output submission
    pub id: String,
    pub thread_id: String,
    pub required_action: Option<RequiredAction>,
}

impl RequiresActionEvent {
    pub fn tool_calls(&self) -> &[WireToolCall] {
        self.required_action
            .as_ref()
            .map(|action| action.submit_tool_outputs.tool_calls.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Deserialize)]
pub struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    pub function: WireFunction,
}

#[derive(Debug, Deserialize)]
pub struct WireFunction {
    pub name: String,
    /// JSON document encoded as a string, opaque until dispatch
    #[serde(default)]
    pub arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(event: &str, data: &str) -> Frame {
        Frame {
            event: Some(event.to_string()),
            data: Some(data.to_string()),
        }
    }

    #[test]
    fn test_decode_delta() {
        let data = r#"{"id":"msg_1","delta":{"content":[{"index":0,"type":"text","text":{"value":"Hel"}}]}}"#;
        let event = ThreadEvent::decode(&frame(EVENT_MESSAGE_DELTA, data)).unwrap();
        let ThreadEvent::MessageDelta(delta) = event else {
            panic!("expected delta event");
        };
        assert_eq!(delta.id, "msg_1");
        assert!(matches!(
            &delta.delta.content[0],
            DeltaContent::Text { index: 0, text: Some(t) } if t.value == "Hel"
        ));
    }

    #[test]
    fn test_decode_completed() {
        let data = r#"{"id":"msg_1","created_at":1700000000,"role":"assistant","content":[{"type":"text","text":{"value":"Hello"}}]}"#;
        let event = ThreadEvent::decode(&frame(EVENT_MESSAGE_COMPLETED, data)).unwrap();
        let ThreadEvent::MessageCompleted(completed) = event else {
            panic!("expected completed event");
        };
        assert_eq!(completed.role, Role::Assistant);
        assert_eq!(completed.content.len(), 1);
    }

    #[test]
    fn test_decode_requires_action() {
        let data = r#"{"id":"run_1","thread_id":"thread_1","required_action":{"submit_tool_outputs":{"tool_calls":[{"id":"call_1","function":{"name":"generateImage","arguments":"{\"prompt\":\"a cat\"}"}}]}}}"#;
        let event = ThreadEvent::decode(&frame(EVENT_REQUIRES_ACTION, data)).unwrap();
        let ThreadEvent::RequiresAction(action) = event else {
            panic!("expected requires_action event");
        };
        assert_eq!(action.tool_calls().len(), 1);
        assert_eq!(action.tool_calls()[0].function.name, "generateImage");
    }

    #[test]
    fn test_unrecognized_event_is_unknown() {
        let event = ThreadEvent::decode(&frame("thread.run.created", "{}")).unwrap();
        assert!(matches!(event, ThreadEvent::Unknown));
    }

    #[test]
    fn test_missing_header_is_unknown() {
        let frame = Frame {
            event: None,
            data: Some("[DONE]".to_string()),
        };
        assert!(matches!(
            ThreadEvent::decode(&frame).unwrap(),
            ThreadEvent::Unknown
        ));
    }

    #[test]
    fn test_malformed_payload_is_fatal() {
        let result = ThreadEvent::decode(&frame(EVENT_MESSAGE_DELTA, "{not json"));
        assert!(matches!(
            result,
            Err(StreamError::MalformedFrame { ref event, .. }) if event == EVENT_MESSAGE_DELTA
        ));
    }

    #[test]
    fn test_missing_data_on_recognized_event_is_fatal() {
        let frame = Frame {
            event: Some(EVENT_MESSAGE_COMPLETED.to_string()),
            data: None,
        };
        assert!(matches!(
            ThreadEvent::decode(&frame),
            Err(StreamError::MalformedFrame { .. })
        ));
    }
}
