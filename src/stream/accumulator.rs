use crate::protocol::events::{DeltaContent, MessageCompletedEvent};
use crate::protocol::message::{ChatMessage, ContentKind, ContentPart};

/// Sink invoked synchronously after every applied fragment, so a caller can
/// render content as it arrives.
pub trait DeltaSink: Send {
    fn on_delta(&mut self, index: usize, kind: ContentKind, fragment: &str);
}

impl<F> DeltaSink for F
where
    F: FnMut(usize, ContentKind, &str) + Send,
{
    fn on_delta(&mut self, index: usize, kind: ContentKind, fragment: &str) {
        self(index, kind, fragment);
    }
}

/// Request-scoped accumulator merging delta fragments into indexed content.
///
/// Fragments are applied strictly in arrival order and never reordered.
/// There is no rollback: if the request later fails the whole accumulator
/// is dropped by the controller, partial content is never surfaced.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    parts: Vec<ContentPart>,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one fragment to the part at `index`.
    ///
    /// Indices beyond the current length extend the sequence with empty
    /// placeholder parts; the sequence never shrinks. Text accumulates by
    /// append; an image reference is set once and later fragments for the
    /// same part cannot replace it.
    pub fn append(
        &mut self,
        index: usize,
        kind: ContentKind,
        fragment: &str,
        sink: &mut dyn DeltaSink,
    ) {
        while self.parts.len() <= index {
            self.parts.push(ContentPart::text(""));
        }

        let part = &mut self.parts[index];
        part.kind = kind;
        match kind {
            ContentKind::Text => part.value.push_str(fragment),
            ContentKind::ImageFile => {
                if part.value.is_empty() {
                    part.value = fragment.to_string();
                }
            }
        }

        sink.on_delta(index, kind, fragment);
    }

    /// Applies every fragment of one delta event.
    pub fn apply(&mut self, content: &[DeltaContent], sink: &mut dyn DeltaSink) {
        for fragment in content {
            match fragment {
                DeltaContent::Text { index, text } => {
                    let value = text.as_ref().map(|t| t.value.as_str()).unwrap_or_default();
                    self.append(*index, ContentKind::Text, value, sink);
                }
                DeltaContent::ImageFile { index, image_file } => {
                    let value = image_file
                        .as_ref()
                        .map(|i| i.file_id.as_str())
                        .unwrap_or_default();
                    self.append(*index, ContentKind::ImageFile, value, sink);
                }
            }
        }
    }

    pub fn parts(&self) -> &[ContentPart] {
        &self.parts
    }

    /// Finalizes the message from the completed event.
    ///
    /// The completed event's content list is authoritative: it overrides the
    /// accumulated value at every index it covers. Accumulated parts past the
    /// end of that list are kept; the deltas that produced them were real
    /// content even if the completed event does not restate them.
    pub fn finalize(mut self, event: MessageCompletedEvent) -> ChatMessage {
        let mut message = ChatMessage::from(event);
        if self.parts.len() > message.content.len() {
            message
                .content
                .extend(self.parts.drain(message.content.len()..));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::events::{CompletedContent, TextValue};
    use crate::protocol::message::Role;

    fn collecting_sink(log: &mut Vec<(usize, String)>) -> impl DeltaSink + '_ {
        |index: usize, _kind: ContentKind, fragment: &str| {
            log.push((index, fragment.to_string()));
        }
    }

    fn completed(content: Vec<CompletedContent>) -> MessageCompletedEvent {
        MessageCompletedEvent {
            id: "msg_1".to_string(),
            created_at: 1_700_000_000,
            role: Role::Assistant,
            content,
        }
    }

    #[test]
    fn test_fragments_concatenate_in_arrival_order() {
        let mut acc = DeltaAccumulator::new();
        let mut log = Vec::new();
        {
            let mut sink = collecting_sink(&mut log);
            acc.append(0, ContentKind::Text, "Hel", &mut sink);
            acc.append(0, ContentKind::Text, "lo", &mut sink);
        }
        assert_eq!(acc.parts()[0].value, "Hello");
        assert_eq!(log, vec![(0, "Hel".to_string()), (0, "lo".to_string())]);
    }

    #[test]
    fn test_gap_filled_with_placeholders() {
        let mut acc = DeltaAccumulator::new();
        let mut sink = |_: usize, _: ContentKind, _: &str| {};
        acc.append(0, ContentKind::Text, "a", &mut sink);
        acc.append(3, ContentKind::Text, "d", &mut sink);

        assert_eq!(acc.parts().len(), 4);
        assert_eq!(acc.parts()[1].value, "");
        assert_eq!(acc.parts()[2].value, "");
        assert_eq!(acc.parts()[3].value, "d");
    }

    #[test]
    fn test_image_reference_set_once() {
        let mut acc = DeltaAccumulator::new();
        let mut sink = |_: usize, _: ContentKind, _: &str| {};
        acc.append(0, ContentKind::ImageFile, "file-1", &mut sink);
        acc.append(0, ContentKind::ImageFile, "file-2", &mut sink);
        assert_eq!(acc.parts()[0].value, "file-1");
    }

    #[test]
    fn test_completed_content_overrides_accumulated_text() {
        let mut acc = DeltaAccumulator::new();
        let mut sink = |_: usize, _: ContentKind, _: &str| {};
        acc.append(0, ContentKind::Text, "Hel", &mut sink);
        acc.append(0, ContentKind::Text, "l", &mut sink);

        let message = acc.finalize(completed(vec![CompletedContent::Text {
            text: TextValue {
                value: "Hello".to_string(),
            },
        }]));

        assert_eq!(message.content.len(), 1);
        assert_eq!(message.content[0].value, "Hello");
    }

    #[test]
    fn test_accumulated_parts_beyond_completed_list_are_kept() {
        let mut acc = DeltaAccumulator::new();
        let mut sink = |_: usize, _: ContentKind, _: &str| {};
        acc.append(0, ContentKind::Text, "Hello", &mut sink);
        acc.append(1, ContentKind::ImageFile, "file-9", &mut sink);

        let message = acc.finalize(completed(vec![CompletedContent::Text {
            text: TextValue {
                value: "Hello".to_string(),
            },
        }]));

        assert_eq!(message.content.len(), 2);
        assert_eq!(message.content[1], ContentPart::image_file("file-9"));
    }
}
