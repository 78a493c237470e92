use crate::protocol::events::{CompletedContent, MessageCompletedEvent};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Kind of one content part inside a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    ImageFile,
}

/// One indexed part of a message: accumulating text, or a file reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPart {
    pub kind: ContentKind,
    /// Text value, or the file id for image parts
    pub value: String,
}

impl ContentPart {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Text,
            value: value.into(),
        }
    }

    pub fn image_file(file_id: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::ImageFile,
            value: file_id.into(),
        }
    }
}

impl From<&CompletedContent> for ContentPart {
    fn from(content: &CompletedContent) -> Self {
        match content {
            CompletedContent::Text { text } => Self::text(&text.value),
            CompletedContent::ImageFile { image_file } => Self::image_file(&image_file.file_id),
        }
    }
}

/// A finalized chat message. Immutable once the completed event produced it.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub created_at: i64,
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl From<MessageCompletedEvent> for ChatMessage {
    fn from(event: MessageCompletedEvent) -> Self {
        Self {
            id: event.id,
            created_at: event.created_at,
            role: event.role,
            content: event.content.iter().map(ContentPart::from).collect(),
        }
    }
}

impl Display for ChatMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, part) in self.content.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match part.kind {
                ContentKind::Text => write!(f, "{}", part.value)?,
                ContentKind::ImageFile => write!(f, "[image {}]", part.value)?,
            }
        }
        Ok(())
    }
}
