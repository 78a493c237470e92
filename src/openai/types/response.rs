use serde::Deserialize;
use std::collections::HashMap;

use crate::protocol::events::CompletedContent;
use crate::protocol::message::{ChatMessage, ContentPart, Role};

#[derive(Debug, Deserialize)]
pub struct AssistantResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct AssistantList {
    #[serde(default)]
    pub data: Vec<AssistantSummary>,
    #[serde(default)]
    pub has_more: bool,
    pub last_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantSummary {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadResponse {
    pub id: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub data: Vec<ThreadMessage>,
    #[serde(default)]
    pub has_more: bool,
    pub last_id: Option<String>,
}

/// A stored thread message; same content shape as a completed stream event.
#[derive(Debug, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub created_at: i64,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<CompletedContent>,
}

impl From<ThreadMessage> for ChatMessage {
    fn from(message: ThreadMessage) -> Self {
        Self {
            id: message.id,
            created_at: message.created_at,
            role: message.role,
            content: message.content.iter().map(ContentPart::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FileResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageGenerationResponse {
    pub data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratedImage {
    pub b64_json: String,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub text: String,
}
