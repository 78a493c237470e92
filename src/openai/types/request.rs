use serde::Serialize;
use std::collections::HashMap;

use crate::tools::{ToolDefinition, ToolOutput};

#[derive(Debug, Serialize)]
pub struct CreateAssistantRequest<'a> {
    pub model: &'a str,
    pub instructions: &'a str,
    pub name: &'a str,
    pub metadata: HashMap<&'a str, &'a str>,
    pub tools: Vec<AssistantTool<'a>>,
}

#[derive(Debug, Serialize)]
pub struct AssistantTool<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: &'a ToolDefinition,
}

impl<'a> From<&'a ToolDefinition> for AssistantTool<'a> {
    fn from(definition: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: definition,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateThreadRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub struct CreateMessageRequest {
    pub role: &'static str,
    pub content: Vec<MessageContentRequest>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContentRequest {
    Text { text: String },
    ImageFile { image_file: ImageFileRequest },
}

#[derive(Debug, Serialize)]
pub struct ImageFileRequest {
    pub file_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
    pub additional_instructions: String,
    pub stream: bool,
}

/// Body of the tool-output resubmission that reopens the stream
#[derive(Debug, Serialize)]
pub struct SubmitToolOutputsRequest<'a> {
    pub tool_outputs: &'a [ToolOutput],
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ImageGenerationRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub quality: &'a str,
    pub response_format: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}
