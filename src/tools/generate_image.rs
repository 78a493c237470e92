use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::error::ToolError;
use crate::openai::OpenAIClient;
use crate::tools::types::{Tool, ToolDefinition};

/// Generates an image from a prompt and uploads it as an assistant file.
///
/// The output is the image_file content reference the backend expects to
/// receive back through the tool-output submission.
pub struct GenerateImageTool {
    client: Arc<OpenAIClient>,
}

const PROMPT_STRING_ERROR: &str = "prompt must be a string";

impl GenerateImageTool {
    pub fn new(client: Arc<OpenAIClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GenerateImageTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "generateImage".to_string(),
            description: "Function used to generate an image".to_string(),
            parameters: Some(json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "A description of the image you wish to generate, maximum 4000 characters"
                    }
                },
                "required": ["prompt"]
            })),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError> {
        let prompt = arguments["prompt"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArgument(String::from(PROMPT_STRING_ERROR)))?;

        let file_id = self
            .client
            .generate_image(prompt)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(json!({
            "type": "image_file",
            "image_file": { "file_id": file_id }
        }))
    }
}
