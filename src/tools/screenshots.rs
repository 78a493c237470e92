use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};

use crate::core::error::ToolError;
use crate::openai::OpenAIClient;
use crate::tools::types::{Tool, ToolDefinition};

const CAPTURE_EXTENSIONS: &[&str] = &["png", "webp", "jpg", "jpeg"];

/// Uploads the user's screen captures and returns their file references.
///
/// Platform capture itself is an external concern; this tool reads capture
/// files from the configured directory. With no directory configured it
/// reports an empty capture list instead of failing the batch.
pub struct ScreenshotsTool {
    client: Arc<OpenAIClient>,
    capture_dir: Option<PathBuf>,
}

impl ScreenshotsTool {
    pub fn new(client: Arc<OpenAIClient>, capture_dir: Option<PathBuf>) -> Self {
        Self {
            client,
            capture_dir,
        }
    }

    fn capture_files(&self) -> Result<Vec<PathBuf>, ToolError> {
        let Some(dir) = &self.capture_dir else {
            return Ok(Vec::new());
        };

        let entries =
            std::fs::read_dir(dir).map_err(|e| ToolError::Execution(e.to_string()))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| CAPTURE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl Tool for ScreenshotsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "screenshots".to_string(),
            description: "Function used to retrieve screenshots from user".to_string(),
            parameters: None,
        }
    }

    async fn execute(&self, _arguments: &Value) -> Result<Value, ToolError> {
        let mut references = Vec::new();

        for path in self.capture_files()? {
            let bytes =
                std::fs::read(&path).map_err(|e| ToolError::Execution(e.to_string()))?;
            let file_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("screen.png")
                .to_string();
            let content_type = content_type_for(&file_name);

            debug!("[Tools] uploading capture {file_name}");
            let file_id = self
                .client
                .upload_file(bytes, content_type, &file_name)
                .await
                .map_err(|e| ToolError::Execution(e.to_string()))?;

            references.push(json!({
                "type": "image_file",
                "image_file": { "file_id": file_id }
            }));
        }

        Ok(Value::Array(references))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next() {
        Some("webp") => "image/webp",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "image/png",
    }
}
