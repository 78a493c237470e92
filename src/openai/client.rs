use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::TryStreamExt;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};

use crate::core::{Config, StreamError, ThreadRecord};
use crate::protocol::ChatMessage;
use crate::stream::{ByteStream, RunTransport};
use crate::tools::{ToolDefinition, ToolOutput};

use super::types::{
    AssistantList, AssistantResponse, AssistantTool, CompletionRequest, CompletionResponse,
    CreateAssistantRequest, CreateMessageRequest, CreateRunRequest, CreateThreadRequest,
    FileResponse, ImageFileRequest, ImageGenerationRequest, ImageGenerationResponse,
    MessageContentRequest, MessageList, SubmitToolOutputsRequest, ThreadResponse,
};

const API_BASE_URL: &str = "https://api.openai.com/v1";
const BETA_HEADER: &str = "assistants=v2";
const ASSISTANT_NAME: &str = "assistant-cli";
const ASSISTANT_SOURCE: &str = "assistant-cli";
const PAGE_LIMIT: usize = 20;
const TITLE_MESSAGE_LIMIT: usize = 6;

const ASSISTANT_INSTRUCTIONS: &str = "Your goal is to help the user answer these questions.
You must always remain courteous, attentive and educational in your responses.
You have two functions available to help the user:
- generateImage: allows you to generate an image from a prompt
- screenshots: allows you to retrieve screenshots of the user's screens";

/// Client for the OpenAI Assistants API (v2).
///
/// Covers assistant bootstrap, thread and message management, file transfer,
/// image generation, and the streaming run endpoints the stream controller
/// consumes. It is also the concrete [`RunTransport`]: tool-output
/// resubmission reopens the continuation stream through it.
pub struct OpenAIClient {
    api_key: String,
    client: Client,
    config: Config,
    /// File ids uploaded during this client's lifetime, drained by the
    /// caller into the owning thread record
    uploaded: Mutex<Vec<String>>,
}

impl OpenAIClient {
    pub fn new(api_key: String, config: Config) -> Self {
        Self {
            api_key,
            client: Client::new(),
            config,
            uploaded: Mutex::new(Vec::new()),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{API_BASE_URL}/{path}"))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", BETA_HEADER)
    }

    async fn check_status(response: Response) -> Result<Response, StreamError> {
        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::UNAUTHORIZED => Err(StreamError::Authentication(
                "Invalid API key or unauthorized access".to_string(),
            )),
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(StreamError::Api(format!(
                    "API request failed with status {status}: {error_text}",
                )))
            }
        }
    }

    fn byte_stream(response: Response) -> ByteStream {
        Box::pin(response.bytes_stream().map_err(StreamError::from))
    }

    /// Returns a usable assistant id, creating the assistant if needed.
    ///
    /// A stored id is validated first; a 404 means it was deleted remotely
    /// and is discarded. Before creating a fresh assistant the account's
    /// existing ones are searched by metadata source, so reinstalling the
    /// CLI does not pile up duplicates.
    pub async fn ensure_assistant(
        &self,
        stored_id: &str,
        tools: &[ToolDefinition],
    ) -> Result<String, StreamError> {
        if !stored_id.is_empty() {
            let response = self
                .request(Method::GET, &format!("assistants/{stored_id}"))
                .send()
                .await?;
            match response.status() {
                StatusCode::OK => return Ok(stored_id.to_string()),
                StatusCode::NOT_FOUND => {
                    debug!("[OpenAI] stored assistant {stored_id} no longer exists");
                }
                _ => {
                    Self::check_status(response).await?;
                }
            }
        }

        if let Some(id) = self.find_assistant_by_source().await? {
            return Ok(id);
        }

        self.create_assistant(tools).await
    }

    async fn find_assistant_by_source(&self) -> Result<Option<String>, StreamError> {
        let mut after = String::new();
        loop {
            let mut path = format!("assistants?limit={PAGE_LIMIT}");
            if !after.is_empty() {
                path.push_str(&format!("&after={after}"));
            }
            let response = self.request(Method::GET, &path).send().await?;
            let page: AssistantList = Self::check_status(response).await?.json().await?;

            for assistant in &page.data {
                if assistant.metadata.get("source").map(String::as_str) == Some(ASSISTANT_SOURCE) {
                    return Ok(Some(assistant.id.clone()));
                }
            }

            if !page.has_more {
                return Ok(None);
            }
            after = page.last_id.unwrap_or_default();
            if after.is_empty() {
                return Ok(None);
            }
        }
    }

    async fn create_assistant(&self, tools: &[ToolDefinition]) -> Result<String, StreamError> {
        let request = CreateAssistantRequest {
            model: &self.config.model,
            instructions: ASSISTANT_INSTRUCTIONS,
            name: ASSISTANT_NAME,
            metadata: HashMap::from([("source", ASSISTANT_SOURCE)]),
            tools: tools.iter().map(AssistantTool::from).collect(),
        };

        let response = self
            .request(Method::POST, "assistants")
            .json(&request)
            .send()
            .await?;
        let assistant: AssistantResponse = Self::check_status(response).await?.json().await?;
        debug!("[OpenAI] created assistant {id}", id = assistant.id);
        Ok(assistant.id)
    }

    pub async fn create_thread(
        &self,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<ThreadRecord, StreamError> {
        let response = self
            .request(Method::POST, "threads")
            .json(&CreateThreadRequest { metadata })
            .send()
            .await?;
        let thread: ThreadResponse = Self::check_status(response).await?.json().await?;

        Ok(ThreadRecord {
            id: thread.id,
            title: String::new(),
            created_at: thread.created_at,
            file_ids: Vec::new(),
        })
    }

    /// Deletes a thread remotely along with the files it accumulated.
    /// A thread already gone remotely still has its files cleaned up.
    pub async fn delete_thread(&self, record: &ThreadRecord) -> Result<(), StreamError> {
        let response = self
            .request(Method::DELETE, &format!("threads/{id}", id = record.id))
            .send()
            .await?;

        if response.status() != StatusCode::NOT_FOUND {
            Self::check_status(response).await?;
        }

        for file_id in &record.file_ids {
            self.delete_file(file_id).await;
        }
        Ok(())
    }

    /// All messages of a thread in chronological order, paginated.
    pub async fn list_messages(&self, thread_id: &str) -> Result<Vec<ChatMessage>, StreamError> {
        let mut messages = Vec::new();
        let mut after = String::new();

        loop {
            let mut path = format!("threads/{thread_id}/messages?limit={PAGE_LIMIT}&order=asc");
            if !after.is_empty() {
                path.push_str(&format!("&after={after}"));
            }
            let response = self.request(Method::GET, &path).send().await?;
            let page: MessageList = Self::check_status(response).await?.json().await?;

            messages.extend(page.data.into_iter().map(ChatMessage::from));

            if !page.has_more {
                return Ok(messages);
            }
            after = page.last_id.unwrap_or_default();
            if after.is_empty() {
                return Ok(messages);
            }
        }
    }

    pub async fn create_message(
        &self,
        thread_id: &str,
        text: Option<&str>,
        file_ids: &[String],
    ) -> Result<(), StreamError> {
        let mut content = Vec::new();
        if let Some(text) = text {
            content.push(MessageContentRequest::Text {
                text: text.to_string(),
            });
        }
        for file_id in file_ids {
            content.push(MessageContentRequest::ImageFile {
                image_file: ImageFileRequest {
                    file_id: file_id.clone(),
                },
            });
        }

        let response = self
            .request(Method::POST, &format!("threads/{thread_id}/messages"))
            .json(&CreateMessageRequest {
                role: "user",
                content,
            })
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Starts a streaming run on the thread and returns its raw byte stream.
    pub async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<ByteStream, StreamError> {
        let request = CreateRunRequest {
            assistant_id,
            additional_instructions: format!(
                "\nUnless contraindicated, you must respond in the user's language.\nUser language: {language}",
                language = self.config.language
            ),
            stream: true,
        };

        let response = self
            .request(Method::POST, &format!("threads/{thread_id}/runs"))
            .json(&request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(Self::byte_stream(response))
    }

    /// Uploads file bytes with purpose `vision` and records the new id.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        file_name: &str,
    ) -> Result<String, StreamError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = Form::new().part("file", part).text("purpose", "vision");

        let response = self
            .client
            .post(format!("{API_BASE_URL}/files"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let file: FileResponse = Self::check_status(response).await?.json().await?;

        self.record_uploaded(file.id.clone());
        Ok(file.id)
    }

    /// A poisoned lock still holds valid ids; losing one would leak the
    /// remote file from the thread record's cleanup list.
    fn record_uploaded(&self, file_id: String) {
        self.uploaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(file_id);
    }

    /// File ids uploaded so far; the caller attaches them to its thread record.
    pub fn take_uploaded_files(&self) -> Vec<String> {
        let mut uploaded = self
            .uploaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *uploaded)
    }

    pub async fn get_file_content(&self, file_id: &str) -> Result<Vec<u8>, StreamError> {
        let response = self
            .request(Method::GET, &format!("files/{file_id}/content"))
            .send()
            .await?;
        let bytes = Self::check_status(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Deletion failures are logged, not propagated; a leaked remote file is
    /// not worth failing the user-visible operation over.
    pub async fn delete_file(&self, file_id: &str) {
        let result = self
            .request(Method::DELETE, &format!("files/{file_id}"))
            .send()
            .await;
        if let Err(err) = result {
            warn!("[OpenAI] failed to delete file {file_id}: {err}");
        }
    }

    /// Generates an image and uploads it; returns the resulting file id.
    pub async fn generate_image(&self, prompt: &str) -> Result<String, StreamError> {
        let prompt = clamp_chars(prompt, self.config.max_image_prompt_chars);
        let request = ImageGenerationRequest {
            model: &self.config.image_model,
            prompt,
            quality: "hd",
            response_format: "b64_json",
        };

        let response = self
            .request(Method::POST, "images/generations")
            .json(&request)
            .send()
            .await?;
        let generated: ImageGenerationResponse = Self::check_status(response).await?.json().await?;

        let image = generated
            .data
            .first()
            .ok_or_else(|| StreamError::Api("Image generation returned no data".to_string()))?;
        let bytes = BASE64
            .decode(&image.b64_json)
            .map_err(|e| StreamError::Api(format!("Invalid image payload: {e}")))?;

        self.upload_file(bytes, "image/png", "generated-image.png")
            .await
    }

    /// Asks the completions endpoint for a short thread title once the
    /// conversation has a few messages. Returns the new title, or None when
    /// the thread is past the point where titling makes sense.
    pub async fn generate_thread_title(
        &self,
        thread_id: &str,
    ) -> Result<Option<String>, StreamError> {
        let path = format!("threads/{thread_id}/messages?limit={TITLE_MESSAGE_LIMIT}&order=asc");
        let response = self.request(Method::GET, &path).send().await?;
        let page: MessageList = Self::check_status(response).await?.json().await?;

        if page.data.is_empty() || page.data.len() >= TITLE_MESSAGE_LIMIT {
            return Ok(None);
        }

        let mut transcript = String::new();
        for message in &page.data {
            for content in &message.content {
                if let crate::protocol::events::CompletedContent::Text { text } = content {
                    transcript.push_str(&format!(
                        "{role}: {value}\n",
                        role = message.role.as_str(),
                        value = text.value
                    ));
                }
            }
            transcript.push('\n');
        }
        if transcript.trim().is_empty() {
            return Ok(None);
        }

        transcript
            .push_str("Can you generate a short title (3-4 words maximum) for this conversation?\n");
        transcript.push_str("Title: ");

        let request = CompletionRequest {
            model: &self.config.title_model,
            prompt: transcript,
            temperature: 0.7,
            max_tokens: 256,
        };
        let response = self
            .request(Method::POST, "completions")
            .json(&request)
            .send()
            .await?;
        let completion: CompletionResponse = Self::check_status(response).await?.json().await?;

        let title = completion
            .choices
            .first()
            .map(|choice| {
                choice
                    .text
                    .trim_matches(|c: char| c == '\n' || c == '"' || c == ' ')
                    .to_string()
            })
            .unwrap_or_default();
        Ok((!title.is_empty()).then_some(title))
    }
}

#[async_trait]
impl RunTransport for OpenAIClient {
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<ByteStream, StreamError> {
        let request = SubmitToolOutputsRequest {
            tool_outputs: outputs,
            stream: true,
        };

        let response = self
            .request(
                Method::POST,
                &format!("threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StreamError::ResubmissionRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Self::byte_stream(response))
    }
}

/// Clamps a prompt to the API's character limit without splitting a
/// character in half.
fn clamp_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((boundary, _)) => &text[..boundary],
        None => text,
    }
}
