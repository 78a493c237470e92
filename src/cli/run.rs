use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use log::{debug, warn};

use super::args::Args;
use crate::core::{Config, JsonStore, StreamError, ThreadRecord};
use crate::openai::OpenAIClient;
use crate::protocol::{ChatMessage, ContentKind};
use crate::stream::StreamController;
use crate::tools::{GenerateImageTool, ScreenshotsTool, ToolRegistry};

const SELECTED_THREAD_KEY: &str = "thread_id";
const ASSISTANT_ID_KEY: &str = "assistant_id";

pub async fn run(args: Args) -> Result<(), StreamError> {
    let _ = dotenv::dotenv();

    let config = Config::load()?;
    let mut settings = JsonStore::open(config.settings_path())?;
    let mut threads = JsonStore::open(config.threads_path())?;

    let api_key = dotenv::var("OPENAI_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .map_err(|_| {
            StreamError::Authentication("OPENAI_API_KEY not set in .env or environment".to_string())
        })?;
    let client = Arc::new(OpenAIClient::new(api_key, config.clone()));

    if args.init {
        return init(&config, &client, &mut settings).await;
    }

    if args.list_threads {
        return list_threads(&threads);
    }

    if let Some(file_id) = &args.save_image {
        return save_image(&client, &config, file_id).await;
    }

    if let Some(thread_id) = &args.delete_thread {
        return delete_thread(&client, &mut settings, &mut threads, thread_id).await;
    }

    if args.history {
        let thread_id = selected_thread(&args, &settings)?;
        return print_history(&client, &thread_id).await;
    }

    chat(args, config, client, &mut settings, &mut threads).await
}

async fn chat(
    args: Args,
    config: Config,
    client: Arc<OpenAIClient>,
    settings: &mut JsonStore,
    threads: &mut JsonStore,
) -> Result<(), StreamError> {
    let message = args.message.join(" ");
    if message.is_empty() && args.attach.is_empty() {
        return Err(StreamError::Api("Message must not be empty".to_string()));
    }

    let registry = build_registry(&client, &config);
    let assistant_id = ensure_assistant_id(&client, &registry, settings).await?;

    let mut record = resolve_thread(&args, &client, settings, threads).await?;
    debug!("[Chat] thread: {id}", id = record.id);

    let attachment_ids = upload_attachments(&client, &args.attach).await?;
    client
        .create_message(
            &record.id,
            (!message.is_empty()).then_some(message.as_str()),
            &attachment_ids,
        )
        .await?;

    let stream = client.create_run(&record.id, &assistant_id).await?;
    let controller = StreamController::new(client.as_ref(), &registry);

    print!("{} ", "assistant:".cyan().bold());
    io::stdout().flush()?;

    let mut stdout = io::stdout();
    let mut sink = |_index: usize, kind: ContentKind, fragment: &str| {
        if kind == ContentKind::Text {
            let _ = stdout.write_all(fragment.as_bytes());
            let _ = stdout.flush();
        }
    };
    let reply = controller.run_stream(stream, &mut sink).await?;
    println!();
    print_image_parts(&reply);

    record.file_ids.extend(client.take_uploaded_files());
    if record.title.is_empty() {
        match client.generate_thread_title(&record.id).await {
            Ok(Some(title)) => record.title = title,
            Ok(None) => {}
            Err(err) => warn!("[Chat] failed to title thread: {err}"),
        }
    }
    threads.set_record(&record.id.clone(), &record)?;

    Ok(())
}

fn build_registry(client: &Arc<OpenAIClient>, config: &Config) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(GenerateImageTool::new(client.clone()));
    registry.register(ScreenshotsTool::new(
        client.clone(),
        config.screenshot_dir.as_ref().map(PathBuf::from),
    ));
    registry
}

/// Validates the stored assistant id against the API, creating a fresh
/// assistant when there is none, and persists the id that came back.
async fn ensure_assistant_id(
    client: &OpenAIClient,
    registry: &ToolRegistry,
    settings: &mut JsonStore,
) -> Result<String, StreamError> {
    let stored = settings.get_string(ASSISTANT_ID_KEY);
    let assistant_id = client
        .ensure_assistant(&stored, &registry.definitions())
        .await?;
    if assistant_id != stored {
        settings.set(ASSISTANT_ID_KEY, assistant_id.clone().into())?;
    }
    Ok(assistant_id)
}

async fn init(
    config: &Config,
    client: &Arc<OpenAIClient>,
    settings: &mut JsonStore,
) -> Result<(), StreamError> {
    let registry = build_registry(client, config);
    let assistant_id = ensure_assistant_id(client, &registry, settings).await?;
    println!("Assistant ready: {}", assistant_id.bold());
    Ok(())
}

async fn save_image(
    client: &OpenAIClient,
    config: &Config,
    file_id: &str,
) -> Result<(), StreamError> {
    let bytes = client.get_file_content(file_id).await?;
    let path = write_image(Path::new(&config.data_dir), file_id, &bytes)?;
    println!("Saved {}", path.display());
    Ok(())
}

/// File ids come off the wire; keep only filename-safe characters before
/// touching the filesystem.
fn write_image(dir: &Path, file_id: &str, bytes: &[u8]) -> Result<PathBuf, StreamError> {
    let safe: String = file_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        return Err(StreamError::Config(format!("Invalid file id: {file_id}")));
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{safe}.png"));
    std::fs::write(&path, bytes)?;
    Ok(path)
}

/// Picks the thread for this message: an explicit id, the last used one,
/// or a freshly created thread when neither exists or `--new-thread` asks
/// for one.
async fn resolve_thread(
    args: &Args,
    client: &OpenAIClient,
    settings: &mut JsonStore,
    threads: &mut JsonStore,
) -> Result<ThreadRecord, StreamError> {
    if !args.new_thread {
        let selected = args
            .thread
            .clone()
            .unwrap_or_else(|| settings.get_string(SELECTED_THREAD_KEY));
        if !selected.is_empty() {
            if let Some(record) = threads.get_record::<ThreadRecord>(&selected) {
                settings.set(SELECTED_THREAD_KEY, selected.into())?;
                return Ok(record);
            }
            return Err(StreamError::NotFound(format!("Unknown thread: {selected}")));
        }
    }

    let metadata = HashMap::from([("source".to_string(), "assistant-cli".to_string())]);
    let record = client.create_thread(Some(&metadata)).await?;
    threads.set_record(&record.id.clone(), &record)?;
    settings.set(SELECTED_THREAD_KEY, record.id.clone().into())?;
    debug!("[Chat] created thread {id}", id = record.id);
    Ok(record)
}

async fn upload_attachments(
    client: &OpenAIClient,
    paths: &[PathBuf],
) -> Result<Vec<String>, StreamError> {
    let mut file_ids = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("attachment.png");
        let file_id = client
            .upload_file(bytes, content_type_for(path), file_name)
            .await?;
        file_ids.push(file_id);
    }
    Ok(file_ids)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("webp") => "image/webp",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

fn selected_thread(args: &Args, settings: &JsonStore) -> Result<String, StreamError> {
    let selected = args
        .thread
        .clone()
        .unwrap_or_else(|| settings.get_string(SELECTED_THREAD_KEY));
    if selected.is_empty() {
        return Err(StreamError::Config(
            "No thread selected; pass --thread or send a message first".to_string(),
        ));
    }
    Ok(selected)
}

fn list_threads(threads: &JsonStore) -> Result<(), StreamError> {
    let mut records: Vec<ThreadRecord> = threads
        .keys()
        .filter_map(|key| threads.get_record(key))
        .collect();
    records.sort_by_key(|record| record.created_at);

    for record in records {
        let title = if record.title.is_empty() {
            "(untitled)".dimmed().to_string()
        } else {
            record.title.clone()
        };
        println!("{id}  {title}", id = record.id.bold());
    }
    Ok(())
}

async fn delete_thread(
    client: &OpenAIClient,
    settings: &mut JsonStore,
    threads: &mut JsonStore,
    thread_id: &str,
) -> Result<(), StreamError> {
    let Some(record) = threads.get_record::<ThreadRecord>(thread_id) else {
        return Err(StreamError::NotFound(format!("Unknown thread: {thread_id}")));
    };

    client.delete_thread(&record).await?;
    threads.delete(thread_id)?;
    if settings.get_string(SELECTED_THREAD_KEY) == thread_id {
        settings.delete(SELECTED_THREAD_KEY)?;
    }
    println!("Deleted thread {thread_id}");
    Ok(())
}

async fn print_history(client: &OpenAIClient, thread_id: &str) -> Result<(), StreamError> {
    let messages = client.list_messages(thread_id).await?;
    for message in messages {
        let role = message.role.as_str();
        let prefix = match message.role {
            crate::protocol::Role::User => format!("{role}:").green().bold(),
            crate::protocol::Role::Assistant => format!("{role}:").cyan().bold(),
        };
        println!("{prefix} {message}");
    }
    Ok(())
}

fn print_image_parts(message: &ChatMessage) {
    for part in &message.content {
        if part.kind == ContentKind::ImageFile && !part.value.is_empty() {
            println!(
                "{}",
                format!("[image {id}] (save with --save-image {id})", id = part.value).dimmed()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_image_names_file_after_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "file-abc123", b"png bytes").unwrap();
        assert_eq!(path, dir.path().join("file-abc123.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"png bytes");
    }

    #[test]
    fn test_write_image_strips_path_separators() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "../file/abc", b"x").unwrap();
        assert_eq!(path, dir.path().join("fileabc.png"));
    }

    #[test]
    fn test_write_image_rejects_id_with_no_safe_characters() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_image(dir.path(), "../", b"x").is_err());
    }
}
