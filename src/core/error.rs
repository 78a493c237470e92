#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A recognized stream event carried a payload that failed to decode.
    /// Indicates protocol desync and aborts the whole request.
    #[error("Malformed `{event}` frame: {source}")]
    MalformedFrame {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    /// The transport closed before a completed message arrived
    #[error("Stream ended before the message completed")]
    IncompleteStream,
    /// The backend rejected the tool-output submission
    #[error("Tool output submission rejected with status {status}: {body}")]
    ResubmissionRejected { status: u16, body: String },
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(reqwest::Error),
    /// API-specific errors (rate limits, bad requests, etc)
    #[error("API error: {0}")]
    Api(String),
    /// Authentication-specific errors
    #[error("Authentication error: {0}")]
    Authentication(String),
    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),
    /// Server error
    #[error("Server error: {0}")]
    Server(String),
    /// Tool execution errors
    #[error("Tool error: {0}")]
    Tool(ToolError),
    /// Thread/settings store errors
    #[error("Store error: {0}")]
    Store(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool not found error
    #[error("Tool not found: {0}")]
    NotFound(String),
    /// Tool execution error
    #[error("Tool execution failed: {0}")]
    Execution(String),
    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<ToolError> for StreamError {
    fn from(err: ToolError) -> Self {
        Self::Tool(err)
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        // If the error carries a status code, map it to a more specific kind
        if let Some(status) = err.status() {
            match status.as_u16() {
                401 | 403 => Self::Authentication(format!("Authentication failed: {err}")),
                404 => Self::NotFound(format!("Resource not found: {err}")),
                429 => Self::Api(format!("Rate limit exceeded: {err}")),
                500..=599 => Self::Server(format!("Server error: {err}")),
                _ => Self::Network(err),
            }
        } else {
            Self::Network(err)
        }
    }
}
