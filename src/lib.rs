pub mod cli;
pub mod core;
pub mod eventsource;
pub mod openai;
pub mod protocol;
pub mod stream;
pub mod tools;

pub use crate::core::{Config, StreamError};
pub use crate::protocol::{ChatMessage, ContentKind, ContentPart, Role};
pub use crate::stream::{RunTransport, StreamController};
