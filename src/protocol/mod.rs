pub mod events;
pub mod message;

pub use events::{
    MessageCompletedEvent, MessageDeltaEvent, RequiresActionEvent, ThreadEvent, WireToolCall,
};
pub use message::{ChatMessage, ContentKind, ContentPart, Role};
