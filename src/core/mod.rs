mod config;
pub mod error;
pub mod store;

pub use config::Config;
pub use error::StreamError;
pub use error::ToolError;
pub use store::JsonStore;
pub use store::ThreadRecord;
