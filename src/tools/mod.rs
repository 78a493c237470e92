pub mod dispatcher;
pub mod generate_image;
pub mod registry;
pub mod screenshots;
pub mod types;

pub use dispatcher::dispatch;
pub use generate_image::GenerateImageTool;
pub use registry::ToolRegistry;
pub use screenshots::ScreenshotsTool;
pub use types::*;
