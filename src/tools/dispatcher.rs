use futures::future;
use log::{debug, warn};
use serde_json::Value;

use super::registry::ToolRegistry;
use super::types::{ToolCall, ToolOutput};

/// Runs one batch of tool calls concurrently and collects their outputs.
///
/// The whole batch settles before anything is returned: one tool failing
/// never cancels its siblings. A failed or unregistered tool contributes an
/// empty output rather than omitting its tool_call_id, because the backend
/// expects one output per submitted call. Output order matches input order
/// even when the calls complete out of order.
pub async fn dispatch(registry: &ToolRegistry, calls: &[ToolCall]) -> Vec<ToolOutput> {
    let futures = calls.iter().map(|call| async move {
        debug!("[Tools] dispatching {call}");
        let output = match registry.execute(&call.name, &call.arguments).await {
            Ok(value) => render_output(value),
            Err(err) => {
                warn!("[Tools] {name} failed: {err}", name = call.name);
                String::new()
            }
        };
        ToolOutput {
            tool_call_id: call.id.clone(),
            output,
        }
    });

    future::join_all(futures).await
}

/// Tool results that are not already strings are submitted as serialized JSON.
fn render_output(value: Value) -> String {
    match value {
        Value::String(output) => output,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
