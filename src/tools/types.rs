use std::fmt::Display;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::ToolError;
use crate::protocol::WireToolCall;

/// A backend-issued request to execute an external capability mid-stream.
///
/// Created from a requires_action event batch, resolved to a [`ToolOutput`]
/// by the dispatcher, and never outlives one dispatch cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier the backend uses to correlate the output with the call
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Arguments passed to the tool as a JSON value
    pub arguments: Value,
}

impl From<&WireToolCall> for ToolCall {
    fn from(call: &WireToolCall) -> Self {
        // The wire carries arguments as a JSON document inside a string.
        // An undecodable document degrades to Null and is left to the tool's
        // own argument validation.
        let arguments =
            serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);
        Self {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments,
        }
    }
}

impl Display for ToolCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// One settled tool result, in the shape the resubmission body expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// Defines a tool's interface including its name, description, and parameter schema
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON schema defining the tool's parameters, if it takes any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Trait that must be implemented by all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's definition including its name, description, and parameter schema
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool with the provided arguments
    ///
    /// # Arguments
    /// * `arguments` - JSON value containing the tool's arguments
    ///
    /// # Returns
    /// * `Result<Value, ToolError>` - JSON value result or error
    async fn execute(&self, arguments: &Value) -> Result<Value, ToolError>;
}
