use rmcp::model::{CallToolResult, Content, ErrorData};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const SERVER_TOOL_FAILED: &str = "SERVER_TOOL_FAILED";

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DialogsArgs {
    /// Offset for continuation, as returned by the previous page
    pub offset: String,
    /// Return only dialogs with unread messages
    pub only_unread: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DialogArgs {
    /// Name of the dialog
    pub name: String,
    /// Offset for continuation
    #[serde(default)]
    pub offset: i32,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendArgs {
    /// Name of the dialog
    pub name: String,
    /// Plain text of the message
    pub text: String,
    /// Send message immediately instead of saving as draft
    #[serde(default)]
    pub send: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadArgs {
    /// Name of the dialog
    pub name: String,
}

/// A workflow that ran and failed is a tool error the model can read, not a
/// protocol error.
pub fn render<T, E>(
    tool: &'static str,
    outcome: Result<T, E>,
) -> Result<CallToolResult, ErrorData>
where
    T: Serialize,
    E: std::error::Error,
{
    match outcome {
        Ok(output) => {
            let text = serde_json::to_string(&output).map_err(|error| {
                ErrorData::internal_error(format!("failed to encode {tool} result: {error}"), None)
            })?;
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
        Err(error) => {
            tracing::warn!(code = SERVER_TOOL_FAILED, tool, error = %error, "tool call failed");
            Ok(CallToolResult::error(vec![Content::text(error.to_string())]))
        }
    }
}
