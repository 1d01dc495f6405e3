//! Chat completion wire types (OpenAI-compatible format).

use serde::{Deserialize, Serialize};

// ============================================================================
// Request
// ============================================================================

/// A chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Tool definitions visible to the model this turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

impl ChatRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<Message>, temperature: Option<f32>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature,
            tools: None,
        }
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }
}

// ============================================================================
// Messages
// ============================================================================

/// A message in the conversation log.
///
/// `content` may be absent when the assistant only requests tool calls;
/// `tool_call_id` is set on tool-result messages and matches exactly one
/// prior tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant message carrying tool-call requests.
    pub fn assistant_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Tool-result message answering one tool call.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// Tools
// ============================================================================

/// Tool surface exposed to the model: `{ name, description, parameters }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON-schema-like parameter mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// A tool-call request from the model. Untrusted input: arguments are a raw
/// JSON string validated at the dispatch boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, unique within the turn.
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub tool_type: String,
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_absent_fields() {
        let request = ChatRequest::new("gpt-4o", vec![Message::text(Role::User, "hi")], None);
        let json = serde_json::to_string(&request).unwrap();

        assert!(json.contains("\"model\":\"gpt-4o\""));
        assert!(!json.contains("temperature"));
        assert!(!json.contains("tools"));
    }

    #[test]
    fn with_tools_drops_empty_list() {
        let request = ChatRequest::new("gpt-4o", vec![], Some(0.7)).with_tools(vec![]);
        assert!(request.tools.is_none());
    }

    #[test]
    fn response_with_tool_calls_deserializes() {
        let json = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "search_flights", "arguments": "{\"origin\":\"JFK\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;

        let response: ChatResponse = serde_json::from_str(json).unwrap();
        let message = &response.choices[0].message;
        assert_eq!(message.role, Role::Assistant);
        assert!(message.content.is_none());
        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "search_flights");
    }

    #[test]
    fn tool_call_defaults_type_when_missing() {
        let json = r#"{"id": "call_1", "function": {"name": "x", "arguments": "{}"}}"#;
        let call: ToolCall = serde_json::from_str(json).unwrap();
        assert_eq!(call.tool_type, "function");
    }

    #[test]
    fn tool_result_message_shape() {
        let msg = Message::tool_result("call_9", "{\"ok\":true}");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_9"));

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"tool_call_id\":\"call_9\""));
        assert!(!json.contains("tool_calls\""));
    }
}
