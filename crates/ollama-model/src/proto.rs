use relay_agent_model::{
    ModelFinishReason, ModelMessage, ModelRequest, ModelResponseEvent,
    ModelTool, Role, ToolCallRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::OllamaConfig;

// ------------------------------
// Types shared in both directions
// ------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub function: FunctionCall,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Tool {
    r#type: &'static str,
    function: FunctionTool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    stream: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmbedRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatResponse {
    pub message: Message,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(req: &ModelRequest, config: &OllamaConfig) -> ChatRequest {
    ChatRequest {
        model: req.model.clone().unwrap_or_else(|| config.model.clone()),
        messages: req.messages.iter().map(create_message).collect(),
        tools: req.tools.iter().map(create_tool).collect(),
        stream: false,
    }
}

fn create_message(msg: &ModelMessage) -> Message {
    let mut message = Message {
        role: msg.role(),
        content: msg.content().to_owned(),
        tool_calls: vec![],
        tool_name: None,
    };
    match msg {
        ModelMessage::Assistant { tool_calls, .. } => {
            message.tool_calls = tool_calls
                .iter()
                .map(|call| ToolCall {
                    id: Some(call.id.clone()),
                    function: FunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect();
        }
        ModelMessage::Tool(result) => {
            message.tool_name = Some(result.name.clone());
        }
        ModelMessage::System(_) | ModelMessage::User(_) => {}
    }
    message
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    Tool {
        r#type: "function",
        function: FunctionTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

/// Flattens a complete chat response into model events.
///
/// Ollama does not always assign ids to tool calls, missing ones are
/// derived from the position of the call in the reply. Its `done_reason`
/// reads `stop` even for tool calls, so the finish reason is taken from
/// the calls instead.
pub fn create_events(resp: ChatResponse) -> Vec<ModelResponseEvent> {
    let mut events = vec![];
    let message = resp.message;
    if !message.content.is_empty() {
        events.push(ModelResponseEvent::MessageDelta(message.content));
    }
    let has_tool_calls = !message.tool_calls.is_empty();
    for (idx, call) in message.tool_calls.into_iter().enumerate() {
        let arguments = match call.function.arguments {
            // Some models encode the arguments as a JSON string.
            Value::String(raw) => {
                serde_json::from_str(&raw).unwrap_or(Value::String(raw))
            }
            Value::Null => Value::Object(Default::default()),
            arguments => arguments,
        };
        let id = call.id.unwrap_or_else(|| format!("call_{idx}"));
        events.push(ModelResponseEvent::ToolCall(ToolCallRequest::new(
            id,
            call.function.name,
            arguments,
        )));
    }
    events.push(ModelResponseEvent::Completed(ModelFinishReason::of(
        has_tool_calls,
    )));
    events
}

#[cfg(test)]
mod tests {
    use relay_agent_model::ToolCallResult;
    use serde_json::json;

    use super::*;
    use crate::OllamaConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            model: None,
            messages: vec![
                ModelMessage::User("What is in /tmp?".to_owned()),
                ModelMessage::Assistant {
                    content: String::new(),
                    tool_calls: vec![ToolCallRequest {
                        id: "call_0".to_owned(),
                        name: "list_directory".to_owned(),
                        arguments: json!({ "path": "/tmp" }),
                    }],
                },
                ModelMessage::Tool(ToolCallResult {
                    id: "call_0".to_owned(),
                    name: "list_directory".to_owned(),
                    content: "a.txt (file)".to_owned(),
                }),
            ],
            tools: vec![ModelTool {
                name: "list_directory".to_owned(),
                description: "Lists a directory.".to_owned(),
                parameters: json!({ "type": "object" }),
            }],
        };
        let config = OllamaConfigBuilder::default().with_model("llama3").build();
        let body =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "llama3",
                "messages": [
                    { "role": "user", "content": "What is in /tmp?" },
                    {
                        "role": "assistant",
                        "content": "",
                        "tool_calls": [{
                            "id": "call_0",
                            "function": {
                                "name": "list_directory",
                                "arguments": { "path": "/tmp" }
                            }
                        }]
                    },
                    {
                        "role": "tool",
                        "content": "a.txt (file)",
                        "tool_name": "list_directory"
                    }
                ],
                "tools": [{
                    "type": "function",
                    "function": {
                        "name": "list_directory",
                        "description": "Lists a directory.",
                        "parameters": { "type": "object" }
                    }
                }],
                "stream": false
            })
        );
    }

    #[test]
    fn test_model_override() {
        let request = ModelRequest {
            model: Some("mistral".to_owned()),
            ..Default::default()
        };
        let config = OllamaConfigBuilder::default().build();
        let body =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert_eq!(body["model"], "mistral");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_create_events() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "model": "llama3",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    { "function": { "name": "read_file", "arguments": { "path": "a" } } },
                    { "function": { "name": "read_file", "arguments": "{\"path\":\"b\"}" } }
                ]
            },
            "done": true,
            "done_reason": "stop"
        }))
        .unwrap();
        let events = create_events(resp);
        assert_eq!(events.len(), 3);
        let ModelResponseEvent::ToolCall(second) = &events[1] else {
            panic!("expected a tool call, got {:?}", events[1]);
        };
        assert_eq!(second.id, "call_1");
        assert_eq!(second.arguments, json!({ "path": "b" }));
        assert_eq!(
            events[2],
            ModelResponseEvent::Completed(ModelFinishReason::ToolCalls)
        );
    }

    #[test]
    fn test_plain_reply() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "message": { "role": "assistant", "content": "Hi!" },
            "done": true
        }))
        .unwrap();
        assert_eq!(
            create_events(resp),
            [
                ModelResponseEvent::MessageDelta("Hi!".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }
}
