//! A minimal OpenAI-style chat-completion adapter, gated behind the `http`
//! feature. Exists so the CLI binary has something real to run against, not
//! as a general-purpose provider integration — per spec.md §1, backend
//! adapters are external collaborators this crate only needs one concrete
//! example of.

use agentloop_core::{Message, MessageRole, ToolCall, TokenUsage};
use serde_json::{json, Value};

use crate::port::{Backend, FinishReason, GenerateRequest, GenerateResponse};

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }

    fn message_to_json(message: &Message) -> Value {
        let role = match message.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };
        let mut body = json!({ "role": role, "content": message.content });
        if let Some(call_id) = &message.tool_call_id {
            body["tool_call_id"] = json!(call_id);
        }
        if !message.tool_calls.is_empty() {
            body["tool_calls"] = json!(message
                .tool_calls
                .iter()
                .map(|tc| json!({
                    "id": tc.call_id,
                    "type": "function",
                    "function": { "name": tc.tool_name, "arguments": tc.arguments.to_string() }
                }))
                .collect::<Vec<_>>());
        }
        body
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn generate(&self, req: GenerateRequest) -> GenerateResponse {
        let messages: Vec<Value> = req.messages.iter().map(Self::message_to_json).collect();
        let tools: Vec<Value> = req
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(base_url = %self.base_url, error = %e, "http backend transport error");
                return GenerateResponse::error(format!("transport error: {e}"));
            }
        };

        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(base_url = %self.base_url, error = %e, "http backend returned a malformed response body");
                return GenerateResponse::error(format!("malformed response body: {e}"));
            }
        };

        tracing::debug!(model = %self.model, "http backend call completed");
        parse_chat_completion(&payload)
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn info(&self) -> String {
        format!("http[{}]@{}", self.model, self.base_url)
    }
}

fn parse_chat_completion(payload: &Value) -> GenerateResponse {
    let Some(choice) = payload["choices"].get(0) else {
        return GenerateResponse::error("response had no choices");
    };

    let content = choice["message"]["content"].as_str().unwrap_or("").to_string();
    let tool_calls = choice["message"]["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .map(|(i, call)| ToolCall {
                    call_id: call["id"]
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("call_{i}")),
                    tool_name: call["function"]["name"].as_str().unwrap_or_default().to_string(),
                    arguments: serde_json::from_str(
                        call["function"]["arguments"].as_str().unwrap_or("{}"),
                    )
                    .unwrap_or(Value::Null),
                })
                .collect()
        })
        .unwrap_or_default();

    let finish_reason = match choice["finish_reason"].as_str() {
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("stop") => FinishReason::Stop,
        _ if !tool_calls.is_empty() => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    };

    let usage = TokenUsage::new(
        payload["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
        payload["usage"]["completion_tokens"].as_u64().unwrap_or(0),
    );

    GenerateResponse {
        content,
        tool_calls,
        usage,
        finish_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_stop_response_with_usage() {
        let payload = json!({
            "choices": [{"message": {"content": "done"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 3}
        });
        let response = parse_chat_completion(&payload);
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.content, "done");
        assert_eq!(response.usage.prompt, 5);
    }

    #[test]
    fn parses_tool_calls_response() {
        let payload = json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{
                        "id": "call_1",
                        "function": {"name": "memory_read", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1}
        });
        let response = parse_chat_completion(&payload);
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].tool_name, "memory_read");
    }

    #[test]
    fn missing_choices_is_an_error_response() {
        let payload = json!({"choices": []});
        let response = parse_chat_completion(&payload);
        assert_eq!(response.finish_reason, FinishReason::Error);
    }
}
