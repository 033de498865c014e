//! OpenAI-compatible LLM provider implementation.
//!
//! A single [`OpenAiCompatibleProvider`] serves OpenAI, Google Gemini,
//! Groq, Ollama and custom OpenAI-compatible gateways via configurable
//! base URLs and the factory functions in [`config`].

pub mod config;
pub mod streaming;
pub mod types;

use futures_util::StreamExt;
use secrecy::ExposeSecret;

use morphic_core::llm::provider::{LlmEventStream, LlmProvider};
use morphic_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderCapabilities, StopReason,
    ToolCall, ToolChoice, Usage,
};

use super::{check_status, http_client, request_error, require_model};
use self::config::OpenAiCompatConfig;
use self::streaming::map_openai_stream;
use self::types::{
    ChatFunction, ChatFunctionCall, ChatMessage, ChatRequest, ChatResponse, ChatTool, ChatToolCall,
    StreamOptions,
};

/// Unified provider for any OpenAI-compatible API.
///
/// Does not derive Debug; the API key never leaves the request headers.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        Self {
            client: http_client(),
            config,
        }
    }

    /// Override the base URL (tests and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn post(&self) -> reqwest::RequestBuilder {
        let builder = self.client.post(self.url());
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    /// Build the wire request from a generic [`CompletionRequest`].
    fn build_request<'a>(
        &self,
        request: &'a CompletionRequest,
        stream: bool,
    ) -> Result<ChatRequest<'a>, LlmError> {
        require_model(&request.model)?;

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: Some(system.clone()),
                tool_calls: Vec::new(),
                tool_call_id: None,
            });
        }

        for message in &request.messages {
            let role = match message.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::Tool => "tool",
            };
            let tool_calls: Vec<ChatToolCall> = message
                .tool_calls
                .iter()
                .map(|call| ChatToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: ChatFunctionCall {
                        name: call.name.clone(),
                        arguments: call.input.to_string(),
                    },
                })
                .collect();
            let content = if message.content.is_empty() && !tool_calls.is_empty() {
                None
            } else {
                Some(message.content.clone())
            };
            messages.push(ChatMessage {
                role,
                content,
                tool_calls,
                tool_call_id: message.tool_call_id.clone(),
            });
        }

        let tools = request
            .tools
            .iter()
            .map(|tool| ChatTool {
                kind: "function",
                function: ChatFunction {
                    name: &tool.name,
                    description: &tool.description,
                    parameters: &tool.input_schema,
                },
            })
            .collect();

        let tool_choice = request.tool_choice.as_ref().map(|choice| match choice {
            ToolChoice::Auto => serde_json::json!("auto"),
            ToolChoice::Required => serde_json::json!("required"),
            ToolChoice::Tool(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name }
            }),
        });

        let (max_tokens, max_completion_tokens) = if self.config.max_completion_tokens_param {
            (None, Some(request.max_tokens))
        } else {
            (Some(request.max_tokens), None)
        };

        Ok(ChatRequest {
            model: &request.model,
            messages,
            max_tokens,
            max_completion_tokens,
            temperature: request.temperature,
            stop: request.stop_sequences.as_deref(),
            stream,
            stream_options: stream.then_some(StreamOptions { include_usage: true }),
            tools,
            tool_choice,
        })
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.config.provider_name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.config.capabilities
    }

    #[tracing::instrument(level = "debug", skip_all, fields(provider = %self.config.provider_name, model = %request.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_request(request, false)?;
        let response = self.post().json(&body).send().await.map_err(request_error)?;
        let response = check_status(response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Deserialization("response has no choices".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| -> Result<ToolCall, LlmError> {
                let input = if call.function.arguments.trim().is_empty() {
                    serde_json::Value::Object(Default::default())
                } else {
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        LlmError::Deserialization(format!("tool call JSON for '{}': {e}", call.function.name))
                    })?
                };
                Ok(ToolCall {
                    id: call.id,
                    name: call.function.name,
                    input,
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;

        let mut stop_reason = choice
            .finish_reason
            .as_deref()
            .and_then(|r| r.parse::<StopReason>().ok())
            .unwrap_or(StopReason::EndTurn);
        if !tool_calls.is_empty() && stop_reason == StopReason::EndTurn {
            stop_reason = StopReason::ToolUse;
        }

        let usage = parsed.usage.unwrap_or_default();
        Ok(CompletionResponse {
            id: parsed.id,
            content: choice.message.content.unwrap_or_default(),
            model: if parsed.model.is_empty() { request.model.clone() } else { parsed.model },
            stop_reason,
            usage: Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
            tool_calls,
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let builder = match self.build_request(&request, true) {
            Ok(body) => self.post().json(&body),
            Err(e) => return Box::pin(futures_util::stream::once(async move { Err(e) })),
        };
        let extract_think_tags = self.config.extract_think_tags;
        tracing::debug!(provider = %self.config.provider_name, model = %request.model, "opening completion stream");

        Box::pin(async_stream::try_stream! {
            let response = builder.send().await.map_err(request_error)?;
            let response = check_status(response).await?;
            let mut events = map_openai_stream(response, extract_think_tags);
            while let Some(event) = events.next().await {
                yield event?;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morphic_types::llm::{Message, StreamEvent, ToolDefinition};
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(config::openai_defaults(SecretString::from("sk-test")))
            .with_base_url(base_url)
    }

    fn request() -> CompletionRequest {
        CompletionRequest::simple(
            "gpt-4o-mini",
            Some("Be concise".to_string()),
            vec![Message::user("Hello")],
        )
    }

    #[test]
    fn test_build_request_messages() {
        let p = provider("http://localhost");
        let mut req = request();
        req.messages.push(Message::assistant_with_tools(
            "",
            vec![ToolCall {
                id: "call_1".into(),
                name: "search".into(),
                input: serde_json::json!({"query": "rust"}),
            }],
        ));
        req.messages.push(Message::tool_result("call_1", "{\"results\":[]}"));

        let body = serde_json::to_value(p.build_request(&req, false).unwrap()).unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "Hello");
        assert!(messages[2]["content"].is_null());
        assert_eq!(messages[2]["tool_calls"][0]["function"]["arguments"], "{\"query\":\"rust\"}");
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert_eq!(body["max_completion_tokens"], 1024);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("stream_options").is_none());
    }

    #[test]
    fn test_build_request_streaming_with_tools() {
        let p = provider("http://localhost");
        let mut req = request();
        req.tools.push(ToolDefinition {
            name: "search".into(),
            description: "Search the web".into(),
            input_schema: serde_json::json!({"type": "object"}),
        });
        req.tool_choice = Some(ToolChoice::Tool("search".into()));
        req.stop_sequences = Some(vec!["END".into()]);

        let body = serde_json::to_value(p.build_request(&req, true).unwrap()).unwrap();
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
        assert_eq!(body["tool_choice"]["function"]["name"], "search");
        assert_eq!(body["stop"][0], "END");
    }

    #[test]
    fn test_legacy_max_tokens_param() {
        let p = OpenAiCompatibleProvider::new(config::ollama_defaults("http://localhost:11434"));
        let body = serde_json::to_value(p.build_request(&request(), false).unwrap()).unwrap();
        assert_eq!(body["max_tokens"], 1024);
        assert!(body.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_build_request_empty_model_is_invalid() {
        let p = provider("http://localhost");
        let mut req = request();
        req.model = String::new();
        assert!(matches!(p.build_request(&req, false), Err(LlmError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_complete_with_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o-mini",
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "search", "arguments": "{\"query\":\"rust\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 20, "completion_tokens": 8}
            })))
            .mount(&server)
            .await;

        let response = provider(&server.uri()).complete(&request()).await.unwrap();
        assert_eq!(response.id, "chatcmpl-1");
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.tool_calls[0].input["query"], "rust");
        assert_eq!(response.usage.input_tokens, 20);
    }

    #[tokio::test]
    async fn test_complete_maps_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = provider(&server.uri()).complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_stream_text_and_usage() {
        let server = MockServer::start().await;
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":2}}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let events: Vec<StreamEvent> = provider(&server.uri())
            .stream(request())
            .map(|e| e.unwrap())
            .collect()
            .await;

        assert!(matches!(events.first(), Some(StreamEvent::Connected)));
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hello");
        assert!(events.iter().any(|e| matches!(
            e,
            StreamEvent::Usage(Usage { input_tokens: 5, output_tokens: 2 })
        )));
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn test_stream_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let mut stream = provider(&server.uri()).stream(request());
        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(LlmError::RateLimited { retry_after_ms: Some(3000) })));
    }
}
