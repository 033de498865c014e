//! AnthropicProvider: [`LlmProvider`] for the Anthropic Messages API.
//!
//! Sends requests to `/v1/messages` with the API key and version headers,
//! in both non-streaming (`complete`) and streaming (`stream`) modes.

use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use morphic_core::llm::provider::{LlmEventStream, LlmProvider};
use morphic_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderCapabilities, StopReason,
    ToolCall, ToolChoice, Usage,
};

use super::streaming::map_anthropic_stream;
use super::types::{
    AnthropicContentBlock, AnthropicMessage, AnthropicNonStreamResponse, AnthropicRequest, AnthropicTool,
    AnthropicToolChoice, RequestBlock,
};
use crate::llm::{check_status, http_client, request_error, require_model};

/// Anthropic Claude LLM provider.
///
/// The API key is a [`SecretString`] exposed only when setting the request
/// header. The provider does not derive Debug.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    capabilities: ProviderCapabilities,
}

impl AnthropicProvider {
    /// The Anthropic API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: http_client(),
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            capabilities: ProviderCapabilities {
                streaming: true,
                tool_calling: true,
                reasoning: true,
                max_context_tokens: 200_000,
                max_output_tokens: 64_000,
            },
        }
    }

    /// Override the base URL (tests and proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn post(&self) -> reqwest::RequestBuilder {
        self.client
            .post(self.url("/v1/messages"))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
    }

    /// Convert a generic [`CompletionRequest`] into an [`AnthropicRequest`].
    ///
    /// System messages fold into the top-level `system` field, tool results
    /// become `tool_result` blocks on a user turn, and consecutive turns with
    /// the same role merge so roles strictly alternate.
    fn to_anthropic_request(&self, request: &CompletionRequest, stream: bool) -> Result<AnthropicRequest, LlmError> {
        require_model(&request.model)?;

        let mut system_parts: Vec<&str> = request.system.iter().map(String::as_str).collect();
        let mut messages: Vec<AnthropicMessage> = Vec::new();

        for message in &request.messages {
            let (role, blocks) = match message.role {
                MessageRole::System => {
                    system_parts.push(&message.content);
                    continue;
                }
                MessageRole::User => ("user", text_block(&message.content)),
                MessageRole::Assistant => {
                    let mut blocks = text_block(&message.content);
                    blocks.extend(message.tool_calls.iter().map(|call| RequestBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.input.clone(),
                    }));
                    ("assistant", blocks)
                }
                MessageRole::Tool => (
                    "user",
                    vec![RequestBlock::ToolResult {
                        tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                        content: message.content.clone(),
                    }],
                ),
            };

            if blocks.is_empty() {
                continue;
            }
            match messages.last_mut() {
                Some(last) if last.role == role => last.content.extend(blocks),
                _ => messages.push(AnthropicMessage { role, content: blocks }),
            }
        }

        let system = (!system_parts.is_empty()).then(|| system_parts.join("\n\n"));

        Ok(AnthropicRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            messages,
            system,
            stream,
            temperature: request.temperature,
            stop_sequences: request.stop_sequences.clone(),
            tools: request
                .tools
                .iter()
                .map(|tool| AnthropicTool {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    input_schema: tool.input_schema.clone(),
                })
                .collect(),
            tool_choice: request.tool_choice.as_ref().map(|choice| match choice {
                ToolChoice::Auto => AnthropicToolChoice::Auto,
                ToolChoice::Required => AnthropicToolChoice::Any,
                ToolChoice::Tool(name) => AnthropicToolChoice::Tool { name: name.clone() },
            }),
        })
    }
}

fn text_block(text: &str) -> Vec<RequestBlock> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![RequestBlock::Text { text: text.to_string() }]
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %request.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_anthropic_request(request, false)?;
        let response = self.post().json(&body).send().await.map_err(request_error)?;
        let response = check_status(response).await?;

        let parsed: AnthropicNonStreamResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for block in parsed.content {
            match block {
                AnthropicContentBlock::Text { text } => content.push_str(&text),
                AnthropicContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall { id, name, input }),
                AnthropicContentBlock::Thinking { .. } | AnthropicContentBlock::Unknown => {}
            }
        }

        let stop_reason = parsed
            .stop_reason
            .as_deref()
            .and_then(|r| r.parse::<StopReason>().ok())
            .unwrap_or(StopReason::EndTurn);

        Ok(CompletionResponse {
            id: parsed.id,
            content,
            model: parsed.model,
            stop_reason,
            usage: Usage {
                input_tokens: parsed.usage.input_tokens,
                output_tokens: parsed.usage.output_tokens,
            },
            tool_calls,
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let builder = match self.to_anthropic_request(&request, true) {
            Ok(body) => self.post().json(&body),
            Err(e) => return Box::pin(futures_util::stream::once(async move { Err(e) })),
        };
        tracing::debug!(model = %request.model, "opening anthropic stream");

        Box::pin(async_stream::try_stream! {
            let response = builder.send().await.map_err(request_error)?;
            let response = check_status(response).await?;
            let mut events = map_anthropic_stream(response);
            while let Some(event) = events.next().await {
                yield event?;
            }
        })
    }
}
