//! OpenAI-compatible streaming provider.
//!
//! Works with Gemini's OpenAI endpoint, OpenAI itself, and any server that
//! speaks `/chat/completions` with SSE streaming. Chunks are forwarded raw;
//! tool-call fragments are not assembled here.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use quill_core::error::ProviderError;
use quill_core::message::{ChatMessage, ChatRole};
use quill_core::provider::*;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// An OpenAI-compatible streaming provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Gemini through Google's OpenAI-compatible endpoint.
    pub fn gemini(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("gemini", GEMINI_BASE_URL, api_key)
    }

    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openai", OPENAI_BASE_URL, api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert chat turns to OpenAI API format.
    fn to_api_messages(messages: &[ChatMessage]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| {
                let tool_calls: Vec<ApiToolCall> = m
                    .tool_calls
                    .iter()
                    .map(|tc| ApiToolCall {
                        id: tc.id.clone(),
                        r#type: "function".into(),
                        function: ApiFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect();

                // Endpoints reject an empty string next to tool calls.
                let content = if m.content.is_empty() && !tool_calls.is_empty() {
                    None
                } else {
                    Some(m.content.clone())
                };

                ApiMessage {
                    role: match m.role {
                        ChatRole::System => "system",
                        ChatRole::User => "user",
                        ChatRole::Assistant => "assistant",
                        ChatRole::Tool => "tool",
                    }
                    .into(),
                    content,
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                    tool_call_id: m.tool_call_id.clone(),
                }
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": true,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }
}

const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// `Retry-After` in delta-seconds. HTTP-date values are not honoured.
fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Map a non-success HTTP status to a provider error.
fn status_error(status: u16, retry_after: Option<u64>, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, request: GenerationRequest) -> Result<ChunkReceiver, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending streaming request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let retry_after_secs = retry_after(response.headers());
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, ?retry_after_secs, body = %error_body, "Provider streaming error");
            return Err(status_error(status, retry_after_secs, error_body));
        }

        let (tx, rx) = mpsc::channel(64);
        let provider_name = self.name.clone();

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::default();

            while let Some(next) = byte_stream.next().await {
                let bytes = match next {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for event in decoder.feed(&bytes) {
                    let item = match event {
                        SseEvent::Done => return,
                        SseEvent::Chunk(chunk) => Ok(chunk),
                        SseEvent::Error(message) => Err(ProviderError::StreamInterrupted(message)),
                        SseEvent::Unparsed { data, error } => {
                            trace!(provider = %provider_name, %data, %error, "Ignoring unparseable SSE chunk");
                            continue;
                        }
                    };
                    let fatal = item.is_err();
                    if tx.send(item).await.is_err() || fatal {
                        return; // receiver dropped or stream broken
                    }
                }
            }

            trace!(provider = %provider_name, "Stream ended without [DONE]");
        });

        Ok(rx)
    }
}

// --- SSE decoding ---

/// One decoded server-sent event.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Chunk(StreamChunk),
    /// An error object delivered mid-stream
    Error(String),
    Unparsed { data: String, error: String },
    Done,
}

/// Splits a byte stream into SSE `data:` payloads.
///
/// Bytes are buffered until a full line is available so multi-byte UTF-8
/// sequences split across network reads decode correctly.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            // Skip blank separators, comments, and non-data fields
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                events.push(SseEvent::Done);
                continue;
            }

            match serde_json::from_str::<StreamResponse>(data) {
                Ok(resp) => {
                    if let Some(err) = resp.error {
                        events.push(SseEvent::Error(err.message));
                    } else if let Some(chunk) = resp.into_chunk() {
                        events.push(SseEvent::Chunk(chunk));
                    }
                }
                Err(e) => events.push(SseEvent::Unparsed {
                    data: data.to_string(),
                    error: e.to_string(),
                }),
            }
        }

        events
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

impl StreamResponse {
    /// The chunk carried by the first choice, if it carries anything.
    fn into_chunk(self) -> Option<StreamChunk> {
        let delta = self.choices.into_iter().next()?.delta;

        let content = delta.content.filter(|c| !c.is_empty());
        let tool_call_deltas: Vec<ToolCallDelta> = delta
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let (name, arguments) = match tc.function {
                    Some(f) => (f.name, f.arguments),
                    None => (None, None),
                };
                ToolCallDelta {
                    index: tc.index,
                    id: tc.id,
                    name,
                    arguments,
                }
            })
            .collect();

        if content.is_none() && tool_call_deltas.is_empty() {
            return None;
        }
        Some(StreamChunk {
            content,
            tool_call_deltas,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta. Arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::message::MessageToolCall;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn chunk_events(decoder: &mut SseDecoder, input: &str) -> Vec<StreamChunk> {
        decoder
            .feed(input.as_bytes())
            .into_iter()
            .filter_map(|e| match e {
                SseEvent::Chunk(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn gemini_constructor() {
        let provider = OpenAiCompatProvider::gemini("key").unwrap();
        assert_eq!(provider.name(), "gemini");
        assert!(provider.base_url().contains("generativelanguage.googleapis.com"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("local", "http://localhost:8080/v1/", "").unwrap();
        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![ChatMessage::system("You are helpful"), ChatMessage::user("Hello")];
        let api = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].role, "system");
        assert_eq!(api[1].role, "user");
        assert_eq!(api[1].content.as_deref(), Some("Hello"));
    }

    #[test]
    fn tool_call_turn_without_text_sends_null_content() {
        let msg = ChatMessage::assistant_with_tool_calls(
            "",
            vec![MessageToolCall {
                id: "call_1".into(),
                name: "bash".into(),
                arguments: r#"{"command":"ls"}"#.into(),
            }],
        );
        let api = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert!(api[0].content.is_none());
        let json = serde_json::to_value(&api[0]).unwrap();
        assert!(json["content"].is_null());
        assert_eq!(json["tool_calls"][0]["function"]["name"], "bash");
        assert_eq!(json["tool_calls"][0]["type"], "function");
    }

    #[test]
    fn tool_result_turn_conversion() {
        let msg = ChatMessage::tool_result("call_1", r#"{"entries":[]}"#);
        let api = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert_eq!(api[0].role, "tool");
        assert_eq!(api[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn request_body_attaches_tools_and_limits() {
        let request = GenerationRequest {
            model: "gemini-2.5-flash".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.2,
            max_tokens: Some(512),
            tools: vec![ToolDefinition {
                name: "bash".into(),
                description: "Run a shell command".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
        };
        let body = OpenAiCompatProvider::request_body(&request);
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["tools"][0]["function"]["name"], "bash");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(status_error(401, None, String::new()), ProviderError::AuthenticationFailed(_)));
        assert!(matches!(status_error(403, None, String::new()), ProviderError::AuthenticationFailed(_)));
        match status_error(500, None, "boom".into()) {
            ProviderError::ApiError { status_code, message } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rate_limit_honours_retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "30".parse().unwrap());
        let err = status_error(429, retry_after(&headers), String::new());
        assert!(matches!(err, ProviderError::RateLimited { retry_after_secs: 30 }));

        // Missing or non-numeric values fall back to the default
        assert!(matches!(
            status_error(429, retry_after(&HeaderMap::new()), String::new()),
            ProviderError::RateLimited { retry_after_secs: 5 }
        ));
        let mut dated = HeaderMap::new();
        dated.insert(RETRY_AFTER, "Wed, 21 Oct 2026 07:28:00 GMT".parse().unwrap());
        assert_eq!(retry_after(&dated), None);
    }

    // --- SSE decoding ---

    #[test]
    fn decode_content_delta() {
        let mut decoder = SseDecoder::default();
        let chunks = chunk_events(
            &mut decoder,
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"},\"finish_reason\":null}]}\n\n",
        );
        assert_eq!(chunks, vec![StreamChunk::text("Hello")]);
    }

    #[test]
    fn decode_line_split_across_reads() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(b"data: {\"choices\":[{\"delta\":{\"con").is_empty());
        let chunks = chunk_events(&mut decoder, "tent\":\"Hi\"}}]}\r\n");
        assert_eq!(chunks, vec![StreamChunk::text("Hi")]);
    }

    #[test]
    fn decode_multibyte_split_across_reads() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo\"}}]}\n";
        let bytes = line.as_bytes();
        let split = line.find('é').unwrap() + 1; // inside the two-byte sequence
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed(&bytes[..split]).is_empty());
        let events = decoder.feed(&bytes[split..]);
        assert_eq!(events, vec![SseEvent::Chunk(StreamChunk::text("héllo"))]);
    }

    #[test]
    fn decode_tool_call_fragments_raw() {
        let mut decoder = SseDecoder::default();
        let input = concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_abc\",\"function\":{\"name\":\"list_directory\",\"arguments\":\"\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"{\\\"path\\\"\"}}]}}]}\n",
        );
        let chunks = chunk_events(&mut decoder, input);
        assert_eq!(chunks.len(), 2);

        let first = &chunks[0].tool_call_deltas[0];
        assert_eq!(first.index, 0);
        assert_eq!(first.id.as_deref(), Some("call_abc"));
        assert_eq!(first.name.as_deref(), Some("list_directory"));

        let second = &chunks[1].tool_call_deltas[0];
        assert!(second.id.is_none());
        assert_eq!(second.arguments.as_deref(), Some("{\"path\""));
    }

    #[test]
    fn decode_skips_empty_and_finish_only_chunks() {
        let mut decoder = SseDecoder::default();
        let input = concat!(
            ": keep-alive\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":1,\"completion_tokens\":2,\"total_tokens\":3}}\n",
        );
        assert!(decoder.feed(input.as_bytes()).is_empty());
    }

    #[test]
    fn decode_done_and_errors() {
        let mut decoder = SseDecoder::default();
        let events = decoder.feed(b"data: {\"error\":{\"message\":\"quota exceeded\"}}\ndata: not json\ndata: [DONE]\n");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], SseEvent::Error("quota exceeded".into()));
        assert!(matches!(events[1], SseEvent::Unparsed { .. }));
        assert_eq!(events[2], SseEvent::Done);
    }

    // --- End-to-end against a local HTTP server ---

    /// Serve one HTTP response on a random port and return its base URL.
    async fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            // Read headers plus the declared body before answering
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "{status_line}\r\ncontent-type: text/event-stream\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn simple_request() -> GenerationRequest {
        GenerationRequest {
            model: "test-model".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.7,
            max_tokens: None,
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn streams_chunks_until_done() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        )
        .to_string();
        let base = serve_once("HTTP/1.1 200 OK", body).await;
        let provider = OpenAiCompatProvider::new("test", base, "key").unwrap();

        let mut rx = provider.stream(simple_request()).await.unwrap();
        let mut text = String::new();
        while let Some(chunk) = rx.recv().await {
            text.push_str(chunk.unwrap().content.as_deref().unwrap_or(""));
        }
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn unauthorized_fails_to_open() {
        let base = serve_once("HTTP/1.1 401 Unauthorized", "{}".into()).await;
        let provider = OpenAiCompatProvider::new("test", base, "bad").unwrap();
        let err = provider.stream(simple_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
    }
}
