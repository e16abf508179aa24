//! Minimal Google Gemini API client.
//!
//! This crate provides a focused client for the `generateContent` family of
//! endpoints with:
//! - Non-streaming and streaming completions
//! - System instructions and multi-turn contents
//! - SSE parsing for `streamGenerateContent?alt=sse`
//! - Error classification for credential and quota failures

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio_stream::Stream;
use tracing::{debug, warn};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured (set GEMINI_API_KEY)")]
    NoApiKey,

    #[error("Invalid API key: {0}")]
    InvalidCredential(String),

    #[error("Quota or rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Prompt was blocked: {0}")]
    Blocked(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Gemini API client.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for Gemini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gemini")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Gemini {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, Error> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::NoApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: API_BASE.to_string(),
        })
    }

    /// Create a Gemini client from `GEMINI_API_KEY` (or `GOOGLE_API_KEY`).
    pub fn from_env() -> Result<Self, Error> {
        let api_key = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .ok_or(Error::NoApiKey)?;
        Self::new(api_key)
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different API root (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The default model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a generation request and return the full response.
    pub async fn generate(&self, request: &Request) -> Result<Response, Error> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        debug!(model, contents = request.contents.len(), "gemini generate");

        let response = self.post(&url, request).await?;
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parse_response(api_response)
    }

    /// Send a generation request and stream the response as text chunks.
    pub async fn stream(
        &self,
        request: &Request,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<Chunk, Error>> + Send>>, Error> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let url = format!("{}/models/{model}:streamGenerateContent?alt=sse", self.base_url);
        debug!(model, contents = request.contents.len(), "gemini stream");

        let response = self.post(&url, request).await?;

        // Use scan to maintain a buffer for incomplete SSE events across chunks
        let stream = response
            .bytes_stream()
            .scan(SseBuffer::default(), |buffer, result| {
                let events = match result {
                    Ok(bytes) => buffer.push(&bytes),
                    Err(e) => vec![Err(Error::Network(e.to_string()))],
                };
                futures::future::ready(Some(events))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(stream))
    }

    async fn post(&self, url: &str, request: &Request) -> Result<reqwest::Response, Error> {
        let headers = self.build_headers()?;
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&build_api_request(request))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let error = classify_error(status, &body);
            warn!(status, error = %error, "gemini request failed");
            return Err(error);
        }

        Ok(response)
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| Error::Config(format!("Invalid API key: {e}")))?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A generation request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub model: Option<String>,
    pub system: Option<String>,
    pub contents: Vec<Content>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<usize>,
}

impl Request {
    /// Create a new request with the given contents.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            ..Default::default()
        }
    }

    /// Create a single-turn request from a flat prompt.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(vec![Content::user(text)])
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: usize) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: Role,
    pub text: String,
}

impl Content {
    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create a model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// The author of a turn, as the API understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// A completed generation.
#[derive(Debug, Clone)]
pub struct Response {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Usage,
    pub model_version: Option<String>,
}

/// One streamed piece of a generation.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
}

impl FinishReason {
    fn parse(s: &str) -> Self {
        match s {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            _ => FinishReason::Other,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub output_tokens: usize,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ApiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<ApiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<ApiUsage>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn build_api_request(request: &Request) -> ApiRequest {
    let contents = request
        .contents
        .iter()
        .map(|c| ApiContent {
            role: Some(c.role.as_str().to_string()),
            parts: vec![ApiPart {
                text: Some(c.text.clone()),
            }],
        })
        .collect();

    let system_instruction = request.system.as_ref().map(|system| ApiContent {
        role: None,
        parts: vec![ApiPart {
            text: Some(system.clone()),
        }],
    });

    let generation_config = if request.temperature.is_some() || request.max_output_tokens.is_some()
    {
        Some(ApiGenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
        })
    } else {
        None
    };

    ApiRequest {
        contents,
        system_instruction,
        generation_config,
    }
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(api_response: &ApiResponse) -> (String, Option<FinishReason>) {
    let Some(candidate) = api_response.candidates.first() else {
        return (String::new(), None);
    };

    let text = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    let finish_reason = candidate.finish_reason.as_deref().map(FinishReason::parse);
    (text, finish_reason)
}

fn parse_response(api_response: ApiResponse) -> Result<Response, Error> {
    if let Some(error) = &api_response.error {
        return Err(classify_api_error(error));
    }

    if api_response.candidates.is_empty() {
        let reason = api_response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(Error::Blocked(reason));
    }

    let (text, finish_reason) = candidate_text(&api_response);
    let usage = api_response
        .usage_metadata
        .as_ref()
        .map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(Response {
        text,
        finish_reason,
        usage,
        model_version: api_response.model_version,
    })
}

/// Map an HTTP failure to the error the operator should see.
fn classify_error(status: u16, body: &str) -> Error {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => {
            let mut error = envelope.error;
            if error.code == 0 {
                error.code = status;
            }
            classify_api_error(&error)
        }
        Err(_) => classify_api_error(&ApiErrorBody {
            code: status,
            message: body.to_string(),
            status: String::new(),
        }),
    }
}

fn classify_api_error(error: &ApiErrorBody) -> Error {
    let message = error.message.clone();
    let mentions_key = message.to_lowercase().contains("api key");

    match (error.code, error.status.as_str()) {
        (401 | 403, _) | (_, "UNAUTHENTICATED" | "PERMISSION_DENIED") => {
            Error::InvalidCredential(message)
        }
        (400, _) if mentions_key => Error::InvalidCredential(message),
        (429, _) | (_, "RESOURCE_EXHAUSTED") => Error::RateLimited(message),
        (status, _) => Error::Api { status, message },
    }
}

/// Byte-level SSE buffer.
///
/// Network chunks can end in the middle of a multi-byte character, so the
/// undecoded tail is held back until the rest of it arrives.
#[derive(Debug, Default)]
struct SseBuffer {
    pending: Vec<u8>,
    text: String,
}

impl SseBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<Chunk, Error>> {
        self.pending.extend_from_slice(bytes);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        // Truly invalid bytes: replace them and keep decoding.
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + len);
                        }
                        // Incomplete character at the end: wait for more bytes.
                        None => {
                            self.pending.drain(..valid_up_to);
                            break;
                        }
                    }
                }
            }
        }
        parse_sse_events_buffered(&mut self.text)
    }
}

/// Parse SSE events from a buffer, consuming complete lines and leaving incomplete data.
///
/// Each `data:` line carries one complete `GenerateContentResponse`. Lines are
/// consumed as soon as their newline arrives; a line whose JSON is cut short is
/// left in the buffer for the next chunk.
fn parse_sse_events_buffered(buffer: &mut String) -> Vec<Result<Chunk, Error>> {
    let mut events = Vec::new();

    loop {
        let Some(newline_pos) = buffer.find('\n') else {
            break;
        };

        let line = buffer[..newline_pos].trim_end_matches('\r');

        if let Some(json_str) = line.strip_prefix("data:") {
            let json_str = json_str.trim_start();
            if !json_str.is_empty() {
                match serde_json::from_str::<ApiResponse>(json_str) {
                    Ok(api_response) => events.push(convert_stream_chunk(api_response)),
                    Err(e) => {
                        if e.is_eof() {
                            break;
                        }
                        events.push(Err(Error::Parse(format!("SSE parse error: {e}"))));
                    }
                }
            }
        }
        // Skip event:, id:, comments and blank separators

        buffer.drain(..=newline_pos);
    }

    events
}

fn convert_stream_chunk(api_response: ApiResponse) -> Result<Chunk, Error> {
    if let Some(error) = &api_response.error {
        return Err(classify_api_error(error));
    }

    if api_response.candidates.is_empty() {
        if let Some(reason) = api_response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(Error::Blocked(reason));
        }
    }

    let (text, finish_reason) = candidate_text(&api_response);
    Ok(Chunk {
        text,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Gemini::new("test-key").unwrap();
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(matches!(Gemini::new("   "), Err(Error::NoApiKey)));
    }

    #[test]
    fn test_client_with_model() {
        let client = Gemini::new("test-key")
            .unwrap()
            .with_model("gemini-2.5-pro")
            .with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(client.model(), "gemini-2.5-pro");
        assert_eq!(client.base_url, "http://localhost:8080/v1beta");
    }

    #[test]
    fn test_debug_hides_key() {
        let client = Gemini::new("super-secret").unwrap();
        assert!(!format!("{client:?}").contains("super-secret"));
    }

    #[test]
    fn test_request_serialization() {
        let request = Request::new(vec![Content::user("Hello"), Content::model("Hi!")])
            .with_system("You are a Dungeon Master")
            .with_temperature(0.7);

        let json = serde_json::to_value(build_api_request(&request)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "Hi!");
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You are a Dungeon Master"
        );
        assert!(json["systemInstruction"].get("role").is_none());
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_plain_prompt_has_no_optional_fields() {
        let json = serde_json::to_value(build_api_request(&Request::prompt("Hi"))).unwrap();
        assert!(json.get("systemInstruction").is_none());
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3, "totalTokenCount": 15},
            "modelVersion": "gemini-2.5-flash"
        }"#;
        let api_response: ApiResponse = serde_json::from_str(body).unwrap();
        let response = parse_response(api_response).unwrap();

        assert_eq!(response.text, "Hello there");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.prompt_tokens, 12);
        assert_eq!(response.usage.output_tokens, 3);
    }

    #[test]
    fn test_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let api_response: ApiResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(parse_response(api_response), Err(Error::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_classify_errors() {
        let invalid_key = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            classify_error(400, invalid_key),
            Error::InvalidCredential(_)
        ));

        let quota = r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(classify_error(429, quota), Error::RateLimited(_)));

        assert!(matches!(
            classify_error(403, "forbidden"),
            Error::InvalidCredential(m) if m == "forbidden"
        ));

        assert!(matches!(
            classify_error(500, "<html>oops</html>"),
            Error::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_sse_across_chunk_boundaries() {
        let mut buffer = String::new();

        buffer.push_str("data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"The tav");
        let events = parse_sse_events_buffered(&mut buffer);
        assert!(events.is_empty());

        buffer.push_str("ern\"}]}}]}\r\n\r\ndata: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \" is dark.\"}]}, \"finishReason\": \"STOP\"}]}\r\n\r\n");
        let events = parse_sse_events_buffered(&mut buffer);
        assert_eq!(events.len(), 2);

        let first = events[0].as_ref().unwrap();
        assert_eq!(first.text, "The tavern");
        assert_eq!(first.finish_reason, None);

        let second = events[1].as_ref().unwrap();
        assert_eq!(second.text, " is dark.");
        assert_eq!(second.finish_reason, Some(FinishReason::Stop));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sse_character_split_across_chunks() {
        let event = "data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"ok 😅\"}]}}]}\n\n";
        let bytes = event.as_bytes();
        let emoji_start = event.find('😅').unwrap();
        let (head, tail) = bytes.split_at(emoji_start + 2);

        let mut buffer = SseBuffer::default();
        assert!(buffer.push(head).is_empty());
        let events = buffer.push(tail);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().text, "ok 😅");
        assert!(buffer.pending.is_empty());
        assert!(buffer.text.is_empty());
    }

    #[test]
    fn test_sse_invalid_bytes_are_replaced() {
        let mut buffer = SseBuffer::default();
        let mut bytes = b"data: {\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"a".to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(b"b\"}]}}]}\n");

        let events = buffer.push(&bytes);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().text, "a\u{FFFD}b");
    }

    #[test]
    fn test_sse_error_event() {
        let mut buffer = String::from(
            "data: {\"error\": {\"code\": 429, \"message\": \"slow down\", \"status\": \"RESOURCE_EXHAUSTED\"}}\n\n",
        );
        let events = parse_sse_events_buffered(&mut buffer);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(Error::RateLimited(_))));
    }
}
