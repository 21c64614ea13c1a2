//! The LLM client: model listing with a TTL cache, and chat completions.
//!
//! One client mediates all calls to one configured endpoint. The wire types
//! follow the OpenAI chat-completions shape and stay private to this module.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::error::ClientError;
use super::provider::ProviderConfig;
use super::stream::{CompletionStream, StreamEvent};
use super::types::{ChatMessage, ModelDescriptor};

/// How long a fetched model list stays valid.
pub const DEFAULT_MODEL_TTL: Duration = Duration::from_secs(300);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded fragment channel: the worker suspends when the caller stops pulling.
const FRAGMENT_BUFFER: usize = 32;

// ============================================================================
// Wire Types (OpenAI chat-completions shape)
// ============================================================================

#[derive(Serialize, Debug)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

/// Non-streaming response: `{choices:[{message:{content}}]}`.
#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
}

#[derive(Deserialize, Debug)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// One streaming SSE event: `{choices:[{delta:{content?}}]}`.
#[derive(Deserialize, Debug)]
struct ChunkEvent {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize, Debug)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Debug, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Model listing response: `{data:[{id, ...}]}`.
#[derive(Deserialize, Debug)]
struct ModelListResponse {
    data: Vec<ModelDescriptor>,
}

// ============================================================================
// Client
// ============================================================================

/// Model list plus the moment it was fetched. Never persisted.
struct CachedModelList {
    entries: Vec<ModelDescriptor>,
    fetched_at: Instant,
}

/// Client for one OpenAI-compatible chat endpoint.
///
/// Lifetime: `connect` either yields a ready client or fails; `close`
/// releases the HTTP client and the cache, after which both operations
/// report [`ClientError::NotInitialized`].
pub struct LlmClient {
    config: ProviderConfig,
    http: Option<reqwest::Client>,
    cache: Option<CachedModelList>,
    ttl: Duration,
}

impl LlmClient {
    /// Builds the underlying HTTP client from the configuration.
    ///
    /// Fails with [`ClientError::Config`] on a malformed endpoint, a
    /// credential that cannot be carried in a header, or transport setup
    /// errors.
    pub fn connect(config: ProviderConfig) -> Result<Self, ClientError> {
        let endpoint = config.endpoint_or_default();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "endpoint is not an http(s) URL: {endpoint}"
            )));
        }
        if let Some(credential) = config.credential()
            && reqwest::header::HeaderValue::from_str(&format!("Bearer {credential}")).is_err()
        {
            return Err(ClientError::Config(
                "credential contains characters not allowed in a header".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Config(format!("transport setup failed: {e}")))?;

        info!(
            "LLM client ready: provider={}, endpoint={}",
            config.label(),
            endpoint
        );
        Ok(LlmClient {
            config,
            http: Some(http),
            cache: None,
            ttl: DEFAULT_MODEL_TTL,
        })
    }

    /// Overrides the model-list TTL (default [`DEFAULT_MODEL_TTL`]).
    pub fn with_model_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Releases the HTTP client and drops the cached model list. Subsequent
    /// operations fail as not initialized.
    pub fn close(&mut self) {
        info!("LLM client closed: provider={}", self.config.label());
        self.http = None;
        self.cache = None;
    }

    pub fn is_closed(&self) -> bool {
        self.http.is_none()
    }

    // ------------------------------------------------------------------
    // Model listing
    // ------------------------------------------------------------------

    /// Lists available models, serving from cache while it is fresh.
    ///
    /// Strict variant of [`list_models`](LlmClient::list_models): failures
    /// are returned to the caller instead of swallowed. A failed refresh
    /// leaves the existing cache untouched, so a still-valid list remains
    /// servable afterwards.
    pub async fn try_list_models(
        &mut self,
        force_refresh: bool,
    ) -> Result<Vec<ModelDescriptor>, ClientError> {
        let http = self.http.as_ref().ok_or(ClientError::NotInitialized)?;

        if !force_refresh
            && let Some(cached) = &self.cache
            && cached.fetched_at.elapsed() < self.ttl
        {
            debug!(
                "Serving {} models from cache (age {:?})",
                cached.entries.len(),
                cached.fetched_at.elapsed()
            );
            return Ok(cached.entries.clone());
        }

        let url = format!(
            "{}/models",
            self.config.endpoint_or_default().trim_end_matches('/')
        );
        let mut request = http.get(&url);
        if let Some(credential) = self.config.credential() {
            request = request.header("Authorization", format!("Bearer {credential}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ClientError::Api { status, message });
        }

        let listing: ModelListResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        info!("Fetched {} models from {}", listing.data.len(), url);
        self.cache = Some(CachedModelList {
            entries: listing.data.clone(),
            fetched_at: Instant::now(),
        });
        Ok(listing.data)
    }

    /// Lists available models, logging failures and returning an empty list
    /// instead of an error. An empty result is the sole failure signal.
    pub async fn list_models(&mut self, force_refresh: bool) -> Vec<ModelDescriptor> {
        match self.try_list_models(force_refresh).await {
            Ok(entries) => entries,
            Err(failure) => {
                warn!("Model listing failed, returning empty list: {failure}");
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Chat completions
    // ------------------------------------------------------------------

    /// Sends the conversation to the endpoint and returns the response as a
    /// lazy fragment sequence.
    ///
    /// With `stream` set, one fragment is yielded per incremental delta, in
    /// arrival order; deltas with no textual content are skipped. Without
    /// it, exactly one fragment carries the full message content. Failures
    /// end the sequence early and are recorded on the stream; fragments
    /// already yielded are not retracted. `model_id` is forwarded as-is and
    /// validated only by the endpoint.
    pub fn chat_completions(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        stream: bool,
    ) -> CompletionStream {
        let http = match &self.http {
            Some(http) => http.clone(),
            None => {
                warn!("Chat completion requested on a closed client");
                return CompletionStream::failed(ClientError::NotInitialized);
            }
        };

        let url = format!(
            "{}/chat/completions",
            self.config.endpoint_or_default().trim_end_matches('/')
        );
        let credential = self.config.credential().map(str::to_owned);
        let request = ChatRequest {
            model: model_id.to_string(),
            messages: messages.to_vec(),
            stream,
        };
        info!(
            "Chat completion request: model={}, messages={}, stream={}",
            request.model,
            request.messages.len(),
            stream
        );

        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let worker = tokio::spawn(async move {
            let outcome = if stream {
                run_streaming(&http, &url, credential.as_deref(), &request, &tx).await
            } else {
                run_batched(&http, &url, credential.as_deref(), &request, &tx).await
            };
            if let Err(failure) = outcome {
                warn!("Chat completion failed: {failure}");
                let _ = tx.send(StreamEvent::Failed(failure)).await;
            }
        });
        CompletionStream::new(rx, worker)
    }
}

// ============================================================================
// Completion workers
// ============================================================================

async fn send_chat_request(
    http: &reqwest::Client,
    url: &str,
    credential: Option<&str>,
    request: &ChatRequest,
) -> Result<reqwest::Response, ClientError> {
    let mut builder = http.post(url).json(request);
    if let Some(credential) = credential {
        builder = builder.header("Authorization", format!("Bearer {credential}"));
    }

    let response = builder
        .send()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?;
    debug!("Chat response status: {}", response.status());

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(ClientError::Api { status, message });
    }
    Ok(response)
}

/// Non-streaming: one response, one fragment with the full content.
async fn run_batched(
    http: &reqwest::Client,
    url: &str,
    credential: Option<&str>,
    request: &ChatRequest,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<(), ClientError> {
    let response = send_chat_request(http, url, credential, request).await?;
    let parsed: ChatResponse = response
        .json()
        .await
        .map_err(|e| ClientError::Parse(e.to_string()))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| ClientError::Parse("response contained no choices".to_string()))?;

    debug!("Batched completion: {} content bytes", content.len());
    if tx.send(StreamEvent::Delta(content)).await.is_err() {
        debug!("Fragment receiver dropped before delivery");
    }
    Ok(())
}

/// Streaming: parse the SSE body line by line, forwarding each textual delta
/// until `[DONE]` or the connection ends.
async fn run_streaming(
    http: &reqwest::Client,
    url: &str,
    credential: Option<&str>,
    request: &ChatRequest,
    tx: &mpsc::Sender<StreamEvent>,
) -> Result<(), ClientError> {
    let mut response = send_chat_request(http, url, credential, request).await?;

    let mut buffer = String::new();
    let mut fragment_count = 0usize;
    let mut total_content_len = 0usize;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?
    {
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        // Process complete lines from the buffer
        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim().to_string();
            buffer.drain(..pos + 1);

            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data == "[DONE]" {
                info!(
                    "Stream complete: {} fragments, {} content bytes",
                    fragment_count, total_content_len
                );
                return Ok(());
            }

            match serde_json::from_str::<ChunkEvent>(data) {
                Ok(event) => {
                    for choice in event.choices {
                        // Role-only and control deltas carry no text; skip them
                        // rather than emit empty fragments.
                        if let Some(content) = choice.delta.content
                            && !content.is_empty()
                        {
                            fragment_count += 1;
                            total_content_len += content.len();
                            if tx.send(StreamEvent::Delta(content)).await.is_err() {
                                debug!("Fragment receiver dropped, ending stream");
                                return Ok(());
                            }
                        }
                    }
                }
                Err(e) => {
                    debug!("Skipping unparseable stream event: {e}");
                }
            }
        }
    }

    info!(
        "Stream ended: {} fragments, {} content bytes",
        fragment_count, total_content_len
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Role;

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::user("Hello")],
            stream: true,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"model":"test-model","messages":[{"role":"user","content":"Hello"}],"stream":true}"#
        );
    }

    #[test]
    fn test_chunk_event_with_content() {
        let event: ChunkEvent =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(event.choices.len(), 1);
        assert_eq!(event.choices[0].delta.content.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_chunk_event_role_only_delta() {
        let event: ChunkEvent =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(event.choices[0].delta.content, None);
    }

    #[test]
    fn test_chunk_event_without_choices() {
        // Control events (e.g. usage-only frames) parse to an empty choice list.
        let event: ChunkEvent = serde_json::from_str(r#"{"usage":{"total_tokens":3}}"#).unwrap();
        assert!(event.choices.is_empty());
    }

    #[test]
    fn test_chat_response_parse() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Hello world"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content, "Hello world");
    }

    #[test]
    fn test_model_list_response_parse() {
        let parsed: ModelListResponse = serde_json::from_str(
            r#"{"object":"list","data":[{"id":"m1"},{"id":"m2","owned_by":"org"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[1].owned_by.as_deref(), Some("org"));
    }

    #[test]
    fn test_connect_rejects_malformed_endpoint() {
        let config = ProviderConfig::new("bad").with_endpoint("ftp://example.com");
        assert!(matches!(
            LlmClient::connect(config),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_connect_rejects_bad_credential_shape() {
        let config = ProviderConfig::new("bad").with_credential("key\nwith-newline");
        assert!(matches!(
            LlmClient::connect(config),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_close_marks_client_unusable() {
        let mut client = LlmClient::connect(ProviderConfig::new("openai")).unwrap();
        assert!(!client.is_closed());
        client.close();
        assert!(client.is_closed());
    }

    #[test]
    fn test_messages_serialize_in_order() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![
                ChatMessage::system("You are a helpful assistant."),
                ChatMessage::user("Hi"),
            ],
            stream: false,
        };
        let value = serde_json::to_value(&request).unwrap();
        let roles: Vec<_> = value["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(roles, vec!["system", "user"]);
        assert_eq!(request.messages[1].role, Role::User);
    }
}
