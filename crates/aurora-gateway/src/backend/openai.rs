//! OpenAI-compatible chat-completions provider.
//!
//! [`OpenAiBackend`] talks to any endpoint implementing `POST
//! {base_url}/chat/completions` (OpenAI, Azure OpenAI, local LLMs running
//! Ollama / llama.cpp, etc.), either as a single JSON completion or as a
//! server-sent-event token stream.

use async_trait::async_trait;
use aurora_kernel::llm::{CompletionProvider, CompletionRequest, ProviderError, TokenStream};
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::VecDeque;
use tracing::{debug, instrument};

/// Upper bound on upstream error text kept in [`ProviderError::Upstream`].
const MAX_ERROR_BODY: usize = 512;

pub struct OpenAiBackend {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl OpenAiBackend {
    /// - `base_url`: API root including the version, e.g. `https://api.openai.com/v1`.
    /// - `api_key`:  bearer key; `None` or blank leaves the backend unconfigured.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn body(&self, request: &CompletionRequest, stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "stream": stream,
        })
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured)?;
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, stream, "calling completion endpoint");

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .timeout(request.timeout)
            .json(&self.body(request, stream))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            message.truncate(floor_char_boundary(&message, MAX_ERROR_BODY));
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let body: Value = self
            .send(&request, false)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("missing choices[0].message.content".into())
            })
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream, ProviderError> {
        let response = self.send(&request, true).await?;
        Ok(sse_deltas(response.bytes_stream()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(e.to_string())
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    (0..=max).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0)
}

/// One parsed line of a completion event stream.
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Delta(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &[u8]) -> SseLine {
    let Ok(line) = std::str::from_utf8(line) else {
        return SseLine::Skip;
    };
    let Some(data) = line.trim().strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    serde_json::from_str::<Value>(data)
        .ok()
        .and_then(|v| {
            v.pointer("/choices/0/delta/content")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(|s| SseLine::Delta(s.to_string()))
        })
        .unwrap_or(SseLine::Skip)
}

struct SseState<S> {
    body: std::pin::Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

/// Turn a raw `text/event-stream` body into content deltas.
fn sse_deltas<S, B, E>(body: S) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };
    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.pending.pop_front() {
                return Some((Ok(delta), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(chunk.as_ref());
                    while let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                        match parse_sse_line(&line) {
                            SseLine::Delta(delta) => state.pending.push_back(delta),
                            SseLine::Done => {
                                state.finished = true;
                                break;
                            }
                            SseLine::Skip => {}
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(ProviderError::Network(e.to_string())), state));
                }
                None => {
                    if let SseLine::Delta(delta) = parse_sse_line(&state.buffer) {
                        state.pending.push_back(delta);
                    }
                    state.buffer.clear();
                    state.finished = true;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(content: &str) -> String {
        format!(
            "data: {}\n\n",
            json!({ "choices": [{ "delta": { "content": content } }] })
        )
    }

    #[test]
    fn parses_delta_done_and_noise() {
        assert_eq!(
            parse_sse_line(event("Hi").trim().as_bytes()),
            SseLine::Delta("Hi".into())
        );
        assert_eq!(parse_sse_line(b"data: [DONE]\n"), SseLine::Done);
        assert_eq!(parse_sse_line(b": keep-alive\n"), SseLine::Skip);
        assert_eq!(parse_sse_line(b"data: {\"choices\":[{\"delta\":{}}]}"), SseLine::Skip);
        assert_eq!(parse_sse_line(b"event: ping"), SseLine::Skip);
    }

    #[tokio::test]
    async fn reassembles_events_split_across_chunks() {
        let raw = format!(
            "{}{}{}data: [DONE]\n\n{}",
            event("You "),
            event("are "),
            event("INTJ"),
            event("ignored")
        );
        let bytes = raw.into_bytes();
        let chunks: Vec<Result<Vec<u8>, String>> =
            bytes.chunks(7).map(|c| Ok(c.to_vec())).collect();

        let deltas: Vec<String> = sse_deltas(futures::stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["You ", "are ", "INTJ"]);
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(event("partial").into_bytes()),
            Err("connection reset".into()),
        ];
        let items: Vec<_> = sse_deltas(futures::stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1], Err(ProviderError::Network(_))));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let backend =
            OpenAiBackend::new("http://127.0.0.1:9", Some("  ".into()), "gpt-4o-mini").unwrap();
        assert!(!backend.is_configured());
        let err = backend
            .complete(CompletionRequest::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
    }
}
