//! OpenAI-compatible chat completions client, usable against any endpoint
//! that speaks the /chat/completions wire shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tracing::debug;

use crate::{ChunkStream, CompletionProvider, CompletionRequest, ProviderError, ProviderResult, StreamChunk};

const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn to_api_request(request: CompletionRequest, stream: bool) -> ApiRequest {
        let mut messages = Vec::new();
        if let Some(system) = request.system {
            messages.push(ApiMessage {
                role: "system".into(),
                content: system,
            });
        }
        messages.push(ApiMessage {
            role: "user".into(),
            content: request.prompt,
        });
        ApiRequest {
            model: request.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        }
    }

    async fn send(&self, payload: &ApiRequest) -> ProviderResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.api_base);
        debug!(model = %payload.model, stream = payload.stream, "sending completion request");
        let resp = self
            .client
            .post(url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }
        Ok(resp)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    async fn complete(&self, request: CompletionRequest) -> ProviderResult<String> {
        let payload = Self::to_api_request(request, false);
        let resp = self.send(&payload).await?;
        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("malformed response: {e}")))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Unavailable("response carried no content".into()))
    }

    async fn stream(&self, request: CompletionRequest) -> ProviderResult<ChunkStream> {
        let payload = Self::to_api_request(request, true);
        let resp = self.send(&payload).await?;
        let mut bytes = resp.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut buffer = String::new();
            let mut finished = false;
            'outer: while let Some(part) = bytes.next().await {
                let part = part
                    .map_err(|e| ProviderError::Unavailable(format!("stream interrupted: {e}")))?;
                buffer.push_str(&String::from_utf8_lossy(&part));

                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);
                    let Some(data) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let data = data.trim();
                    if data == "[DONE]" {
                        finished = true;
                        break 'outer;
                    }
                    let event: StreamEvent = serde_json::from_str(data).map_err(|e| {
                        ProviderError::Unavailable(format!("malformed stream event: {e}"))
                    })?;
                    let delta = event
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content)
                        .unwrap_or_default();
                    if !delta.is_empty() {
                        yield StreamChunk {
                            delta,
                            is_final: false,
                        };
                    }
                }
            }
            if !finished {
                Err(ProviderError::Unavailable(
                    "stream ended before [DONE]".into(),
                ))?;
            }
            yield StreamChunk {
                delta: String::new(),
                is_final: true,
            };
        };
        Ok(Box::pin(stream))
    }
}

fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(REQUEST_TIMEOUT_SECS)
    } else {
        ProviderError::Unavailable(err.to_string())
    }
}

fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let summary = body.chars().take(200).collect::<String>();
    match status.as_u16() {
        429 | 500..=599 => ProviderError::Unavailable(format!("{status}: {summary}")),
        _ => ProviderError::InvalidRequest(format!("{status}: {summary}")),
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest {
        CompletionRequest::new("test-model", Some("be brief".into()), "hello")
    }

    #[tokio::test]
    async fn complete_extracts_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hi there"}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("sk-test", server.uri());
        let text = provider.complete(request()).await.unwrap();
        assert_eq!(text, "hi there");
    }

    #[tokio::test]
    async fn server_error_maps_to_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("sk-test", server.uri());
        let err = provider.complete(request()).await.err().unwrap();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[tokio::test]
    async fn auth_error_maps_to_invalid_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("sk-test", server.uri());
        let err = provider.complete(request()).await.err().unwrap();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn stream_parses_sse_deltas() {
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("sk-test", server.uri());
        let mut stream = provider.stream(request()).await.unwrap();
        let mut collected = String::new();
        let mut got_final = false;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if chunk.is_final {
                got_final = true;
            } else {
                collected.push_str(&chunk.delta);
            }
        }
        assert_eq!(collected, "Hello");
        assert!(got_final);
    }

    #[tokio::test]
    async fn truncated_stream_surfaces_error() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n";
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("sk-test", server.uri());
        let mut stream = provider.stream(request()).await.unwrap();
        let mut saw_error = false;
        while let Some(chunk) = stream.next().await {
            if chunk.is_err() {
                saw_error = true;
            }
        }
        assert!(saw_error);
    }
}
