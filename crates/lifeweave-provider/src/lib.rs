pub mod openai_compat;

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use tokio_stream::iter as stream_iter;

pub use openai_compat::OpenAiCompatProvider;

/// Why a completion call failed. Callers treat every variant as the
/// upstream being unavailable and fall back; the distinction only matters
/// for logging.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// One prompt sent to the text-completion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, system: Option<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system,
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

/// Incremental piece of a streamed completion. The terminal chunk carries an
/// empty delta and `is_final = true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub delta: String,
    pub is_final: bool,
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = ProviderResult<StreamChunk>> + Send>>;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> ProviderResult<String>;

    async fn stream(&self, _request: CompletionRequest) -> ProviderResult<ChunkStream> {
        Err(ProviderError::Unavailable(
            "streaming not supported by this provider".into(),
        ))
    }
}

/// Offline provider used in tests and when no upstream is configured.
pub struct StubProvider;

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(&self, request: CompletionRequest) -> ProviderResult<String> {
        Ok(format!("[stub:{}] {}", request.model, request.prompt))
    }

    async fn stream(&self, request: CompletionRequest) -> ProviderResult<ChunkStream> {
        let full_text = format!("[stub:{}] {}", request.model, request.prompt);
        let mut chunks: Vec<ProviderResult<StreamChunk>> = full_text
            .split_inclusive(' ')
            .map(|word| {
                Ok(StreamChunk {
                    delta: word.to_string(),
                    is_final: false,
                })
            })
            .collect();
        chunks.push(Ok(StreamChunk {
            delta: String::new(),
            is_final: true,
        }));
        Ok(Box::pin(stream_iter(chunks)))
    }
}
