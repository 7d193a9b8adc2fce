//! HTTP client for external LLM services (DeepSeek, vLLM, OpenAI, etc.)

use super::cache::{embedding_cache_key, EmbeddingCache};
use crate::config::LLMServiceConfig;
use crate::error::{HuiyuError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const INITIAL_BACKOFF_MS: u64 = 1000;

/// Trait for LLM service clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate chat completion
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String>;

    /// Generate embeddings for text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HuiyuError::Llm("No embedding returned".to_string()))
    }

    /// Generate embeddings for multiple texts
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(HuiyuError::Llm(format!(
            "{} does not serve embeddings",
            self.model_name()
        )))
    }

    /// Get embedding dimensions
    fn embedding_dimensions(&self) -> usize {
        0
    }

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling parameters for one completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::new(0.7, 512)
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct APIMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub total_retries: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub total_retries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub cache_entries: usize,
    pub avg_latency_ms: f64,
}

/// OpenAI-compatible client
pub struct VLLMClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    embedding_dimensions: usize,
    cache: Arc<EmbeddingCache>,
    metrics: Arc<APIMetrics>,
}

impl VLLMClient {
    /// Create new client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(HuiyuError::Http)?;

        // bge-small-zh-v1.5 produces 512-dimensional vectors
        let embedding_dimensions = config.embedding_dimensions.unwrap_or(512);

        Ok(Self {
            http_client,
            config,
            embedding_dimensions,
            cache: Arc::new(EmbeddingCache::new()),
            metrics: Arc::new(APIMetrics::default()),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LLMServiceConfig::default())
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        let total = self.metrics.total_requests.load(Ordering::Relaxed);
        let hits = self.metrics.cache_hits.load(Ordering::Relaxed);
        let misses = self.metrics.cache_misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            total_retries: self.metrics.total_retries.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate: if lookups > 0 {
                hits as f64 / lookups as f64 * 100.0
            } else {
                0.0
            },
            cache_entries: self.cache.len(),
            avg_latency_ms: if total > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => req.header("Authorization", format!("Bearer {}", api_key)),
            None => req,
        }
    }

    /// Send request, retrying timeouts, connect failures, 429 and 5xx
    async fn send_with_retry(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let req = request.try_clone().ok_or_else(|| {
                HuiyuError::ExternalError("Failed to clone request".to_string())
            })?;

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

                    if retryable && attempt < max_attempts {
                        let wait_ms = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(|secs| secs * 1000)
                            .unwrap_or(backoff_ms);

                        tracing::warn!(
                            "LLM service returned HTTP {}. Retrying in {} ms (attempt {}/{})",
                            status,
                            wait_ms,
                            attempt + 1,
                            max_attempts
                        );

                        self.metrics.total_retries.fetch_add(1, Ordering::Relaxed);
                        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                        attempt += 1;
                        backoff_ms *= 2;
                        continue;
                    }

                    return Ok(response);
                }
                Err(e) => {
                    let err = HuiyuError::Http(e);
                    if attempt >= max_attempts || !err.is_transient() {
                        return Err(err);
                    }

                    tracing::warn!(
                        "LLM request failed ({}). Retrying in {} ms (attempt {}/{})",
                        err,
                        backoff_ms,
                        attempt + 1,
                        max_attempts
                    );

                    self.metrics.total_retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                    backoff_ms *= 2;
                }
            }
        }
    }

    fn record_error(&self) {
        self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, start: Instant) {
        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);
    }
}

#[async_trait]
impl LLMClient for VLLMClient {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String> {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            #[serde(default)]
            content: Option<String>,
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.config.url.trim_end_matches('/')
        );
        let req = self.authorize(self.http_client.post(&url).json(&request));

        let response = self.send_with_retry(req).await.inspect_err(|_| {
            self.record_error();
        })?;

        if !response.status().is_success() {
            self.record_error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HuiyuError::ExternalError(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            self.record_error();
            HuiyuError::Http(e)
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                self.record_error();
                HuiyuError::Llm("No response from LLM".to_string())
            })?
            .message
            .content
            .unwrap_or_default();

        self.record_latency(start);
        tracing::debug!(
            "Chat completion: {} chars in {} ms (temperature {})",
            content.chars().count(),
            start.elapsed().as_millis(),
            options.temperature
        );

        Ok(content)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        // Check cache for each text
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let cache_key = embedding_cache_key(&self.config.embedding_model, text);
            if let Some(cached) = self.cache.get(&cache_key) {
                results.push(Some(cached));
                self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);
            results.push(None);
            uncached_texts.push(text.clone());
            uncached_indices.push(i);
        }

        if uncached_texts.is_empty() {
            tracing::debug!("All {} embeddings from cache", texts.len());
            return Ok(results.into_iter().flatten().collect());
        }

        tracing::debug!(
            "Embedding batch: {} cached, {} to fetch",
            texts.len() - uncached_texts.len(),
            uncached_texts.len()
        );

        #[derive(Serialize)]
        struct EmbedRequest {
            model: String,
            input: Vec<String>,
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            embedding: Vec<f32>,
        }

        let request = EmbedRequest {
            model: self.config.embedding_model.clone(),
            input: uncached_texts.clone(),
        };

        let url = format!(
            "{}/v1/embeddings",
            self.config.embeddings_url().trim_end_matches('/')
        );
        let req = self.authorize(self.http_client.post(&url).json(&request));

        let response = self.send_with_retry(req).await.inspect_err(|_| {
            self.record_error();
        })?;

        if !response.status().is_success() {
            self.record_error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HuiyuError::ExternalError(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            self.record_error();
            HuiyuError::Http(e)
        })?;

        if embed_response.data.len() != uncached_texts.len() {
            self.record_error();
            return Err(HuiyuError::Llm(format!(
                "Embedding service returned {} vectors for {} inputs",
                embed_response.data.len(),
                uncached_texts.len()
            )));
        }

        // Fill in uncached results and cache them
        for (i, data) in embed_response.data.into_iter().enumerate() {
            let cache_key = embedding_cache_key(&self.config.embedding_model, &uncached_texts[i]);
            self.cache.set(cache_key, data.embedding.clone());
            results[uncached_indices[i]] = Some(data.embedding);
        }

        self.record_latency(start);

        Ok(results.into_iter().flatten().collect())
    }

    fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> LLMServiceConfig {
        LLMServiceConfig {
            url: "http://127.0.0.1:9".to_string(),
            embedding_url: None,
            api_key: None,
            timeout_secs: 2,
            max_attempts: 1,
            ..LLMServiceConfig::default()
        }
    }

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
    }

    #[test]
    fn test_fresh_metrics() {
        let client = VLLMClient::new(unreachable_config()).unwrap();
        let metrics = client.metrics();
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.cache_hit_rate, 0.0);
        assert_eq!(client.embedding_dimensions(), 512);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let client = VLLMClient::new(unreachable_config()).unwrap();
        let result = client
            .chat_completion(vec![ChatMessage::user("你好")], &CompletionOptions::default())
            .await;
        assert!(result.is_err());

        let metrics = client.metrics();
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.total_errors, 1);
        assert_eq!(metrics.total_retries, 0);
    }
}
