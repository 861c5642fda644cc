//! Blocking client for the Gemini `batchEmbedContents` endpoint.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use ratehead_core::error::{Error, Result, ServiceError};
use ratehead_core::traits::EmbeddingService;
use ratehead_core::types::EmbeddingConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Read the API key from `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`.
pub fn api_key_from_env() -> Result<String> {
    ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
        .ok_or(Error::MissingCredential)
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, config: &EmbeddingConfig) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::MissingCredential);
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key.trim()).map_err(|_| Error::InvalidConfig("API key is not a valid header value".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:batchEmbedContents", self.base_url, model)
    }
}

impl EmbeddingService for GeminiClient {
    fn embed_chunk(&self, texts: &[String], config: &EmbeddingConfig) -> std::result::Result<Vec<Vec<f64>>, ServiceError> {
        let body = build_request(texts, config);
        let resp = self
            .client
            .post(self.endpoint(&config.model))
            .json(&body)
            .send()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ServiceError::Status { status: status.as_u16(), body });
        }
        let text = resp.text().map_err(|e| ServiceError::Transport(e.to_string()))?;
        parse_response(&text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'static str,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f64>,
}

fn build_request<'a>(texts: &'a [String], config: &EmbeddingConfig) -> BatchEmbedRequest<'a> {
    let model = format!("models/{}", config.model);
    BatchEmbedRequest {
        requests: texts
            .iter()
            .map(|text| EmbedContentRequest {
                model: model.clone(),
                content: Content { parts: [Part { text }] },
                task_type: config.task_type.as_str(),
                output_dimensionality: config.dimension,
            })
            .collect(),
    }
}

fn parse_response(text: &str) -> std::result::Result<Vec<Vec<f64>>, ServiceError> {
    let parsed: BatchEmbedResponse =
        serde_json::from_str(text).map_err(|e| ServiceError::Decode(e.to_string()))?;
    Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
}
