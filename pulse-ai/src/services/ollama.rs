//! Ollama inference endpoint client
//!
//! Thin transport over the local text-generation service: `POST
//! /api/generate` for completions and `GET /api/tags` as the availability
//! probe. The reply string is returned as-is; all structural interpretation
//! happens in the classifier, which treats it as untrusted.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Sampling defaults chosen for classification work: near-deterministic
/// output, bounded reply length.
const TEMPERATURE: f64 = 0.1;
const TOP_P: f64 = 0.9;

/// Availability probes should fail fast regardless of the generate timeout
const TAGS_TIMEOUT: Duration = Duration::from_secs(5);

/// Classification transport errors
///
/// These never cross the classifier boundary: every variant degrades into
/// the keyword fallback there.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Inference endpoint returned {0}: {1}")]
    Api(u16, String),

    #[error("Failed to parse endpoint reply: {0}")]
    Parse(String),

    #[error("Inference call timed out after {0} ms")]
    Timeout(u64),
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    top_p: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Client for an Ollama-style inference endpoint
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
    request_timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, request_timeout_ms: u64) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one completion and return the raw reply text
    ///
    /// Every call carries an explicit deadline so a hung backend fails the
    /// call instead of stalling the enrichment run.
    pub async fn generate(&self, prompt: &str, num_predict: u32) -> Result<String, ClassifierError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                num_predict,
            },
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout(self.request_timeout.as_millis() as u64)
                } else {
                    ClassifierError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(status.as_u16(), error_text));
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        Ok(generate_response.response)
    }

    /// List the models the endpoint has pulled
    pub async fn list_models(&self) -> Result<Vec<String>, ClassifierError> {
        let response = self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(TAGS_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout(TAGS_TIMEOUT.as_millis() as u64)
                } else {
                    ClassifierError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(status.as_u16(), error_text));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Availability probe used at startup and by the health endpoint
    pub async fn is_available(&self) -> bool {
        match self.list_models().await {
            Ok(models) => {
                tracing::debug!(count = models.len(), "Inference endpoint reachable");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Inference endpoint not reachable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_wire_shape() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "Classify this",
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                num_predict: 200,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 200);
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_tags_response_parsing() {
        let json = r#"{"models": [{"name": "llama3.2", "size": 123}, {"name": "mistral"}]}"#;
        let tags: TagsResponse = serde_json::from_str(json).unwrap();
        let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["llama3.2", "mistral"]);

        // Empty body still parses
        let empty: TagsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.models.is_empty());
    }

    #[test]
    fn test_base_url_normalization() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3.2", 30000).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.model(), "llama3.2");
    }
}
