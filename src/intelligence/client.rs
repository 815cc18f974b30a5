use serde::{Deserialize, Serialize};

use super::IntelligenceError;
use crate::config::EngineConfig;

/// AI inference client abstraction (allows mocking).
pub trait LlmClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, IntelligenceError>;
}

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.ollama_base_url, config.request_timeout_secs)
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, IntelligenceError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                IntelligenceError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                IntelligenceError::HttpClient(format!(
                    "Request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                IntelligenceError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(IntelligenceError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| IntelligenceError::JsonParsing(e.to_string()))?;

        Ok(parsed.response)
    }
}

/// Mock client for testing — returns a configurable response.
pub struct MockLlmClient {
    response: String,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, IntelligenceError> {
        Ok(self.response.clone())
    }
}

/// Mock client simulating a service that is down.
pub struct UnreachableLlmClient;

impl LlmClient for UnreachableLlmClient {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, IntelligenceError> {
        Err(IntelligenceError::Connection("http://localhost:11434".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockLlmClient::new("test response");
        let result = client.generate("model", "prompt").unwrap();
        assert_eq!(result, "test response");
    }

    #[test]
    fn unreachable_client_reports_connection_error() {
        let client = UnreachableLlmClient;
        let result = client.generate("model", "prompt");
        assert!(matches!(result, Err(IntelligenceError::Connection(_))));
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", 60);
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.timeout_secs, 60);
    }

    #[test]
    fn from_config_uses_configured_endpoint() {
        let config = EngineConfig::default();
        let client = OllamaClient::from_config(&config);
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.timeout_secs, 120);
    }
}
