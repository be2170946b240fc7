use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::llm::TextModel;
use crate::config::ModelConfig;
use crate::error::StepError;

/// Blocking client for the Ollama `/api/generate` endpoint.
pub struct OllamaModel {
    base_url: String,
    model: String,
    temperature: f32,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaModel {
    pub fn new(config: &ModelConfig) -> Result<Self, StepError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            client,
        })
    }
}

impl TextModel for OllamaModel {
    fn generate(&self, prompt: &str) -> Result<String, StepError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        debug!("Generating with model {} ({} prompt bytes)", self.model, prompt.len());

        let response = self.client.post(&url).json(&request).send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(StepError::Model(format!(
                "Generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response.json()?;
        Ok(generated.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            model: "llama3",
            prompt: "hi",
            stream: false,
            options: GenerateOptions { temperature: 0.5 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.5);
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let config = ModelConfig {
            endpoint: "http://localhost:11434/".to_string(),
            ..ModelConfig::default()
        };
        let model = OllamaModel::new(&config).unwrap();
        assert_eq!(model.base_url, "http://localhost:11434");
        assert_eq!(model.model(), "llama3");
    }

    #[test]
    fn test_unreachable_endpoint_is_an_error() {
        let config = ModelConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..ModelConfig::default()
        };
        let model = OllamaModel::new(&config).unwrap();
        assert!(model.generate("hello").is_err());
    }
}
