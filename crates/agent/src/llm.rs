use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use taskmint_core::config::{LlmConfig, LlmProvider};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Builds the provider selected in config behind the `LlmClient` seam. The
/// reqwest timeout set here is the only bound on a completion call.
pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("failed to build http client")?;

    match config.provider {
        LlmProvider::Gemini => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| anyhow!("gemini provider requires llm.api_key"))?;
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_API_BASE_URL.to_string());
            Ok(Arc::new(GeminiClient { http, api_key, base_url, model: config.model.clone() }))
        }
        LlmProvider::Ollama => {
            let base_url = config
                .base_url
                .clone()
                .ok_or_else(|| anyhow!("ollama provider requires llm.base_url"))?;
            Ok(Arc::new(OllamaClient { http, base_url, model: config.model.clone() }))
        }
    }
}

/// Google Generative Language API (`models/{model}:generateContent`).
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key.expose_secret()
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("gemini returned http {status}"));
        }

        let parsed: GeminiResponse =
            response.json().await.context("gemini response body was not valid json")?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate.content.parts.into_iter().map(|part| part.text).collect::<String>()
            })
            .ok_or_else(|| anyhow!("gemini response contained no candidates"))?;

        Ok(text)
    }
}

/// Local Ollama server (`/api/generate`, non-streaming).
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("ollama request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("ollama returned http {status}"));
        }

        let parsed: OllamaResponse =
            response.json().await.context("ollama response body was not valid json")?;
        Ok(parsed.response)
    }
}
