use async_trait::async_trait;
use serde::Serialize;
use reqwest::Client;
use tracing::{debug, info};
use crate::error::{Result, AppError};

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

/// A text-in, text-out model used by the profile and fit steps.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    model: String,
    site_url: Option<String>,
    site_name: Option<String>,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            site_url: None,
            site_name: None,
        }
    }

    pub fn with_site(mut self, url: Option<String>, name: Option<String>) -> Self {
        self.site_url = url;
        self.site_name = name;
        self
    }
}

/// Pulls the first choice's message text out of a chat-completions response.
pub fn extract_reply(json: &serde_json::Value) -> Result<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| AppError::LlmError("Invalid response format from LLM".to_string()))
}

#[async_trait]
impl LanguageModel for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "user".into(),
                    content: prompt.into(),
                }
            ],
        };

        let mut request = self
            .client
            .post(OPENROUTER_URL)
            .bearer_auth(&self.api_key)
            .json(&body);

        // Add optional headers if provided
        if let Some(url) = &self.site_url {
            request = request.header("HTTP-Referer", url);
        }

        if let Some(name) = &self.site_name {
            request = request.header("X-Title", name);
        }

        debug!(model = %self.model, prompt_chars = prompt.len(), "calling LLM");
        let res = request
            .send()
            .await
            .map_err(|e| AppError::LlmError(e.to_string()))?;

        let status = res.status();
        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| AppError::LlmError(e.to_string()))?;
        if !status.is_success() {
            return Err(AppError::LlmError(format!("LLM API returned {}: {}", status, json)));
        }

        let reply = extract_reply(&json)?;
        info!(model = %self.model, reply_chars = reply.len(), "LLM call complete");
        Ok(reply)
    }
}
