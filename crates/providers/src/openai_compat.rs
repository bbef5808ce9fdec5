//! OpenAI-compatible completion client.
//!
//! Works with Groq, OpenAI, OpenRouter, Ollama, and any endpoint exposing
//! `/v1/chat/completions`. Non-streaming only — the resolver's two calls
//! per message are short and blocking-from-the-caller's-view.

use async_trait::async_trait;
use balas_core::completion::{Completion, CompletionRequest};
use balas_core::error::CompletionError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible completion backend.
pub struct OpenAiCompatCompletion {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatCompletion {
    /// Create a new OpenAI-compatible client.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// Create a Groq client (convenience constructor).
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("groq", "https://api.groq.com/openai/v1", api_key, model)
    }

    /// Build a client from the completion section of the app config.
    ///
    /// Fails when no API key is configured — better to refuse at startup
    /// than to let every AI-strategy call collapse into the fallback.
    pub fn from_config(
        config: &balas_config::CompletionConfig,
    ) -> Result<Self, CompletionError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            CompletionError::NotConfigured(
                "no API key set (balas.toml [completion].api_key, BALAS_API_KEY, or GROQ_API_KEY)"
                    .into(),
            )
        })?;
        Ok(Self::new(
            "groq",
            config.api_url.clone(),
            api_key,
            config.model.clone(),
        ))
    }

    fn to_api_messages(request: &CompletionRequest) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(instructions) = &request.instructions {
            messages.push(ApiMessage {
                role: "system".into(),
                content: instructions.clone(),
            });
        }
        messages.push(ApiMessage {
            role: "user".into(),
            content: request.user_text.clone(),
        });
        messages
    }
}

#[async_trait]
impl Completion for OpenAiCompatCompletion {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": Self::to_api_messages(&request),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "stream": false,
        });

        debug!(backend = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(e.to_string())
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(CompletionError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(CompletionError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Completion backend returned error");
            return Err(CompletionError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response
                .json()
                .await
                .map_err(|e| CompletionError::ApiError {
                    status_code: 200,
                    message: format!("Failed to parse response: {e}"),
                })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
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
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groq_constructor() {
        let client = OpenAiCompatCompletion::groq("gsk-test", "llama-3.3-70b-versatile");
        assert_eq!(client.name(), "groq");
        assert!(client.base_url.contains("api.groq.com"));
        assert_eq!(client.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client =
            OpenAiCompatCompletion::new("local", "http://localhost:11434/v1/", "key", "m");
        assert_eq!(client.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = balas_config::CompletionConfig::default();
        assert!(matches!(
            OpenAiCompatCompletion::from_config(&config),
            Err(CompletionError::NotConfigured(_))
        ));

        let mut with_key = balas_config::CompletionConfig::default();
        with_key.api_key = Some("gsk-test".into());
        let client = OpenAiCompatCompletion::from_config(&with_key).unwrap();
        assert_eq!(client.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn instructions_become_system_message() {
        let request = CompletionRequest {
            instructions: Some("Anda adalah asisten.".into()),
            user_text: "halo".into(),
            max_tokens: 500,
            temperature: 0.7,
        };
        let messages = OpenAiCompatCompletion::to_api_messages(&request);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "halo");
    }

    #[test]
    fn bare_prompt_sends_single_user_message() {
        let request = CompletionRequest {
            instructions: None,
            user_text: "Jawab: YA atau TIDAK".into(),
            max_tokens: 10,
            temperature: 0.1,
        };
        let messages = OpenAiCompatCompletion::to_api_messages(&request);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn parse_response_with_content() {
        let data = r#"{"choices":[{"message":{"role":"assistant","content":"YA"}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("YA")
        );
    }

    #[test]
    fn parse_response_with_null_content() {
        let data = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn parse_response_without_choices() {
        let data = r#"{"choices":[]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
