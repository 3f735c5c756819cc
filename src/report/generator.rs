//! Text generation backends for Enhanced reports.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// System prompt sent ahead of the analysis context.
const SYSTEM_PROMPT: &str = "You are a senior engineer writing onboarding documentation for a software \
repository. Use only the facts in the provided analysis. Answer in Markdown with one `##` heading per \
requested section, in the requested order.";

/// Request limits for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationBudget {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for GenerationBudget {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4000,
            temperature: 0.3,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Errors from a text generation backend.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("service returned no text")]
    EmptyResponse,
    #[error("cannot start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// A source of generated Markdown.
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`. Implementations make at most one attempt.
    fn generate(&self, prompt: &str, budget: &GenerationBudget) -> Result<String, GenerationError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiGenerator {
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiGenerator {
    /// The key is taken as given; an absent or blank key fails every call
    /// with [`GenerationError::MissingCredential`].
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    async fn request(&self, key: &str, prompt: &str, budget: &GenerationBudget) -> Result<String, GenerationError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("repolens/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let body = ChatRequest {
            model: &budget.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: budget.max_tokens,
            temperature: budget.temperature,
        };

        let response = client
            .post(&self.endpoint)
            .bearer_auth(key)
            .timeout(budget.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_error(e, budget.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| classify_error(e, budget.timeout))?;
        content_of(parsed)
    }
}

impl TextGenerator for OpenAiGenerator {
    fn generate(&self, prompt: &str, budget: &GenerationBudget) -> Result<String, GenerationError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(GenerationError::MissingCredential);
        };
        tracing::debug!(endpoint = %self.endpoint, model = %budget.model, prompt_chars = prompt.len(), "requesting generation");

        // block_on panics on a thread that already drives a runtime
        if tokio::runtime::Handle::try_current().is_ok() {
            return std::thread::scope(|scope| {
                scope
                    .spawn(|| self.request_blocking(key, prompt, budget))
                    .join()
                    .unwrap_or_else(|_| {
                        Err(GenerationError::Runtime(std::io::Error::other(
                            "generation thread panicked",
                        )))
                    })
            });
        }
        self.request_blocking(key, prompt, budget)
    }
}

impl OpenAiGenerator {
    fn request_blocking(&self, key: &str, prompt: &str, budget: &GenerationBudget) -> Result<String, GenerationError> {
        let runtime = tokio::runtime::Runtime::new().map_err(GenerationError::Runtime)?;
        runtime.block_on(self.request(key, prompt, budget))
    }
}

fn classify_error(err: reqwest::Error, timeout: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout(timeout)
    } else {
        GenerationError::Http(err)
    }
}

fn content_of(response: ChatResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

fn truncate(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_fails_without_network() {
        let generator = OpenAiGenerator::new("http://127.0.0.1:9/never", None);
        let err = generator.generate("hello", &GenerationBudget::default()).unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredential));

        let blank = OpenAiGenerator::new("http://127.0.0.1:9/never", Some("  ".to_string()));
        assert!(matches!(
            blank.generate("hello", &GenerationBudget::default()),
            Err(GenerationError::MissingCredential)
        ));
    }

    #[test]
    fn test_content_of_response() {
        let ok: ChatResponse =
            serde_json::from_str(r###"{"choices": [{"message": {"role": "assistant", "content": "## Project Overview\nHi"}}]}"###)
                .unwrap();
        assert_eq!(content_of(ok).unwrap(), "## Project Overview\nHi");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(content_of(empty), Err(GenerationError::EmptyResponse)));

        let blank: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "   "}}]}"#).unwrap();
        assert!(matches!(content_of(blank), Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn test_request_shape() {
        let budget = GenerationBudget::default();
        let body = ChatRequest {
            model: &budget.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: "s",
                },
                ChatMessage {
                    role: "user",
                    content: "u",
                },
            ],
            max_tokens: budget.max_tokens,
            temperature: budget.temperature,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 4000);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("  short  ", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
