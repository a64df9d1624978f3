use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::{http_client, is_placeholder_key, truncate_chars};
use crate::config::LlmConfig;

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("LLM endpoint returned no content")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completion endpoint
pub struct LlmClient {
    base_url: String,
    api_key: String,
    model: String,
    source_lang: String,
    target_lang: String,
    client: reqwest::Client,
}

impl LlmClient {
    #[must_use]
    pub fn new(config: &LlmConfig, timeout_secs: u64) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
            client: http_client(timeout_secs),
        }
    }

    /// `None` when no key is configured
    #[must_use]
    pub fn from_config(config: &LlmConfig, timeout_secs: u64) -> Option<Self> {
        if is_placeholder_key(&config.api_key) {
            return None;
        }
        Some(Self::new(config, timeout_secs))
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Send one user turn and return the trimmed reply
    pub async fn complete(&self, prompt: &str) -> Result<String, EnrichError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, 200),
            });
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(EnrichError::EmptyResponse)?;
        debug!("LLM replied with {} chars", content.chars().count());

        Ok(content)
    }

    /// Translate from the configured source to the target language. Blank text is
    /// returned as is, without a request.
    pub async fn translate(&self, text: &str) -> Result<String, EnrichError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        let prompt = format!(
            "Translate the following text from {} to {}. Reply with the translation only, \
             without quotes or explanations.\n\n{text}",
            self.source_lang, self.target_lang
        );
        self.complete(&prompt).await
    }

    /// Ask for a relevance ordering of `titles`; the reply is expected to hold a JSON
    /// array of the zero-based title numbers, most relevant first.
    pub async fn rank(&self, query: &str, titles: &[&str]) -> Result<String, EnrichError> {
        let numbered: Vec<String> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| format!("{i}. {title}"))
            .collect();
        let prompt = format!(
            "Rank the following news titles by relevance to the query \"{query}\". \
             Reply only with a JSON array of the title numbers, most relevant first, \
             for example [2, 0, 1].\n\n{}",
            numbered.join("\n")
        );
        self.complete(&prompt).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use httpmock::prelude::*;
    use tokio::test;

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            api_key: "llm-key".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    async fn test_complete() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer llm-key")
                .body_contains("\"role\":\"user\"");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "  سلام \n"}}]}"#,
                );
        });

        let client = LlmClient::new(&config(&server.base_url()), 5);
        let reply = client.translate("Hello").await.unwrap();
        mock.assert();
        assert_eq!(reply, "سلام");
    }

    #[test]
    async fn test_blank_text_skips_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200);
        });

        let client = LlmClient::new(&config(&server.base_url()), 5);
        assert_eq!(client.translate("  ").await.unwrap(), "  ");
        mock.assert_hits(0);
    }

    #[test]
    async fn test_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401).body("unauthorized");
        });

        let client = LlmClient::new(&config(&server.base_url()), 5);
        match client.complete("hi").await {
            Err(EnrichError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    async fn test_empty_choices() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"choices": []}"#);
        });

        let client = LlmClient::new(&config(&server.base_url()), 5);
        assert!(matches!(
            client.complete("hi").await,
            Err(EnrichError::EmptyResponse)
        ));
    }

    #[test]
    async fn test_unconfigured_key() {
        assert!(LlmClient::from_config(&LlmConfig::default(), 5).is_none());
        assert!(LlmClient::from_config(&config("http://localhost"), 5).is_some());
    }
}
