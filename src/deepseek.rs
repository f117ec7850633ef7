//! DeepSeek chat-completions client used for summary generation.

use crate::config::DeepSeekConfig;
use crate::error::{PublishError, Result};
use crate::traits::Summarize;
use crate::utils::truncate_text;
use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Ceiling on the article text sent in a single request.
const MAX_INPUT_CHARS: usize = 4000;

const SYSTEM_PROMPT: &str = "You are an editor for a WeChat Official Account. \
Summarize the article you are given into a single short paragraph suitable \
as the article digest. Reply with the summary text only, no quotes, no \
preamble.";

/// Client for the DeepSeek chat-completions endpoint.
pub struct DeepSeekClient {
    client: Client,
    config: DeepSeekConfig,
}

impl DeepSeekClient {
    pub fn new(config: DeepSeekConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Summarize for DeepSeekClient {
    async fn summarize(&self, text: &str, max_chars: usize) -> Result<String> {
        let input = truncate_text(text, MAX_INPUT_CHARS);
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!(
                        "Summarize the following article in at most {max_chars} characters:\n\n{input}"
                    ),
                },
            ],
            stream: false,
        };

        debug!(model = %self.config.model, input_chars = input.chars().count(), "requesting summary");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unreadable body".to_string());
            return Err(PublishError::Internal(anyhow!(
                "summary request failed with HTTP {status}: {body}"
            )));
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PublishError::Internal(anyhow!("summary response had no choices")))?;

        Ok(truncate_text(trim_quotes(content.trim()), max_chars))
    }
}

/// Strips one layer of wrapping quotes the model sometimes adds.
fn trim_quotes(text: &str) -> &str {
    let pairs = [('"', '"'), ('\u{201c}', '\u{201d}'), ('\'', '\'')];
    for (open, close) in pairs {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|t| t.strip_suffix(close))
        {
            return inner;
        }
    }
    text
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = DeepSeekConfig::new("sk-test");
        assert!(DeepSeekClient::new(config, Duration::from_secs(30)).is_ok());
    }

    #[test]
    fn test_trim_quotes() {
        assert_eq!(trim_quotes("\"summary\""), "summary");
        assert_eq!(trim_quotes("\u{201c}总结\u{201d}"), "总结");
        assert_eq!(trim_quotes("no quotes"), "no quotes");
        assert_eq!(trim_quotes("\"unbalanced"), "\"unbalanced");
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "A short digest."}}
            ]
        }"#;
        let chat: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(chat.choices[0].message.content, "A short digest.");
    }
}
