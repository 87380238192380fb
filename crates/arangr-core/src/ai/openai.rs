use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CompletionClient, CompletionRequest};
use crate::config::Config;
use crate::error::{AssistantError, AssistantResult};
use crate::state::ChatMessage;

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    endpoint: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, base_url: &str) -> AssistantResult<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| AssistantError::ClientInit(format!("API key is not a valid header value: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AssistantError::ClientInit(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &Config) -> AssistantResult<Self> {
        let api_key = config
            .credential()
            .ok_or_else(|| AssistantError::ClientInit("no API key configured".to_string()))?;
        Self::new(api_key, config.base_url())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> AssistantResult<String> {
        let body = OpenAIRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            model = %request.model,
            message_count = request.messages.len(),
            max_tokens = request.max_tokens,
            "Sending chat completion request"
        );

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, "OpenAI API returned an error");
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => AssistantError::RateLimited,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AssistantError::AuthFailed(text),
                _ => AssistantError::CompletionRequest(format!("OpenAI API error {}: {}", status, text)),
            });
        }

        let openai_response: OpenAIResponse = response.json().await?;
        parse_reply(openai_response)
    }
}

fn parse_reply(response: OpenAIResponse) -> AssistantResult<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AssistantError::MalformedResponse("no completion choices".to_string()))?;

    if content.trim().is_empty() {
        return Err(AssistantError::MalformedResponse("empty completion".to_string()));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("hi")];
        let body = OpenAIRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
            max_tokens: 200,
            temperature: 0.5,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["max_tokens"], 200);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_parse_reply_takes_first_choice() {
        let response: OpenAIResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"one"}},{"message":{"content":"two"}}]}"#,
        )
        .unwrap();
        assert_eq!(parse_reply(response).unwrap(), "one");
    }

    #[test]
    fn test_parse_reply_without_choices_is_malformed() {
        let response: OpenAIResponse = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert!(matches!(
            parse_reply(response),
            Err(AssistantError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_reply_null_content_is_malformed() {
        let response: OpenAIResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(parse_reply(response).is_err());
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = OpenAIClient::new("sk-test", "http://localhost:8080/v1/").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_key_with_newline_fails_client_init() {
        let result = OpenAIClient::new("sk-bad\nkey", "https://api.openai.com/v1");
        assert!(matches!(result, Err(AssistantError::ClientInit(_))));
    }

    #[test]
    fn test_from_config_requires_key() {
        let result = OpenAIClient::from_config(&Config::default());
        assert!(matches!(result, Err(AssistantError::ClientInit(_))));
    }
}
