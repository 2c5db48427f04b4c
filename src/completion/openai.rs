//! OpenAI chat-completions client.
//!
//! One POST per generation: no retries, no caching, and no timeout unless the
//! configuration sets one.

use super::{CompletionError, GenerationRequest};
use crate::config::ClientConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// HTTP client for a chat-completions endpoint.
pub struct CompletionClient {
    pub model: String,
    url: String,
    api_key: Option<String>,
    client: Client,
}

impl CompletionClient {
    /// Create a new client from resolved settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        if config.api_key.is_none() {
            warn!("No API key configured; requests will be rejected as unauthorized");
        }

        Ok(Self {
            model: config.model,
            url: config.url,
            api_key: config.api_key,
            client,
        })
    }

    /// Generate text for a request.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: request.framed_prompt(),
            }],
            max_tokens: request.max_tokens(),
        };

        debug!(
            prompt = request.prompt(),
            mode = %request.mode(),
            max_tokens = request.max_tokens(),
            "Sending completion request to {}",
            self.url
        );

        let response = self
            .client
            .post(&self.url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.as_deref().unwrap_or_default()),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("Completion request did not reach the server: {}", e);
                CompletionError::NetworkUnavailable(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!("Failed to read error response body: {}", e);
                    String::new()
                }
            };
            let err = CompletionError::from_status(status.as_u16(), body);
            warn!(status = status.as_u16(), "Completion request failed: {}", err);
            return Err(err);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::MalformedResponse("no choices returned".to_string()))?;

        info!(chars = text.chars().count(), "Completion received");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Mode;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, api_key: Option<&str>) -> CompletionClient {
        CompletionClient::new(ClientConfig {
            url: server.url("/v1/chat/completions"),
            model: "gpt-3.5-turbo".to_string(),
            api_key: api_key.map(str::to_string),
            timeout: None,
        })
        .unwrap()
    }

    fn success_body(content: &str) -> serde_json::Value {
        json!({
            "choices": [
                {
                    "index": 0,
                    "finish_reason": "stop",
                    "message": { "role": "assistant", "content": content }
                }
            ]
        })
    }

    #[tokio::test]
    async fn test_generate_sends_framed_prompt_and_returns_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("Authorization", "Bearer test-key")
                    .json_body(json!({
                        "model": "gpt-3.5-turbo",
                        "messages": [
                            {
                                "role": "user",
                                "content": "I need you to help me write a song. write about rain"
                            }
                        ],
                        "max_tokens": 50
                    }));
                then.status(200).json_body(success_body("Raindrops falling..."));
            })
            .await;

        let client = client_for(&server, Some("test-key"));
        let request = GenerationRequest::new("write about rain", Mode::Song, 50).unwrap();
        let text = client.generate(&request).await.unwrap();

        assert_eq!(text, "Raindrops falling...");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_keeps_content_verbatim() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(success_body("  line one\nline two\n"));
            })
            .await;

        let client = client_for(&server, Some("test-key"));
        let request = GenerationRequest::new("the sea", Mode::Poem, 20).unwrap();
        assert_eq!(
            client.generate(&request).await.unwrap(),
            "  line one\nline two\n"
        );
    }

    #[tokio::test]
    async fn test_generate_classifies_unauthorized() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401)
                    .json_body(json!({ "error": { "message": "Incorrect API key provided" } }));
            })
            .await;

        let client = client_for(&server, None);
        let request = GenerationRequest::new("rain", Mode::Song, 10).unwrap();
        let err = client.generate(&request).await.unwrap_err();

        assert!(matches!(err, CompletionError::Unauthorized));
        assert_eq!(
            err.to_string(),
            "Unauthorized: The client must authenticate itself to get the requested response."
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_reports_unlisted_status_with_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(503).body("upstream overloaded");
            })
            .await;

        let client = client_for(&server, Some("test-key"));
        let request = GenerationRequest::new("rain", Mode::Song, 10).unwrap();
        let err = client.generate(&request).await.unwrap_err();

        assert_eq!(err.to_string(), "Error: 503, upstream overloaded");
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_choices() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let client = client_for(&server, Some("test-key"));
        let request = GenerationRequest::new("rain", Mode::Song, 10).unwrap();
        let err = client.generate(&request).await.unwrap_err();
        assert!(matches!(err, CompletionError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_generate_maps_missing_response_to_network_unavailable() {
        // Nothing listens on port 1.
        let client = CompletionClient::new(ClientConfig {
            url: "http://127.0.0.1:1/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key: Some("test-key".to_string()),
            timeout: None,
        })
        .unwrap();
        let request = GenerationRequest::new("rain", Mode::Song, 10).unwrap();
        let err = client.generate(&request).await.unwrap_err();

        assert!(matches!(err, CompletionError::NetworkUnavailable(_)));
        assert!(err.status().is_none());
    }
}
