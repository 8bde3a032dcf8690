//! Remote chat completion client

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Request timeout for the chat endpoint
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one chat completion call
///
/// Network and protocol faults are expected here, so they are carried as
/// data instead of raised: the loop renders a `Failure` as an error message
/// and keeps listening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatResult {
    /// The assistant's reply text
    Reply(String),
    /// Human-readable description of what went wrong
    Failure(String),
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Stateless client for a chat completion endpoint
///
/// Every request carries the fixed persona instruction and exactly one
/// user turn; no conversation history is kept.
pub struct ChatClient {
    client: reqwest::Client,
    url: String,
    persona: String,
}

impl ChatClient {
    /// Create a client for the given endpoint and persona instruction
    #[must_use]
    pub fn new(url: String, persona: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            url,
            persona,
        }
    }

    /// Request a completion for one transcript
    ///
    /// Never returns an error: connection failures, timeouts, non-2xx
    /// statuses, and malformed bodies all come back as
    /// [`ChatResult::Failure`].
    pub async fn complete(&self, transcript: &str) -> ChatResult {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.persona,
                },
                ChatMessage {
                    role: "user",
                    content: transcript,
                },
            ],
        };

        tracing::debug!(url = %self.url, chars = transcript.len(), "sending chat request");

        let response = match self.client.post(&self.url).json(&request).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "chat request failed");
                return ChatResult::Failure(format!("chat request failed: {e}"));
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::warn!(status = %status, body = %body, "chat endpoint error");
            return ChatResult::Failure(format!("chat endpoint returned {status}: {body}"));
        }

        parse_reply(&body)
    }
}

/// Extract `choices[0].message.content` from a response body
///
/// Any shape mismatch becomes a failure carrying the raw body for
/// diagnosis; an empty choices list is malformed, not an index panic.
fn parse_reply(body: &str) -> ChatResult {
    match serde_json::from_str::<ChatResponse>(body) {
        Ok(parsed) => match parsed.choices.into_iter().next() {
            Some(choice) => ChatResult::Reply(choice.message.content),
            None => ChatResult::Failure(format!("chat response had no choices: {body}")),
        },
        Err(e) => ChatResult::Failure(format!("unexpected chat response shape ({e}): {body}")),
    }
}
