//! Completion client for the chat-completions API.
//!
//! This module holds the request model (mode, prompt, token bound), the
//! typed error taxonomy returned by a generation call, and the HTTP client
//! itself in [`openai`].

pub mod openai;

pub use openai::CompletionClient;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest prompt the form accepts, in characters.
pub const MAX_PROMPT_CHARS: usize = 50;
/// Smallest token bound accepted.
pub const MIN_TOKENS: u32 = 1;
/// Largest token bound accepted.
pub const MAX_TOKENS: u32 = 500;

/// Framing template applied to the prompt before submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Song,
    Poem,
}

impl Mode {
    /// The instruction sentence prefixed to the user's prompt.
    pub fn framing(self) -> &'static str {
        match self {
            Mode::Song => "I need you to help me write a song.",
            Mode::Poem => "I need you to help me write a poem.",
        }
    }

    /// Capitalized name, as shown in the history view.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Song => "Song",
            Mode::Poem => "Poem",
        }
    }

    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            Mode::Song => Mode::Poem,
            Mode::Poem => Mode::Song,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Song => f.write_str("song"),
            Mode::Poem => f.write_str("poem"),
        }
    }
}

impl FromStr for Mode {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "song" => Ok(Mode::Song),
            "poem" => Ok(Mode::Poem),
            _ => Err(RequestError::UnknownMode(s.to_string())),
        }
    }
}

/// Rejections raised while building a request, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Please enter a prompt.")]
    EmptyPrompt,
    #[error("Prompt must be at most 50 characters.")]
    PromptTooLong,
    #[error("Maximum number of tokens must be between 1 and 500.")]
    TokensOutOfRange,
    #[error("Unknown mode '{0}': expected 'song' or 'poem'.")]
    UnknownMode(String),
}

/// A single generation, built fresh for every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    mode: Mode,
    max_tokens: u32,
}

impl GenerationRequest {
    /// Validate and build a request.
    pub fn new(prompt: impl Into<String>, mode: Mode, max_tokens: u32) -> Result<Self, RequestError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(RequestError::EmptyPrompt);
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(RequestError::PromptTooLong);
        }
        if !(MIN_TOKENS..=MAX_TOKENS).contains(&max_tokens) {
            return Err(RequestError::TokensOutOfRange);
        }
        Ok(Self {
            prompt,
            mode,
            max_tokens,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// The single user message sent to the model.
    pub fn framed_prompt(&self) -> String {
        format!("{} {}", self.mode.framing(), self.prompt)
    }
}

/// Failure of a generation call, classified by HTTP status where one exists.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Bad Request: The server could not understand the request due to invalid syntax.")]
    BadRequest,
    #[error("Unauthorized: The client must authenticate itself to get the requested response.")]
    Unauthorized,
    #[error("Forbidden: The client does not have access rights to the content.")]
    Forbidden,
    #[error("Not Found: The server can not find the requested resource.")]
    NotFound,
    #[error("Internal Server Error: The server has encountered a situation it doesn't know how to handle.")]
    InternalServerError,
    #[error("Error: {status}, {body}")]
    Other { status: u16, body: String },
    /// The request never produced an HTTP response.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(#[source] reqwest::Error),
    /// A success status whose body did not carry a completion.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl CompletionError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => CompletionError::BadRequest,
            401 => CompletionError::Unauthorized,
            403 => CompletionError::Forbidden,
            404 => CompletionError::NotFound,
            500 => CompletionError::InternalServerError,
            _ => CompletionError::Other { status, body },
        }
    }

    /// The HTTP status behind this error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            CompletionError::BadRequest => Some(400),
            CompletionError::Unauthorized => Some(401),
            CompletionError::Forbidden => Some(403),
            CompletionError::NotFound => Some(404),
            CompletionError::InternalServerError => Some(500),
            CompletionError::Other { status, .. } => Some(*status),
            CompletionError::NetworkUnavailable(_) | CompletionError::MalformedResponse(_) => None,
        }
    }
}
