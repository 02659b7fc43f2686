//! Request and response types for model invocation.

use crate::Role;
use serde::{Deserialize, Serialize};
use shakescript_error::BuilderError;

/// A single text message in a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Message {
    /// A user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// A system-role message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Prompt in, text out.
///
/// The builder rejects a request with no messages or a temperature
/// outside `0.0..=2.0`.
///
/// # Examples
///
/// ```
/// use shakescript_core::{GenerateRequest, Message};
///
/// let request = GenerateRequest::builder()
///     .messages(vec![Message::user("Is this consistent?")])
///     .max_tokens(10u32)
///     .temperature(0.1f32)
///     .build()
///     .unwrap();
///
/// assert_eq!(request.prompt(), "Is this consistent?");
/// assert_eq!(request.max_tokens, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, derive_builder::Builder)]
#[builder(
    setter(into, strip_option),
    default,
    build_fn(error = "BuilderError", validate = "Self::validate")
)]
pub struct GenerateRequest {
    /// The prompt messages to send
    pub messages: Vec<Message>,
    /// Maximum number of tokens to generate
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl GenerateRequest {
    /// Creates a new request builder.
    pub fn builder() -> GenerateRequestBuilder {
        GenerateRequestBuilder::default()
    }

    /// Single-message request, the shape every pipeline call uses.
    pub fn text(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
        }
    }

    /// All user-role text joined by blank lines.
    pub fn prompt(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The system message, if one was supplied.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }
}

impl GenerateRequestBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.messages.as_ref().is_none_or(Vec::is_empty) {
            return Err("request has no messages".to_string());
        }
        if let Some(Some(temperature)) = self.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(format!("temperature {} outside 0.0..=2.0", temperature));
        }
        Ok(())
    }
}

/// The model's text answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Generated text
    pub text: String,
}

impl GenerateResponse {
    /// Wrap generated text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakescript_error::{BuilderErrorKind, ShakescriptError};

    #[test]
    fn builder_rejects_empty_request() {
        let err = GenerateRequest::builder().max_tokens(10u32).build().unwrap_err();
        assert!(matches!(err.kind(), BuilderErrorKind::ValidationFailed(msg) if msg.contains("no messages")));
    }

    #[test]
    fn builder_rejects_out_of_range_temperature() {
        let err = GenerateRequest::builder()
            .messages(vec![Message::user("Hello")])
            .temperature(3.5f32)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("temperature 3.5"));

        let err: ShakescriptError = err.into();
        assert!(err.is_bad_request());
    }

    #[test]
    fn text_request_matches_builder() {
        let built = GenerateRequest::builder()
            .messages(vec![Message::user("Continue the story.")])
            .max_tokens(200u32)
            .temperature(0.7f32)
            .build()
            .unwrap();
        assert_eq!(built, GenerateRequest::text("Continue the story.", 200, 0.7));
    }
}
