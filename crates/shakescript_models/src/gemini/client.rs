//! Google Gemini implementation of [`ShakescriptDriver`].
//!
//! # Example
//!
//! ```no_run
//! use shakescript_models::GeminiClient;
//! use shakescript_core::GenerateRequest;
//! use shakescript_interface::ShakescriptDriver;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new()?;
//! let response = client
//!     .generate(&GenerateRequest::text("Name a river in Kerala.", 50, 0.2))
//!     .await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::env;
use std::time::Duration;
use tokio_retry2::{Retry, RetryError, strategy::ExponentialBackoff, strategy::jitter};
use tracing::{debug, instrument, warn};

use gemini_rust::{Gemini, client::Model};

use shakescript_core::{GenerateRequest, GenerateResponse};
use shakescript_error::{
    GeminiError, GeminiErrorKind, RetryableError, ShakescriptResult,
};
use shakescript_interface::ShakescriptDriver;

use super::GeminiResult;

/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Gemini REST client with retry on transient HTTP failures.
#[derive(Clone)]
pub struct GeminiClient {
    client: Gemini,
    model_name: String,
    max_retries: Option<usize>,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model_name", &self.model_name)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Client for the default model, keyed from `GEMINI_API_KEY`.
    pub fn new() -> GeminiResult<Self> {
        Self::with_model(DEFAULT_GEMINI_MODEL)
    }

    /// Client for `model_name`, keyed from `GEMINI_API_KEY`.
    pub fn with_model(model_name: impl Into<String>) -> GeminiResult<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| GeminiError::new(GeminiErrorKind::MissingApiKey))?;
        Self::from_api_key(&api_key, model_name)
    }

    /// Client with an explicit API key.
    pub fn from_api_key(api_key: &str, model_name: impl Into<String>) -> GeminiResult<Self> {
        let model_name = model_name.into();
        let client = Gemini::with_model(api_key, Self::model_name_to_enum(&model_name))
            .map_err(|e| GeminiError::new(GeminiErrorKind::ClientCreation(e.to_string())))?;
        Ok(Self {
            client,
            model_name,
            max_retries: None,
        })
    }

    /// Override the retry count chosen from the error type. `0` disables retry.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    fn model_name_to_enum(name: &str) -> Model {
        match name {
            "gemini-2.5-flash" => Model::Gemini25Flash,
            "gemini-2.5-flash-lite" => Model::Gemini25FlashLite,
            "gemini-2.5-pro" => Model::Gemini25Pro,
            other if other.starts_with("models/") => Model::Custom(other.to_string()),
            other => Model::Custom(format!("models/{}", other)),
        }
    }

    /// One request, no retry.
    async fn send_once(&self, req: &GenerateRequest) -> GeminiResult<String> {
        let prompt = req.prompt();
        if prompt.trim().is_empty() {
            return Err(GeminiError::new(GeminiErrorKind::EmptyPrompt));
        }

        let mut builder = self.client.generate_content().with_user_message(&prompt);
        if let Some(system) = req.system_prompt() {
            builder = builder.with_system_prompt(system);
        }
        if let Some(temperature) = req.temperature {
            builder = builder.with_temperature(temperature);
        }
        if let Some(max_tokens) = req.max_tokens {
            builder = builder.with_max_output_tokens(max_tokens as i32);
        }

        let response = builder.execute().await.map_err(Self::parse_gemini_error)?;
        Ok(response.text())
    }

    #[instrument(skip(self, req), fields(model = %self.model_name, max_tokens = ?req.max_tokens))]
    async fn generate_internal(&self, req: &GenerateRequest) -> GeminiResult<GenerateResponse> {
        let first = self.send_once(req).await;
        let error = match first {
            Ok(text) => return Ok(GenerateResponse::new(text)),
            Err(e) => e,
        };

        if !error.is_retryable() || self.max_retries == Some(0) {
            warn!(error = %error, "Permanent Gemini error, failing immediately");
            return Err(error);
        }

        let (initial_ms, retries, max_delay_secs) = error.retry_strategy_params();
        let retries = self.max_retries.unwrap_or(retries);
        debug!(
            error = %error,
            initial_backoff_ms = initial_ms,
            max_retries = retries,
            "Gemini request failed, retrying with backoff"
        );

        let strategy = ExponentialBackoff::from_millis(initial_ms)
            .factor(2)
            .max_delay(Duration::from_secs(max_delay_secs))
            .map(jitter)
            .take(retries);

        let text = Retry::spawn(strategy, move || async move {
            match self.send_once(req).await {
                Ok(text) => Ok(text),
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, "Gemini request failed, will retry");
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
                Err(e) => Err(RetryError::Permanent(e)),
            }
        })
        .await?;

        Ok(GenerateResponse::new(text))
    }

    /// Lift the HTTP status out of a gemini-rust error message.
    ///
    /// Messages look like `bad response from server; code 503; description: ...`.
    fn parse_gemini_error(err: impl std::fmt::Display) -> GeminiError {
        let message = err.to_string();
        match Self::extract_status_code(&message) {
            Some(status_code) => GeminiError::new(GeminiErrorKind::HttpError {
                status_code,
                message,
            }),
            None => GeminiError::new(GeminiErrorKind::ApiRequest(message)),
        }
    }

    fn extract_status_code(message: &str) -> Option<u16> {
        let start = message.find("code ")? + 5;
        let digits: String = message[start..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }
}

#[async_trait]
impl ShakescriptDriver for GeminiClient {
    async fn generate(&self, req: &GenerateRequest) -> ShakescriptResult<GenerateResponse> {
        self.generate_internal(req).await.map_err(Into::into)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
