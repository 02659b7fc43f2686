//! Language-model provider integrations for Shakescript.
//!
//! Each provider is behind a cargo feature and implements
//! [`ShakescriptDriver`](shakescript_interface::ShakescriptDriver).
//!
//! | Feature  | Provider         |
//! |----------|------------------|
//! | `gemini` | Google Gemini    |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{DEFAULT_GEMINI_MODEL, GeminiClient, GeminiResult};
