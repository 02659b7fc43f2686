//! Pipeline configuration.
//!
//! Sources, later overriding earlier:
//! - Bundled defaults (include_str! from shakescript.toml)
//! - `~/.config/shakescript/shakescript.toml`
//! - `./shakescript.toml`
//! - `SHAKESCRIPT_*` environment variables

use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use shakescript_core::GenerateRequest;
use shakescript_error::{ConfigError, ShakescriptError, ShakescriptResult};
use tracing::{debug, instrument};

/// Token budget and temperature for one kind of model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    /// Maximum tokens the model may produce
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Sampling {
    /// Create a sampling entry.
    pub const fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }

    /// Single-prompt request with these settings.
    pub fn request(&self, prompt: impl Into<String>) -> GenerateRequest {
        GenerateRequest::text(prompt, self.max_tokens, self.temperature)
    }
}

/// Sampling settings per call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct SamplingTable {
    /// Episode prose
    #[serde(default = "default_content")]
    content: Sampling,
    /// Structured detail extraction
    #[serde(default = "default_details")]
    details: Sampling,
    /// Hinglish rewrite
    #[serde(default = "default_localization")]
    localization: Sampling,
    /// TRUE/FALSE continuity check
    #[serde(default = "default_continuity")]
    continuity: Sampling,
    /// Quality critique
    #[serde(default = "default_quality")]
    quality: Sampling,
    /// Refinement rewrite
    #[serde(default = "default_refine")]
    refine: Sampling,
    /// Title regeneration
    #[serde(default = "default_title")]
    title: Sampling,
    /// Story metadata planning
    #[serde(default = "default_planning")]
    planning: Sampling,
    /// Story teaser
    #[serde(default = "default_summary")]
    summary: Sampling,
}

fn default_content() -> Sampling {
    Sampling::new(4000, 0.8)
}

fn default_details() -> Sampling {
    Sampling::new(2000, 0.3)
}

fn default_localization() -> Sampling {
    Sampling::new(4000, 0.5)
}

fn default_continuity() -> Sampling {
    Sampling::new(10, 0.1)
}

fn default_quality() -> Sampling {
    Sampling::new(100, 0.3)
}

fn default_refine() -> Sampling {
    Sampling::new(2000, 0.7)
}

fn default_title() -> Sampling {
    Sampling::new(20, 0.7)
}

fn default_planning() -> Sampling {
    Sampling::new(4000, 0.7)
}

fn default_summary() -> Sampling {
    Sampling::new(400, 0.7)
}

impl Default for SamplingTable {
    fn default() -> Self {
        Self {
            content: default_content(),
            details: default_details(),
            localization: default_localization(),
            continuity: default_continuity(),
            quality: default_quality(),
            refine: default_refine(),
            title: default_title(),
            planning: default_planning(),
            summary: default_summary(),
        }
    }
}

/// Knobs for the batch pipeline.
///
/// # Examples
///
/// ```
/// use shakescript_narrative::PipelineConfig;
///
/// let config = PipelineConfig::default().with_max_refinement_attempts(1);
/// assert_eq!(*config.max_refinement_attempts(), 1);
/// assert_eq!(*config.default_batch_size(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct PipelineConfig {
    /// Model identifier handed to the driver
    #[serde(default = "default_model")]
    model: String,
    /// Batch size when the caller does not pick one
    #[serde(default = "default_batch_size")]
    default_batch_size: u32,
    /// Validate/refine rounds in AI mode before finalizing anyway
    #[serde(default = "default_max_refinement_attempts")]
    max_refinement_attempts: u32,
    /// Finalized episodes loaded as context ahead of a batch
    #[serde(default = "default_two")]
    prior_episode_window: usize,
    /// In-batch episodes carried forward as rolling context
    #[serde(default = "default_two")]
    rolling_window: usize,
    /// Prior episodes rendered into the content prompt
    #[serde(default = "default_prompt_episode_window")]
    prompt_episode_window: usize,
    /// Relevant chunks requested from the index
    #[serde(default = "default_relevant_chunk_count")]
    relevant_chunk_count: usize,
    /// Upper bound on the key-event digest
    #[serde(default = "default_key_event_cap")]
    key_event_cap: usize,
    /// Soft length target for episode prose
    #[serde(default = "default_target_word_count")]
    target_word_count: u32,
    /// Chunk width in characters
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    /// Characters repeated between neighbouring chunks
    #[serde(default = "default_chunk_overlap")]
    chunk_overlap: usize,
    /// Width of embedding vectors
    #[serde(default = "default_embedding_dimensions")]
    embedding_dimensions: usize,
    /// Per-call sampling
    #[serde(default)]
    sampling: SamplingTable,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_batch_size() -> u32 {
    2
}

fn default_max_refinement_attempts() -> u32 {
    3
}

fn default_two() -> usize {
    2
}

fn default_prompt_episode_window() -> usize {
    3
}

fn default_relevant_chunk_count() -> usize {
    5
}

fn default_key_event_cap() -> usize {
    10
}

fn default_target_word_count() -> u32 {
    450
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_embedding_dimensions() -> usize {
    384
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            default_batch_size: default_batch_size(),
            max_refinement_attempts: default_max_refinement_attempts(),
            prior_episode_window: default_two(),
            rolling_window: default_two(),
            prompt_episode_window: default_prompt_episode_window(),
            relevant_chunk_count: default_relevant_chunk_count(),
            key_event_cap: default_key_event_cap(),
            target_word_count: default_target_word_count(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            embedding_dimensions: default_embedding_dimensions(),
            sampling: SamplingTable::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ShakescriptResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                ShakescriptError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ShakescriptError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: env > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// ```no_run
    /// use shakescript_narrative::PipelineConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = PipelineConfig::load()?;
    /// println!("batch size {}", config.default_batch_size());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> ShakescriptResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../shakescript.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/shakescript/shakescript.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("shakescript").required(false))
            .add_source(
                Environment::with_prefix("SHAKESCRIPT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .map_err(|e| {
                ShakescriptError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                ShakescriptError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> ShakescriptResult<()> {
        if self.default_batch_size == 0 {
            return Err(ConfigError::new("default_batch_size must be at least 1").into());
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::new("chunk_size must be at least 1").into());
        }
        if self.embedding_dimensions == 0 {
            return Err(ConfigError::new("embedding_dimensions must be at least 1").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_defaults_match_code_defaults() {
        let bundled: PipelineConfig = Config::builder()
            .add_source(File::from_str(
                include_str!("../../../shakescript.toml"),
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(bundled, PipelineConfig::default());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = PipelineConfig::default().with_default_batch_size(0);
        assert!(config.validate().is_err());
    }
}
