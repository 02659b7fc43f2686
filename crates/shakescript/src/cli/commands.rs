//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use shakescript::{Feedback, RefinementMode, StoryId};

/// Shakescript - Multi-episode story generation with batch review
#[derive(Parser, Debug)]
#[command(name = "shakescript")]
#[command(about = "Multi-episode story generation with batch validation and refinement", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Export spans through OpenTelemetry (honors RUST_LOG)
    #[arg(long, global = true)]
    pub telemetry: bool,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan a new story from a prompt
    Create {
        /// Story idea
        prompt: String,

        /// Number of episodes to write
        #[arg(short, long, default_value = "10")]
        episodes: u32,

        /// Localize episodes into Hinglish
        #[arg(long)]
        hinglish: bool,
    },

    /// List stories, newest first
    List,

    /// Show a story and its finalized episodes
    Show {
        /// Story ID
        id: StoryId,
    },

    /// Generate the next batch of episodes
    Generate {
        /// Story ID
        id: StoryId,

        /// Episodes per batch (defaults to the configured batch size)
        #[arg(short, long)]
        batch_size: Option<u32>,

        /// Who reviews the drafted batch
        #[arg(short, long, default_value = "ai")]
        mode: ReviewMode,

        /// Localize this batch into Hinglish
        #[arg(long)]
        hinglish: bool,
    },

    /// Finalize the pending draft batch
    Validate {
        /// Story ID
        id: StoryId,
    },

    /// Rewrite episodes of the pending draft batch
    Refine {
        /// Story ID
        id: StoryId,

        /// Feedback as EPISODE:TEXT (repeatable)
        #[arg(short, long = "feedback", value_parser = parse_feedback, required = true)]
        feedback: Vec<Feedback>,
    },

    /// Write a teaser summary for the story so far
    Summary {
        /// Story ID
        id: StoryId,
    },

    /// Delete a story with its episodes and indexed chunks
    Delete {
        /// Story ID
        id: StoryId,
    },
}

/// Review mode accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReviewMode {
    /// Validate and refine automatically
    Ai,
    /// Stop after drafting for manual review
    Human,
}

impl From<ReviewMode> for RefinementMode {
    fn from(mode: ReviewMode) -> Self {
        match mode {
            ReviewMode::Ai => RefinementMode::Ai,
            ReviewMode::Human => RefinementMode::Human,
        }
    }
}

/// Parse `EPISODE:TEXT` into episode feedback.
pub fn parse_feedback(raw: &str) -> Result<Feedback, String> {
    let (episode, text) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected EPISODE:TEXT, got '{}'", raw))?;

    let episode_number: u32 = episode
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not an episode number", episode.trim()))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(format!("feedback for episode {} is empty", episode_number));
    }

    Ok(Feedback::new(episode_number, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feedback() {
        let feedback = parse_feedback("3: Slow the reunion down").unwrap();
        assert_eq!(feedback, Feedback::new(3, "Slow the reunion down"));
    }

    #[test]
    fn test_parse_feedback_keeps_later_colons() {
        let feedback = parse_feedback("2:Open at dawn: fog, gulls").unwrap();
        assert_eq!(feedback.episode_number, 2);
        assert_eq!(feedback.feedback, "Open at dawn: fog, gulls");
    }

    #[test]
    fn test_parse_feedback_rejects_malformed() {
        assert!(parse_feedback("no separator").is_err());
        assert!(parse_feedback("two:text").is_err());
        assert!(parse_feedback("4:   ").is_err());
    }

    #[test]
    fn test_cli_collects_repeated_feedback() {
        let cli = Cli::parse_from([
            "shakescript",
            "refine",
            "7",
            "--feedback",
            "1:More rain",
            "-f",
            "2:Less rain",
        ]);
        match cli.command {
            Commands::Refine { id, feedback } => {
                assert_eq!(id, 7);
                assert_eq!(feedback.len(), 2);
                assert_eq!(feedback[1].episode_number, 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_generate_defaults_to_ai_review() {
        let cli = Cli::parse_from(["shakescript", "generate", "4", "--json"]);
        assert!(cli.json);
        match cli.command {
            Commands::Generate {
                batch_size, mode, ..
            } => {
                assert_eq!(batch_size, None);
                assert_eq!(RefinementMode::from(mode), RefinementMode::Ai);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
