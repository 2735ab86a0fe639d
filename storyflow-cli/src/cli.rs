//! Command-line definitions.

use clap::{ArgAction, ArgGroup, Parser};
use std::path::PathBuf;

use storyflow::config::SpeechProvider;
use storyflow::core::{StageKind, StageSelection};

/// Turn story scripts into narrated videos.
///
/// Each stage skips stories whose output already exists, so any command can be
/// re-run safely after a failure.
#[derive(Parser, Debug)]
#[command(name = "storyflow", version)]
#[command(group(
    ArgGroup::new("mode")
        .args(["list", "status", "step1", "step2", "step3", "thumbnails", "all", "story"])
        .multiple(false)
))]
pub struct Cli {
    /// List available stories
    #[arg(long)]
    pub list: bool,

    /// Show which artifacts exist for every story
    #[arg(long)]
    pub status: bool,

    /// Generate narrations (all stories, or one)
    #[arg(long, value_name = "STORY", num_args = 0..=1)]
    pub step1: Option<Option<String>>,

    /// Mix narrations with background music
    #[arg(long, value_name = "STORY", num_args = 0..=1)]
    pub step2: Option<Option<String>>,

    /// Render videos
    #[arg(long, value_name = "STORY", num_args = 0..=1)]
    pub step3: Option<Option<String>>,

    /// Generate thumbnails
    #[arg(long, value_name = "STORY", num_args = 0..=1)]
    pub thumbnails: Option<Option<String>>,

    /// Run the full pipeline for every story
    #[arg(long)]
    pub all: bool,

    /// Run the full pipeline for one story
    pub story: Option<String>,

    /// Project root containing stories/ and the artifact directories
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file (defaults to <root>/storyflow.json when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Speech voice name or id
    #[arg(long)]
    pub voice: Option<String>,

    /// Speech provider: openai or elevenlabs
    #[arg(long, value_name = "PROVIDER", value_parser = parse_provider)]
    pub provider: Option<SpeechProvider>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

fn parse_provider(value: &str) -> Result<SpeechProvider, String> {
    value.parse().map_err(|e: storyflow::errors::StoryflowError| e.to_string())
}

/// What the invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Print usage and the story list.
    Usage,
    /// Print the story list.
    List,
    /// Print the artifact table.
    Status,
    /// Run stages over one story or all of them.
    Run {
        /// Stages to run.
        selection: StageSelection,
        /// A single story, or every discovered story when absent.
        story: Option<String>,
    },
}

impl Cli {
    /// Resolves the mutually exclusive mode flags.
    #[must_use]
    pub fn mode(&self) -> Mode {
        let steps = [
            (&self.step1, StageKind::Narration),
            (&self.step2, StageKind::Mix),
            (&self.step3, StageKind::Video),
            (&self.thumbnails, StageKind::Thumbnail),
        ];
        if self.list {
            return Mode::List;
        }
        if self.status {
            return Mode::Status;
        }
        for (flag, kind) in steps {
            if let Some(story) = flag {
                return Mode::Run {
                    selection: StageSelection::Only(kind),
                    story: story.clone(),
                };
            }
        }
        if self.all {
            return Mode::Run {
                selection: StageSelection::All,
                story: None,
            };
        }
        match &self.story {
            Some(story) => Mode::Run {
                selection: StageSelection::All,
                story: Some(story.clone()),
            },
            None => Mode::Usage,
        }
    }

    /// Default log filter for the verbosity level.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mode(args: &[&str]) -> Mode {
        Cli::try_parse_from(std::iter::once("storyflow").chain(args.iter().copied()))
            .unwrap()
            .mode()
    }

    #[test]
    fn test_modes() {
        assert_eq!(mode(&[]), Mode::Usage);
        assert_eq!(mode(&["--list"]), Mode::List);
        assert_eq!(mode(&["--status"]), Mode::Status);
        assert_eq!(
            mode(&["--step1"]),
            Mode::Run { selection: StageSelection::Only(StageKind::Narration), story: None }
        );
        assert_eq!(
            mode(&["--step2", "fox"]),
            Mode::Run { selection: StageSelection::Only(StageKind::Mix), story: Some("fox".into()) }
        );
        assert_eq!(
            mode(&["--thumbnails", "fox"]),
            Mode::Run { selection: StageSelection::Only(StageKind::Thumbnail), story: Some("fox".into()) }
        );
        assert_eq!(
            mode(&["--step3"]),
            Mode::Run { selection: StageSelection::Only(StageKind::Video), story: None }
        );
        assert_eq!(mode(&["--all"]), Mode::Run { selection: StageSelection::All, story: None });
        assert_eq!(
            mode(&["fox"]),
            Mode::Run { selection: StageSelection::All, story: Some("fox".into()) }
        );
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["storyflow", "--list", "--status"]).is_err());
        assert!(Cli::try_parse_from(["storyflow", "--step1", "--step2"]).is_err());
        assert!(Cli::try_parse_from(["storyflow", "--all", "fox"]).is_err());
    }

    #[test]
    fn test_options() {
        let cli = Cli::try_parse_from([
            "storyflow", "--root", "/tmp/project", "--voice", "nova", "--provider", "elevenlabs", "-vv", "--log-json",
            "--all",
        ])
        .unwrap();
        assert_eq!(cli.root, PathBuf::from("/tmp/project"));
        assert_eq!(cli.voice.as_deref(), Some("nova"));
        assert_eq!(cli.provider, Some(SpeechProvider::ElevenLabs));
        assert_eq!(cli.log_filter(), "trace");
        assert!(cli.log_json);
    }

    #[test]
    fn test_unknown_provider_is_rejected_at_parse_time() {
        let err = Cli::try_parse_from(["storyflow", "--provider", "gemini", "--all"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("unknown speech provider 'gemini'"));

        let cli = Cli::try_parse_from(["storyflow", "--provider", "OpenAI", "--all"]).unwrap();
        assert_eq!(cli.provider, Some(SpeechProvider::OpenAi));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
