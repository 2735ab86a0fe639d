//! Storyflow CLI binary.
//!
//! Exit codes: 0 when every requested stage succeeded or was skipped, 1 on a
//! fatal error (configuration, credentials, missing tools), 2 when at least
//! one story failed a stage.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use storyflow::config::{Credentials, PipelineConfig};
use storyflow::core::{validate_story_name, ArtifactStore, PipelineRun, StageSelection};
use storyflow::events::LoggingEventSink;
use storyflow::media::{Ffmpeg, MediaToolkit};
use storyflow::pipeline::PipelineBuilder;
use storyflow::report::{StatusReport, StoryListing};

mod cli;

use cli::{Cli, Mode};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = PipelineConfig::load(&cli.root, cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(voice) = &cli.voice {
        config = config.with_voice(voice.clone());
    }
    if let Some(provider) = cli.provider {
        config = config.with_provider(provider);
    }
    let store = ArtifactStore::new(&cli.root, config.layout.clone());

    match cli.mode() {
        Mode::Usage => {
            println!("{}", Cli::command().render_help());
            print!("{}", StoryListing::collect(&store).await?);
            Ok(ExitCode::SUCCESS)
        }
        Mode::List => {
            print!("{}", StoryListing::collect(&store).await?);
            Ok(ExitCode::SUCCESS)
        }
        Mode::Status => {
            print!("{}", StatusReport::collect(&store).context("Failed to read stories")?);
            Ok(ExitCode::SUCCESS)
        }
        Mode::Run { selection, story } => {
            let stories = match story {
                Some(story) => {
                    validate_story_name(&story).context("Invalid story name")?;
                    vec![story]
                }
                None => store.discover_stories().context("Failed to read stories")?,
            };
            run_pipeline(&cli, config, &store, selection, stories).await
        }
    }
}

async fn run_pipeline(
    cli: &Cli,
    config: PipelineConfig,
    store: &ArtifactStore,
    selection: StageSelection,
    stories: Vec<String>,
) -> Result<ExitCode> {
    let toolkit = Arc::new(Ffmpeg::new());
    toolkit.validate().await.context("Media toolkit check failed")?;

    let orchestrator = PipelineBuilder::new(&cli.root, config, toolkit)
        .with_remote_clients(&Credentials::from_env(), selection)
        .context("Missing credentials")?
        .with_sink(Arc::new(LoggingEventSink::default()))
        .build(selection)?;

    if selection == StageSelection::All {
        tracing::info!(stories = stories.len(), "Running full pipeline");
    }
    let run = PipelineRun::new(stories.clone(), selection);
    let summary = orchestrator.run(&run).await?;

    for line in summary.lines() {
        println!("{line}");
    }
    if selection == StageSelection::All {
        println!("\n{}", "=".repeat(50));
        println!("Pipeline complete!\n");
        print!("{}", StatusReport::for_stories(store, &stories));
    }

    if summary.has_failures() {
        eprintln!("\n{} failure(s):", summary.failures().len());
        for failure in summary.failures() {
            eprintln!("  [{}] {}: {}", failure.story, failure.stage.label(), failure.error);
        }
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
