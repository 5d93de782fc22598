mod config;
mod models;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::warn;

use roleplay_agent::{CommandProvider, CompletionProvider, OpenRouterProvider, ProviderConfig};
use roleplay_characters::{CharacterSource, JsonlDataset, SHUFFLE_BUFFER_SIZE};
use roleplay_core::{RoundRunner, RunContext, RunOutcome, DEFAULT_HISTORY_LIMIT};
use roleplay_logging::{init_tracing, LogFormat, Logger};

use crate::config::{ProjectConfig, CONFIG_FILE_NAME};

#[derive(Parser, Debug)]
#[command(
    name = "roleplay",
    about = "Compose roleplay tasks, collect completions and score them",
    version,
    author
)]
struct Cli {
    /// JSON-lines file of character records (default: a built-in stub character)
    #[arg(short, long)]
    characters: Option<PathBuf>,

    /// Configuration file
    #[arg(long, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Number of rounds (default: until interrupted)
    #[arg(short = 'n', long)]
    rounds: Option<usize>,

    /// Rounds kept in memory for the final summary
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,

    /// Command line of a local completion provider; may be repeated
    #[arg(long = "miner-command")]
    miner_commands: Vec<String>,

    /// Also query OpenRouter (requires an API key)
    #[arg(long)]
    openrouter: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Tracing filter level
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Append round events as JSON lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: compose one task and print it without querying providers
    #[arg(long)]
    dry_run: bool,

    /// Seed for character shuffling and task sampling
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);

    let project_config = ProjectConfig::load(&cli.config)?.unwrap_or_default();
    let framework = models::build_framework(&project_config)?;

    let source = open_source(&cli)?;

    let logger = match cli.log_file {
        Some(ref path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let mut runner = RoundRunner::new(source, framework, Arc::new(logger));
    if let Some(seed) = cli.seed {
        runner = runner.with_seed(seed);
    }

    if cli.dry_run {
        let task = runner.compose_task()?;
        println!("=== Dry Run ===");
        println!("Character: {}", task.character().display_name());
        println!("Task: {} ({})", task.task_type(), task.task_name());
        println!("Stop: {}", task.stop_sequences().join(", "));
        println!("Reward weights:");
        for (model, weight) in runner.framework().config().enabled() {
            println!("  {}: {}", model, weight);
        }
        println!();
        println!("{}", task.compose_prompt());
        return Ok(());
    }

    if !models::has_active_models(runner.framework()) {
        anyhow::bail!(
            "No weighted reward model is available. Weight task_validator_filter or \
             blacklist_filter, or configure [reward.scorers.<name>] in {}",
            cli.config.display()
        );
    }

    let providers = create_providers(&cli, &project_config)?;
    for provider in &providers {
        if !provider.is_available().await {
            warn!(provider = provider.name(), "Provider may not be available");
        }
    }
    for provider in providers {
        runner = runner.with_provider(provider);
    }

    let mut provider_config = ProviderConfig::default();
    if let Some(timeout) = project_config.provider_timeout() {
        provider_config = provider_config.with_timeout(timeout);
    }
    runner = runner.with_provider_config(provider_config);

    let mut context = RunContext::new().with_history_limit(cli.history_limit);
    if let Some(rounds) = cli.rounds {
        context = context.with_max_rounds(rounds);
    }

    // Handle Ctrl+C gracefully
    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing current round...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let outcome = runner.run(context).await;

    if cli.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        print_outcome(&outcome);
    }

    std::process::exit(outcome.exit_code());
}

fn open_source(cli: &Cli) -> Result<CharacterSource> {
    let Some(ref path) = cli.characters else {
        warn!("No --characters file given, using the stub character");
        return Ok(CharacterSource::stub());
    };

    let dataset = JsonlDataset::new(path.clone(), SHUFFLE_BUFFER_SIZE);
    let source = match cli.seed {
        Some(seed) => CharacterSource::with_rng(dataset, StdRng::seed_from_u64(seed)),
        None => CharacterSource::new(dataset),
    };
    source.with_context(|| format!("Failed to open characters from {}", path.display()))
}

fn create_providers(
    cli: &Cli,
    project_config: &ProjectConfig,
) -> Result<Vec<Arc<dyn CompletionProvider>>> {
    let mut providers: Vec<Arc<dyn CompletionProvider>> = Vec::new();

    for command in &cli.miner_commands {
        let provider = CommandProvider::from_command_line(command)
            .with_context(|| format!("Invalid --miner-command '{}'", command))?;
        providers.push(Arc::new(provider));
    }

    if cli.openrouter {
        let provider = OpenRouterProvider::new(
            project_config.openrouter.api_key.clone(),
            project_config.openrouter.model.clone(),
        )?;
        providers.push(Arc::new(provider));
    }

    if providers.is_empty() {
        anyhow::bail!("No completion providers. Use --miner-command and/or --openrouter");
    }
    Ok(providers)
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed {
            rounds,
            history,
            total_duration_secs,
        } => {
            eprintln!();
            eprintln!("=== COMPLETED ===");
            eprintln!("Rounds: {}", rounds);
            print_winners(history);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        RunOutcome::UserInterrupted {
            rounds,
            history,
            total_duration_secs,
        } => {
            eprintln!();
            eprintln!("=== INTERRUPTED ===");
            eprintln!("User stopped after {} round(s)", rounds);
            print_winners(history);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        RunOutcome::Failed {
            rounds,
            error,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("=== FAILED ===");
            eprintln!("Error after {} round(s): {}", rounds, error);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }
}

fn print_winners(history: &[roleplay_core::RoundRecord]) {
    for record in history {
        if let Some(best) = record.best() {
            eprintln!(
                "  Round {}: {} ({}) -> {} {:.3}",
                record.round + 1,
                record.character,
                record.task_type,
                best.provider,
                best.reward.reward
            );
        }
    }
}
