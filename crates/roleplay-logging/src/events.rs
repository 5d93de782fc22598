use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for a validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RoundStarted {
        round: usize,
        character: String,
    },
    TaskComposed {
        round: usize,
        task_type: String,
        task_name: String,
        criteria: usize,
        prompt_chars: usize,
    },
    CompletionReceived {
        round: usize,
        provider: String,
        words: usize,
        duration_secs: f64,
    },
    ProviderFailed {
        round: usize,
        provider: String,
        error: String,
    },
    ModelScored {
        round: usize,
        model: String,
        mean_reward: f64,
    },
    ScoringFailed {
        round: usize,
        model: String,
        completion: usize,
    },
    RoundCompleted {
        round: usize,
        best_provider: Option<String>,
        best_reward: f64,
        duration_secs: f64,
    },
    RunCompleted {
        rounds: usize,
        interrupted: bool,
        duration_secs: f64,
    },
    ErrorEncountered {
        round: usize,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for round events - console output plus optional JSON-lines file
pub struct Logger {
    format: LogFormat,
    console: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            console: true,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            console: true,
            file_writer: Some(Mutex::new(file)),
        })
    }

    /// Stop writing to stderr; the log file, if any, is still written.
    pub fn without_console(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON lines
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }
        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RoundStarted { round, character } => {
                let title = format!("─ Round {} · {} ", round + 1, character);
                let padding = "─".repeat(67usize.saturating_sub(title.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    title.bright_blue().bold(),
                    padding.bright_blue()
                );
            }
            LogEvent::TaskComposed {
                task_type,
                criteria,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_cyan(),
                    task_type.bright_cyan().bold(),
                    format!("({} criteria)", criteria).dimmed()
                );
            }
            LogEvent::CompletionReceived {
                provider,
                words,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} {} words ({:.1}s)",
                    "✓".bright_green(),
                    provider,
                    words,
                    duration_secs
                );
            }
            LogEvent::ProviderFailed {
                provider, error, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} {}",
                    "✗".bright_red(),
                    provider,
                    error.bright_red()
                );
            }
            LogEvent::ModelScored {
                model, mean_reward, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {:<16} {:.3}",
                    "◆".bright_magenta(),
                    model,
                    mean_reward
                );
            }
            LogEvent::ScoringFailed {
                model, completion, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} failed on completion {}",
                    "⚠".bright_yellow(),
                    model,
                    completion
                );
            }
            LogEvent::RoundCompleted {
                best_provider,
                best_reward,
                duration_secs,
                ..
            } => {
                let winner = best_provider.as_deref().unwrap_or("none");
                let _ = writeln!(
                    stderr,
                    "    {}",
                    format!(
                        "→ Best: {} reward {:.3} ({:.1}s)",
                        winner, best_reward, duration_secs
                    )
                    .bright_green()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::RunCompleted { .. } => {
                // Summary is printed by the binary
            }
            LogEvent::ErrorEncountered { round, error } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Error in round {}: {}",
                    "✗".bright_red(),
                    round + 1,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::RoundStarted { round, character } => {
                format!("[{}] round:start:{} {}", timestamp, round + 1, character)
            }
            LogEvent::TaskComposed {
                round, task_type, ..
            } => format!("[{}] task:{} {}", timestamp, round + 1, task_type),
            LogEvent::CompletionReceived {
                round,
                provider,
                words,
                duration_secs,
            } => format!(
                "[{}] completion:{} {} {}w {:.1}s",
                timestamp,
                round + 1,
                provider,
                words,
                duration_secs
            ),
            LogEvent::ProviderFailed {
                round,
                provider,
                error,
            } => format!(
                "[{}] provider:error:{} {} {}",
                timestamp,
                round + 1,
                provider,
                error
            ),
            LogEvent::ModelScored {
                round,
                model,
                mean_reward,
            } => format!(
                "[{}] score:{} {}={:.3}",
                timestamp,
                round + 1,
                model,
                mean_reward
            ),
            LogEvent::ScoringFailed { .. } => return, // Counted in the round summary
            LogEvent::RoundCompleted {
                round,
                best_provider,
                best_reward,
                ..
            } => format!(
                "[{}] round:done:{} best={} {:.3}",
                timestamp,
                round + 1,
                best_provider.as_deref().unwrap_or("-"),
                best_reward
            ),
            LogEvent::RunCompleted {
                rounds,
                interrupted,
                duration_secs,
            } => format!(
                "[{}] run:done:{}{} {:.1}s",
                timestamp,
                rounds,
                if *interrupted { " interrupted" } else { "" },
                duration_secs
            ),
            LogEvent::ErrorEncountered { round, error } => {
                format!("[{}] error:{}:{}", timestamp, round + 1, error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}
