use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use draftsmith::cli::commands::draft::DraftOptions;

/// Parse a `key=value` template parameter
fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid parameter '{s}', expected key=value")),
    }
}

#[derive(Parser)]
#[command(name = "draftsmith")]
#[command(version, about = "LLM-backed drafting engine for report authoring")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Draft a report section from a template
    Draft {
        #[arg(help = "Template id, e.g. introduction-academic")]
        template: String,
        #[arg(long = "param", short = 'p', value_parser = parse_param, help = "Template parameter as key=value (repeatable)")]
        params: Vec<(String, String)>,
        #[arg(long, help = "Model override")]
        model: Option<String>,
        #[arg(long, overrides_with = "no_stream", help = "Stream fragments as they arrive")]
        stream: bool,
        #[arg(long = "no-stream", help = "Wait for the complete response")]
        no_stream: bool,
    },

    /// Draft from a raw prompt, skipping template resolution
    Prompt {
        #[arg(help = "Prompt text")]
        text: String,
        #[arg(long, help = "Model override")]
        model: Option<String>,
        #[arg(long, overrides_with = "no_stream", help = "Stream fragments as they arrive")]
        stream: bool,
        #[arg(long = "no-stream", help = "Wait for the complete response")]
        no_stream: bool,
    },

    /// List available report section templates
    Templates,

    /// Check that the completion provider is reachable
    Health,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Output as JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn stream_override(stream: bool, no_stream: bool) -> Option<bool> {
    if stream {
        Some(true)
    } else if no_stream {
        Some(false)
    } else {
        None
    }
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Draft {
            template,
            params,
            model,
            stream,
            no_stream,
        } => {
            let options = DraftOptions {
                model,
                stream: stream_override(stream, no_stream),
            };
            let rt = Runtime::new()?;
            rt.block_on(draftsmith::cli::commands::draft::run_template(
                &template, params, options,
            ))?;
        }
        Commands::Prompt {
            text,
            model,
            stream,
            no_stream,
        } => {
            let options = DraftOptions {
                model,
                stream: stream_override(stream, no_stream),
            };
            let rt = Runtime::new()?;
            rt.block_on(draftsmith::cli::commands::draft::run_prompt(&text, options))?;
        }
        Commands::Templates => {
            draftsmith::cli::commands::templates::run()?;
        }
        Commands::Health => {
            let rt = Runtime::new()?;
            rt.block_on(draftsmith::cli::commands::health::run())?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => {
                draftsmith::cli::commands::config::show(json)?;
            }
            ConfigAction::Path => {
                draftsmith::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    draftsmith::cli::commands::config::init_global(force)?;
                } else {
                    draftsmith::cli::commands::config::init_project()?;
                }
            }
        },
    }

    Ok(())
}
