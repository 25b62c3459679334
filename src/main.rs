//! Agent Workforce - Command Line Entry Point
//!
//! Loads a workforce from TOML configuration and routes a single task, or
//! shows how the lexical selector would rank the configured workers.

use agent_workforce::config::WorkforceConfig;
use agent_workforce::llm::provider::LlmProvider;
use agent_workforce::llm::providers::{OpenAiConfig, OpenAiProvider};
use agent_workforce::observability::{init_logging, parse_level, parse_span_flag, LogFormat};
use agent_workforce::routing::{AgentSelector, WorkerProfile};
use agent_workforce::worker::TaskContext;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};

/// Task routing and decomposition across a workforce of LLM workers
#[derive(Parser)]
#[command(name = "workforce")]
#[command(about = "Route tasks to a workforce of LLM-backed workers")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "WORKFORCE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route and execute a task, printing the result as JSON
    Run {
        /// Task description
        #[arg(short, long)]
        task: String,

        /// Send the task straight to this worker
        #[arg(short, long)]
        worker: Option<String>,

        /// Context entry as key=value (value parsed as JSON when possible)
        #[arg(long = "context", value_name = "KEY=VALUE", value_parser = parse_context_entry)]
        context: Vec<(String, Value)>,
    },
    /// Show how workers score against a task without running any
    Rank {
        /// Task description
        #[arg(short, long)]
        task: String,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_cli_logging(cli.verbose);

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run {
            task,
            worker,
            context,
        } => run_task(&config, &task, worker.as_deref(), context).await,
        Commands::Rank { task } => rank_workers(&config, &task),
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn init_cli_logging(verbose: u8) {
    let level = match verbose {
        0 => parse_level(&env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string())),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let format = LogFormat::parse(&env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()));
    let include_spans = parse_span_flag(&env::var("LOG_SPANS").unwrap_or_default());

    init_logging(level, format, include_spans);
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<WorkforceConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(WorkforceConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = ["workforce.toml", "config/workforce.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(WorkforceConfig::load_from_file(&path)?);
                }
            }

            Err(
                "No configuration file found. Provide one with -c/--config or create workforce.toml"
                    .into(),
            )
        }
    }
}

/// Provider factory for creating LLM providers from configuration
struct LlmProviderFactory;

impl LlmProviderFactory {
    fn create_provider(
        config: &WorkforceConfig,
    ) -> Result<Arc<dyn LlmProvider>, Box<dyn std::error::Error>> {
        match config.llm.provider.as_str() {
            "openai" => {
                let openai_config = OpenAiConfig {
                    api_key: config.get_llm_api_key()?,
                    base_url: config.llm.base_url.clone(),
                    timeout: Duration::from_secs(config.llm.timeout_secs),
                };
                Ok(Arc::new(OpenAiProvider::new(openai_config)?))
            }
            provider => Err(format!("Unsupported LLM provider: {provider}").into()),
        }
    }
}

async fn run_task(
    config: &WorkforceConfig,
    task: &str,
    worker: Option<&str>,
    context: Vec<(String, Value)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = LlmProviderFactory::create_provider(config)?;
    let workforce = config.build_workforce(provider)?;

    info!(
        workers = ?workforce.worker_names(),
        planner = workforce.planner().map(|p| p.name()).unwrap_or("none"),
        "Workforce ready"
    );

    let context: TaskContext = context.into_iter().collect();
    let context = (!context.is_empty()).then_some(&context);

    let result = workforce.execute(task, context, worker).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn rank_workers(config: &WorkforceConfig, task: &str) -> Result<(), Box<dyn std::error::Error>> {
    let profiles = config
        .workers
        .iter()
        .map(|w| WorkerProfile::build(&w.name, &w.description, &w.directive, &config.selector))
        .collect();
    let selector = AgentSelector::with_profiles(profiles, config.selector.clone());

    let mut scores = selector.score(task);
    scores.sort_by(|a, b| b.total.total_cmp(&a.total));

    println!("{}", serde_json::to_string_pretty(&scores)?);
    Ok(())
}

fn handle_config_command(
    config: &WorkforceConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        workers = config.workers.len(),
        planner = config.planner.as_ref().map(|p| p.name.as_str()).unwrap_or("none"),
        "Configuration is valid"
    );

    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    Ok(())
}

/// Parse `key=value`; the value is JSON when it parses, a string otherwise
fn parse_context_entry(entry: &str) -> Result<(String, Value), String> {
    let (key, value) = entry
        .split_once('=')
        .ok_or_else(|| format!("invalid context entry '{entry}', expected KEY=VALUE"))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid context entry '{entry}', key is empty"));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
