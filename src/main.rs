//! Crewline CLI - sequential crew pipeline runner

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crewline::config::CrewConfig;
use crewline::error::{CrewError, FixSuggestion};
use crewline::template::parse_param;
use crewline::{
    create_provider, CapabilityRegistry, Crew, CrewFile, ExecutionPlan, Parameters, RunOptions,
    Runner,
};

#[derive(Parser)]
#[command(name = "crewline")]
#[command(about = "Crewline - sequential crew pipeline runner for AI agents")]
#[command(version)]
struct Cli {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a crew file
    Run {
        /// Path to .crew.yaml file
        file: String,

        /// Input parameter (repeatable): -i query="Melhores jogos de 2020"
        #[arg(short = 'i', long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,

        /// Override provider (mock, openai, ollama)
        #[arg(short, long)]
        provider: Option<String>,

        /// Override model
        #[arg(short, long)]
        model: Option<String>,

        /// Per-task timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Print the run's event log as JSON
        #[arg(long)]
        events: bool,
    },

    /// Validate a crew file (structure, ordering, parameters)
    Validate {
        /// Path to .crew.yaml file
        file: String,

        /// Input parameter (repeatable)
        #[arg(short = 'i', long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,
    },

    /// List registered capabilities
    Capabilities,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            file,
            inputs,
            provider,
            model,
            timeout,
            events,
        } => run_crew(&file, &inputs, provider, model, timeout, events).await,
        Commands::Validate { file, inputs } => validate_crew(&file, &inputs).await,
        Commands::Capabilities => {
            list_capabilities();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn parse_inputs(raw: &[String]) -> Result<Parameters, CrewError> {
    raw.iter().map(|r| parse_param(r)).collect()
}

async fn load_crew(file: &str) -> Result<Crew, CrewError> {
    let crew_file = CrewFile::load(file).await?;
    Crew::from_file(crew_file, &CapabilityRegistry::with_builtins())
}

async fn run_crew(
    file: &str,
    raw_inputs: &[String],
    provider_override: Option<String>,
    model_override: Option<String>,
    timeout: Option<u64>,
    print_events: bool,
) -> Result<(), CrewError> {
    let params = parse_inputs(raw_inputs)?;
    let crew = load_crew(file).await?;

    let mut config = CrewConfig::load()?.with_env();
    if let Some(m) = model_override {
        config.provider.model = Some(m);
    }
    let provider_name = provider_override.unwrap_or_else(|| config.provider_name().to_string());
    let provider = create_provider(&provider_name, &config)?;

    println!(
        "{} Using provider: {} | model: {}",
        "→".cyan(),
        provider.name().cyan().bold(),
        config.model().unwrap_or("(default)").cyan()
    );

    // Ctrl-C stops before the next task
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "\n{} Cancelling after the current task...",
                "!".yellow().bold()
            );
            on_signal.cancel();
        }
    });

    let mut options = RunOptions::default()
        .with_cancel(cancel)
        .with_progress(true);
    if let Some(t) = timeout.map(Duration::from_secs).or_else(|| config.task_timeout()) {
        options = options.with_timeout(t);
    }

    let runner = Runner::new(Arc::new(crew), provider).with_options(options);
    let result = runner.run(&params).await;

    if print_events {
        println!("{}", "Events:".cyan().bold());
        println!("{:#}", runner.event_log().to_json());
    }

    let output = result?;
    println!();
    println!("{}", "Output:".cyan().bold());
    println!("{}", output.final_output());
    println!(
        "{}",
        format!(
            "{} tasks | {} tokens | {:.1}s",
            output.tasks.len(),
            output.usage.total_tokens,
            output.duration.as_secs_f32()
        )
        .dimmed()
    );

    Ok(())
}

async fn validate_crew(file: &str, raw_inputs: &[String]) -> Result<(), CrewError> {
    let params = parse_inputs(raw_inputs)?;
    let crew = load_crew(file).await?;
    let plan = ExecutionPlan::build(&crew)?;
    crew.resolve(&crew.merged_inputs(&params))?;

    println!("{} Crew '{}' is valid", "✓".green(), file);
    if let Some(name) = crew.name() {
        println!("  Name: {}", name);
    }
    println!("  Process: {}", crew.process());
    println!("  Agents: {}", crew.agents().len());
    println!("  Tasks: {}", plan.order().collect::<Vec<_>>().join(" → "));

    let required = crew.required_parameters();
    if !required.is_empty() {
        println!(
            "  Parameters: {}",
            required.into_iter().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}

fn list_capabilities() {
    let registry = CapabilityRegistry::with_builtins();
    println!("{} {} capabilities:\n", "→".cyan(), registry.len());
    for capability in registry.iter() {
        println!(
            "  {:<14} {}",
            capability.name().bold(),
            capability.description().dimmed()
        );
    }
}
