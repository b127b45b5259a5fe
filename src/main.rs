use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use flowline::{ComponentRegistry, PipelineDescription, PipelineFactory};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Flowline: run pluggable ETL pipelines described in YAML
#[derive(Parser)]
#[command(name = "flowline", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source component credentials from, if present
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a pipeline description without running it
    Check {
        /// The pipeline description file to validate
        #[arg(default_value = "pipeline.yml")]
        file: PathBuf,
    },

    /// Build and run a pipeline from a description
    Run {
        /// The pipeline description file to run
        #[arg(default_value = "pipeline.yml")]
        file: PathBuf,
    },

    /// List the registered component types
    Types,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if Path::new(&cli.env).exists() {
        dotenvy::from_filename(&cli.env)?;
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    match cli.command {
        Commands::Check { file } => check(&file),
        Commands::Run { file } => run(&file).await,
        Commands::Types => {
            types();
            Ok(())
        }
    }
}

/// Validate a description and report every problem found
fn check(file: &Path) -> Result<()> {
    log::info!("Checking {}", file.display().bright_black());
    let description = PipelineDescription::read(file)?;
    let factory = PipelineFactory::new(ComponentRegistry::with_builtins());
    factory.validate(&description)?;
    log::info!(
        "✓ {} is a valid pipeline description ({} stage(s))",
        file.display().cyan(),
        description.stage_count()
    );
    Ok(())
}

/// Build a pipeline from a description and run it to completion
async fn run(file: &Path) -> Result<()> {
    log::info!("Running pipeline from {}", file.display().bright_black());
    let description = PipelineDescription::read(file)?;
    let factory = PipelineFactory::new(ComponentRegistry::with_builtins());
    let pipeline = factory.build(&description)?;

    let summary = pipeline.run().await?;
    log::info!("✓ Pipeline complete: {summary}");
    for (name, artifact) in &summary.artifacts {
        log::info!("  {}: {}", name.cyan(), artifact);
    }
    Ok(())
}

/// Print every registered component type, by kind
fn types() {
    let registry = ComponentRegistry::with_builtins();
    println!("{}", "Extractors:".bright_white());
    for type_id in registry.extractor_types() {
        println!("  {}", type_id.green());
    }
    println!("{}", "Transformers:".bright_white());
    for type_id in registry.transformer_types() {
        println!("  {}", type_id.green());
    }
    println!("{}", "Loaders:".bright_white());
    for type_id in registry.loader_types() {
        println!("  {}", type_id.green());
    }
}
