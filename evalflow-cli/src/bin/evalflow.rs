use clap::{Parser, Subcommand};
use evalflow_cli::{
    error::{CliError, CliResult},
    input::{load_config, load_pairs, parse_fact_value},
};
use evalflow_core::{
    config::EvaluationConfig,
    dataset::ReferenceDatasetManager,
    pipeline::{EvaluationOptions, EvaluationPipeline, EvaluationRequest},
    quality::QualityDimension,
};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON evaluation config; defaults are used when omitted
    #[arg(short, long, env = "EVALFLOW_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one query/response pair and print the result as JSON
    Evaluate(EvaluateArgs),

    /// Evaluate every pair of a JSON file and save the results
    Batch(BatchArgs),

    /// Manage reference datasets
    Dataset {
        #[command(subcommand)]
        command: DatasetCommands,
    },
}

#[derive(Parser)]
struct EvaluateArgs {
    #[arg(short, long)]
    query: String,

    #[arg(short, long)]
    response: String,

    /// Reference dataset to score against
    #[arg(short, long)]
    dataset: Option<String>,

    /// Only use dataset items carrying one of these tags
    #[arg(short, long = "tag")]
    tags: Vec<String>,

    /// Dimensions to score; the configured defaults when omitted
    #[arg(long = "dimension")]
    dimensions: Vec<QualityDimension>,

    /// Also save the result under the output directory
    #[arg(long)]
    save: bool,
}

#[derive(Parser)]
struct BatchArgs {
    /// JSON array of {"query", "response"} objects
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short, long)]
    dataset: Option<String>,

    #[arg(short, long = "tag")]
    tags: Vec<String>,

    /// Pairs evaluated together; the configured batch_concurrency when omitted
    #[arg(long)]
    concurrency: Option<usize>,

    /// File name for the saved results
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Subcommand)]
enum DatasetCommands {
    /// List dataset names
    List,

    /// Create an empty dataset
    Create {
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Print a dataset as JSON
    Show { name: String },

    /// Delete a dataset and its file
    Remove { name: String },

    /// Add a fact; VALUE is parsed as JSON when possible
    AddFact {
        name: String,
        key: String,
        value: String,

        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Add a phrase a complete answer must contain
    AddElement {
        name: String,
        text: String,

        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Add a phrase a safe answer must not contain
    AddPattern {
        name: String,
        text: String,

        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Add an exemplar query/response pair
    AddExample {
        name: String,
        query: String,
        response: String,

        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
}

fn output_json<T: serde::Serialize>(data: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn options_for(dataset: &Option<String>, tags: &[String]) -> EvaluationOptions {
    let mut options = EvaluationOptions::new();
    if let Some(dataset) = dataset {
        options = options.with_dataset(dataset.clone());
    }
    if !tags.is_empty() {
        options = options.with_tags(tags.iter().cloned());
    }
    options
}

async fn handle_evaluate(args: &EvaluateArgs, config: EvaluationConfig) -> CliResult<()> {
    let pipeline = EvaluationPipeline::from_config(config).await?;
    let mut options = options_for(&args.dataset, &args.tags);
    if !args.dimensions.is_empty() {
        options = options.with_dimensions(args.dimensions.clone());
    }

    let result = pipeline
        .evaluate(EvaluationRequest::new(&args.query, &args.response).with_options(options))
        .await?;
    output_json(&result)?;

    if args.save {
        let path = pipeline.save_results(None).await?;
        info!("Saved result to {}", path.display());
    }
    Ok(())
}

async fn handle_batch(args: &BatchArgs, config: EvaluationConfig) -> CliResult<()> {
    let concurrency = args.concurrency.unwrap_or(config.batch_concurrency);
    let pairs = load_pairs(&args.input)?;
    debug!("Loaded {} pairs from {}", pairs.len(), args.input.display());

    let (queries, responses): (Vec<String>, Vec<String>) =
        pairs.into_iter().map(|p| (p.query, p.response)).unzip();

    let pipeline = EvaluationPipeline::from_config(config).await?;
    let options = options_for(&args.dataset, &args.tags);
    let results = pipeline
        .evaluate_batch(&queries, &responses, &options, concurrency)
        .await?;

    let path = pipeline.save_results(args.output.as_deref()).await?;
    info!("Evaluated {} pairs", results.len());
    println!("{}", path.display());
    Ok(())
}

fn require_added(name: &str, id: Option<String>) -> CliResult<()> {
    match id {
        Some(id) => {
            println!("{}", id);
            Ok(())
        }
        None => Err(CliError::DatasetNotFound(name.to_string())),
    }
}

async fn handle_dataset_commands(cmd: &DatasetCommands, config: EvaluationConfig) -> CliResult<()> {
    let manager = ReferenceDatasetManager::from_dir(config.datasets_dir.clone()).await;

    match cmd {
        DatasetCommands::List => {
            for name in manager.list_datasets() {
                println!("{}", name);
            }
        }
        DatasetCommands::Create { name, description } => {
            let dataset = manager.create_dataset(name, description).await?;
            info!("Created dataset {}", dataset.name);
        }
        DatasetCommands::Show { name } => {
            let dataset = manager
                .get_dataset(name)
                .ok_or_else(|| CliError::DatasetNotFound(name.clone()))?;
            output_json(&dataset)?;
        }
        DatasetCommands::Remove { name } => {
            if !manager.remove_dataset(name).await? {
                return Err(CliError::DatasetNotFound(name.clone()));
            }
        }
        DatasetCommands::AddFact {
            name,
            key,
            value,
            tags,
        } => {
            let id = manager
                .add_fact(name, key, parse_fact_value(value), tags)
                .await?;
            require_added(name, id)?;
        }
        DatasetCommands::AddElement { name, text, tags } => {
            let id = manager.add_required_element(name, text, tags).await?;
            require_added(name, id)?;
        }
        DatasetCommands::AddPattern { name, text, tags } => {
            let id = manager.add_unsafe_pattern(name, text, tags).await?;
            require_added(name, id)?;
        }
        DatasetCommands::AddExample {
            name,
            query,
            response,
            tags,
        } => {
            let id = manager
                .add_query_response(name, query, response, tags)
                .await?;
            require_added(name, id)?;
        }
    }

    Ok(())
}

async fn run(cli: &Cli) -> CliResult<()> {
    let config = load_config(cli.config.as_deref())?;
    match &cli.command {
        Commands::Evaluate(args) => handle_evaluate(args, config).await,
        Commands::Batch(args) => handle_batch(args, config).await,
        Commands::Dataset { command } => handle_dataset_commands(command, config).await,
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
