//! Causeway CLI - extract causal and influence graphs from Wikidata and clean them for import.
//!
//! Usage:
//!   causeway extract causes --batch-size 10000 --checkpoint-every 5000
//!   causeway extract influences --resume-from latest
//!   causeway extract entities --category humans --max-results 50000
//!   causeway clean --data-dir data --require-qid

use causeway::{
    cleaning::{clean_directory, CleaningOptions},
    config::{EndpointConfig, ExtractionConfig, ResumePoint, DEFAULT_ENDPOINT_URL},
    core::PipelineState,
    extraction::{
        catalog::{self, EntityCategory},
        BatchFetcher, CausalityPlan, EntityPlan, ExtractionPlan, HttpSparqlTransport,
        InfluencePlan, PaginationDriver, RetryPolicy,
    },
    Error,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "causeway")]
#[command(about = "Extract causal and influence graphs from Wikidata", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Page through the SPARQL endpoint and write node/edge tables
    Extract(ExtractArgs),
    /// Drop unlabelled nodes and dangling relationships, writing *_cleaned.csv tables
    Clean(CleanArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    /// Events linked by "has cause" / "immediate cause of"
    Causes,
    /// "Influenced by" pairs
    Influences,
    /// Entities of one or all catalog categories
    Entities,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// What to extract
    #[arg(value_enum)]
    target: Target,

    /// Entity category key, or "all" (entities only)
    #[arg(long, default_value = "all")]
    category: String,

    /// Rows requested per query
    #[arg(long, default_value = "10000")]
    batch_size: u64,

    /// Counted attempts per batch before giving up
    #[arg(long, default_value = "3")]
    max_retries: u32,

    /// Write a checkpoint every N relationships (nodes for entity extraction)
    #[arg(long)]
    checkpoint_every: Option<u64>,

    /// Stop once this many records have been merged
    #[arg(long)]
    max_results: Option<u64>,

    /// Checkpoint tag to resume from, or "latest"
    #[arg(long)]
    resume_from: Option<ResumePoint>,

    /// Give up after this many consecutive rate-limit responses (default: wait forever)
    #[arg(long)]
    max_rate_limit_waits: Option<u32>,

    /// Directory for the final tables
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,

    /// Directory for periodic and emergency checkpoints
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: PathBuf,

    /// SPARQL endpoint URL
    #[arg(long, default_value = DEFAULT_ENDPOINT_URL)]
    endpoint: String,

    /// User-Agent header (defaults to $USER_AGENT)
    #[arg(long)]
    user_agent: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "300")]
    timeout_secs: u64,

    /// Number of nodes and relationships to print after the run
    #[arg(long, default_value = "5")]
    preview: usize,
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Directory holding the extracted tables
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Also drop nodes whose id is not a Q-identifier
    #[arg(long)]
    require_qid: bool,

    /// Relationship table name inside the data directory
    #[arg(long, default_value = "relationships.csv")]
    relationships: String,
}

impl ExtractArgs {
    fn endpoint(&self) -> EndpointConfig {
        let mut endpoint = EndpointConfig::from_env();
        endpoint.url = self.endpoint.clone();
        endpoint.timeout = Duration::from_secs(self.timeout_secs);
        if let Some(agent) = &self.user_agent {
            endpoint.user_agent = agent.clone();
        }
        endpoint
    }

    fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default().with_max_retries(self.max_retries);
        policy.max_rate_limit_waits = self.max_rate_limit_waits;
        policy
    }

    fn extraction_config(&self, checkpoint_dir: PathBuf) -> ExtractionConfig {
        ExtractionConfig {
            batch_size: self.batch_size,
            checkpoint_frequency: self.checkpoint_every,
            max_results: self.max_results,
            resume: self.resume_from,
            output_dir: Some(self.output_dir.clone()),
            checkpoint_dir: Some(checkpoint_dir),
        }
    }

    fn categories(&self) -> causeway::Result<Vec<&'static EntityCategory>> {
        if self.category == "all" {
            if self.resume_from.is_some() {
                return Err(Error::Config(
                    "--resume-from needs a single --category, not 'all'".to_string(),
                ));
            }
            return Ok(catalog::CATEGORIES.iter().collect());
        }
        catalog::find(&self.category).map(|c| vec![c]).ok_or_else(|| {
            Error::Config(format!(
                "Unknown category '{}'; expected one of: all, {}",
                self.category,
                catalog::keys().collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

async fn run_plan<P: ExtractionPlan>(
    plan: P,
    args: &ExtractArgs,
    checkpoint_dir: PathBuf,
) -> causeway::Result<PipelineState> {
    let transport = HttpSparqlTransport::new(args.endpoint())?;
    let fetcher = BatchFetcher::new(transport, args.retry_policy());
    let mut driver = PaginationDriver::new(fetcher, plan, args.extraction_config(checkpoint_dir))?;
    let summary = driver.run().await?;

    println!(
        "{}: {} nodes, {} relationships ({} batches, {} invalid records)",
        driver.plan().name(),
        summary.nodes,
        summary.edges,
        summary.batches,
        summary.records_invalid
    );
    for path in &summary.outputs {
        println!("  wrote {}", path.display());
    }
    Ok(driver.into_state())
}

fn print_preview(state: &PipelineState, count: usize) {
    if count == 0 {
        return;
    }
    if !state.nodes.is_empty() {
        println!("\nFirst {} nodes:", count.min(state.node_count()));
        for node in state.nodes.iter().take(count) {
            println!("  {:<12} {:<40} {}", node.id, node.label, node.type_tag);
        }
    }
    if !state.edges.is_empty() {
        println!("\nFirst {} relationships:", count.min(state.edge_count()));
        for edge in state.edges.iter().take(count) {
            println!("  {} -> {} ({})", edge.source, edge.target, edge.relation);
        }
    }
}

async fn extract(args: ExtractArgs) -> causeway::Result<()> {
    match args.target {
        Target::Causes => {
            let state = run_plan(CausalityPlan::new(), &args, args.checkpoint_dir.clone()).await?;
            print_preview(&state, args.preview);
        }
        Target::Influences => {
            let state = run_plan(InfluencePlan::new(), &args, args.checkpoint_dir.clone()).await?;
            print_preview(&state, args.preview);
        }
        Target::Entities => {
            for category in args.categories()? {
                // Tags of different categories would collide in one directory
                let checkpoint_dir = args.checkpoint_dir.join(category.key);
                let state = run_plan(EntityPlan::new(category), &args, checkpoint_dir).await?;
                print_preview(&state, args.preview);
            }
        }
    }
    Ok(())
}

fn clean(args: CleanArgs) -> causeway::Result<()> {
    let options = CleaningOptions { require_qid: args.require_qid, relationships_file: args.relationships };
    let report = clean_directory(&args.data_dir, &options)?;

    for file in &report.node_files {
        println!("{}: kept {}, removed {}", file.output.display(), file.kept, file.removed);
    }
    if let Some(rels) = &report.relationships {
        println!("{}: kept {}, removed {}", rels.output.display(), rels.kept, rels.removed);
    }
    println!(
        "Cleaning complete: {} nodes kept, {} removed",
        report.nodes_kept(),
        report.nodes_removed()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Extract(args) => extract(args).await,
        Command::Clean(args) => clean(args),
    };

    if let Err(Error::FatalFetch { checkpoint: Some(path), .. }) = &result {
        eprintln!("State saved to {}; rerun with --resume-from latest to continue", path.display());
    }
    result?;

    Ok(())
}
