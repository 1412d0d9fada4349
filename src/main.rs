//! Reference CLI for the ragline core.
//!
//! Runs the whole pipeline against the in-process [`MemoryIndex`] and the
//! filesystem scanner; production deployments embed the library and supply
//! real boundary implementations instead.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use ragline::config::EnvOnlySecrets;
use ragline::coordinator::IngestionCoordinator;
use ragline::index::MemoryIndex;
use ragline::loader::BucketLoader;
use ragline::query::{QueryOptions, QueryService};
use ragline::scan::FsScanner;
use ragline::store::MemoryObjectStore;
use ragline::{Config, QueryReply};

#[derive(Parser)]
#[command(name = "ragline")]
#[command(about = "Retrieval-augmented assistant: ask questions, load and reset the index")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question against the indexed content
    Ask {
        /// The question to ask
        #[arg(value_name = "QUESTION", required = true)]
        question: Vec<String>,

        /// Include supporting citations in the output
        #[arg(long)]
        citations: bool,
    },

    /// Load documents from the configured source into the index
    Load,

    /// Destructively clear the index
    Reset,

    /// List the sources currently represented in the index
    DataSources,
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env(Arc::new(EnvOnlySecrets));
    let index = Arc::new(MemoryIndex::new());
    let scanner = Arc::new(FsScanner::new());
    let store = Arc::new(MemoryObjectStore::new());
    let loader =
        BucketLoader::new(store, scanner.clone()).with_endpoint(config.endpoint_url.clone());
    let coordinator = IngestionCoordinator::new(index.clone(), loader, scanner, config);

    match cli.command {
        Commands::Ask {
            question,
            citations,
        } => {
            // The in-process index is empty per invocation; load first so the
            // question has something to retrieve against. A missing assets
            // root is not fatal for asking.
            if let Err(err) = coordinator.load(None).await {
                tracing::warn!(%err, "no sources loaded before ask");
            }
            let service = QueryService::new(index);
            let options = QueryOptions::new().with_citations(citations);
            let reply = service.query(&question.join(" "), &options).await?;
            match reply {
                QueryReply::Answer(answer) => println!("{answer}"),
                QueryReply::WithCitations { answer, citations } => {
                    println!("{answer}");
                    if !citations.is_empty() {
                        println!("{}", ragline::dispatch::format_citations(&citations));
                    }
                }
            }
        }
        Commands::Load => {
            let response = coordinator.load(None).await?;
            println!(
                "Loaded doc {} ({} new units, {} already indexed)",
                response.doc_id, response.indexed_units, response.skipped_existing
            );
        }
        Commands::Reset => {
            coordinator.reset().await?;
            println!("Index cleared.");
        }
        Commands::DataSources => {
            let sources = coordinator.data_sources().await?;
            if sources.is_empty() {
                println!("No data sources indexed.");
            } else {
                for source in sources {
                    println!(
                        "{} ({} units, doc {})",
                        source.location, source.unit_count, source.doc_id
                    );
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    ragline::telemetry::init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
