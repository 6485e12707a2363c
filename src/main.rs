mod audit;
mod error;
mod extract;
mod fetch;
mod lock;
mod runlog;
mod settings;
mod store;
mod worker;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use fetch::{Fetcher, HttpFetcher};
use lock::RunLock;
use runlog::RunLog;
use settings::Settings;
use store::ContentStore;
use worker::{Enricher, RunOutcome};

#[derive(Parser)]
#[command(
    name = "content_enricher",
    about = "Fill site content items with details scraped from their source pages"
)]
struct Cli {
    /// Content store JSON file (default: data/content.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Run log file (default: data/enrich.log)
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how many items have details and list the ones that don't
    Audit {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch and extract details for every empty item, saving after each one
    Enrich {
        /// Max scan/process passes (default: 10)
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,
    },
    /// Fetch a single URL and print the details it yields (store untouched)
    Extract {
        url: String,
        /// Title hint shown in debug logs
        #[arg(short, long, default_value = "")]
        title: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(path) = cli.store {
        settings.store_path = path;
    }
    if let Some(path) = cli.log {
        settings.log_path = path;
    }

    let result = match cli.command {
        Commands::Audit { json } => {
            let store = ContentStore::load(&settings.store_path)?;
            let report = audit::audit(&store)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
            Ok(())
        }
        Commands::Enrich { max_iterations } => {
            if let Some(n) = max_iterations {
                settings.max_iterations = n;
            }
            let lock = RunLock::acquire(&settings.store_path)?;
            tracing::debug!("Holding run lock {:?}", lock.path());
            let store = ContentStore::load(&settings.store_path)?;
            let log = RunLog::create(&settings.log_path)?;
            let fetcher = HttpFetcher::new(&settings)?;

            println!(
                "Enriching {} empty items in {:?} (log: {:?})...",
                store.empty_entries().len(),
                settings.store_path,
                settings.log_path
            );
            let mut enricher = Enricher::new(fetcher, settings, store, log).with_progress(true);
            let summary = enricher.run().await?;
            if summary.processed == 0 && summary.outcome == RunOutcome::Complete {
                println!("Nothing to enrich.");
            } else {
                summary.print();
            }
            drop(lock);
            Ok(())
        }
        Commands::Extract { url, title } => {
            let fetcher = HttpFetcher::new(&settings)?;
            let body = fetcher.fetch(&url).await?;
            let details = extract::extract_details(&body, &title);
            if details.is_empty() {
                println!("No details found.");
            }
            for (i, d) in details.iter().enumerate() {
                println!("{:>2}. {}", i + 1, truncate(d, 120));
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
