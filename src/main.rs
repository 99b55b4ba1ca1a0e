mod api;
mod config;
mod db;
mod error;
mod ingest;
mod models;
mod pipeline;
mod queries;

use api::YouTubeClient;
use config::Config;
use db::{Repository, TabularResult};
use error::{AppError, Result};
use ingest::CancelFlag;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reports go to stdout, diagnostics to stderr)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;
    let repository = Repository::new(&config.db_path).await?;

    if args.len() >= 2 && args[1] == "--list-queries" {
        for canned in queries::CATALOG {
            println!("{:28} {}", canned.name, canned.question);
        }
        return Ok(());
    }

    if args.len() >= 3 && args[1] == "--query" {
        let Some(canned) = queries::find(&args[2]) else {
            return Err(anyhow::anyhow!(
                "unknown query {:?}; see --list-queries for the catalog",
                args[2]
            )
            .into());
        };
        let result = repository.query(canned.sql).await?;
        print_table(&result);
        return Ok(());
    }

    if args.len() < 2 || args[1].starts_with('-') {
        eprintln!("Usage: yt-harvest <CHANNEL_ID>");
        eprintln!("       yt-harvest --query <NAME>");
        eprintln!("       yt-harvest --list-queries");
        return Ok(());
    }
    let channel_id = args[1].clone();

    let api_key = config.resolved_api_key().ok_or_else(|| {
        AppError::Config(
            "no API key: set api_key in config.toml or the YOUTUBE_API_KEY environment variable"
                .to_string(),
        )
    })?;
    let client = YouTubeClient::new(api_key);
    let opts = config.ingest_options();

    // Ctrl-C stops new fetches; in-flight work finishes and the partial
    // report is still printed.
    let cancel = CancelFlag::default();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing in-flight work");
                cancel.cancel();
            }
        });
    }

    let report = pipeline::run_ingestion(&client, &repository, &channel_id, &opts, cancel).await;
    print!("{report}");

    Ok(())
}

fn print_table(result: &TabularResult) {
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.len()).collect();
    for row in &result.rows {
        for (idx, cell) in row.iter().enumerate() {
            if cell.len() > widths[idx] {
                widths[idx] = cell.len();
            }
        }
    }

    let header: Vec<String> = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, width)| format!("{name:<width$}"))
        .collect();
    println!("{}", header.join("  "));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));

    if result.rows.is_empty() {
        println!("(no rows)");
        return;
    }
    for row in &result.rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        println!("{}", line.join("  "));
    }
}
