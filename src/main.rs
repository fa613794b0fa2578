use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use brand_pulse::models::{MonthBucket, SentimentReview};
use brand_pulse::pipeline::KindOutcome;
use brand_pulse::table::SENTIMENT_ARTIFACT;
use brand_pulse::{Config, EntityKind, Pipeline, TableReader, report};

#[derive(Debug, Parser)]
#[command(name = "brand-pulse")]
#[command(about = "Harvest product, testimonial and review tables and summarise review sentiment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape the listing site into CSV tables, unless they already exist
    Scrape {
        /// Scrape even if every table is already present
        #[arg(long)]
        force: bool,
        /// Only scrape one kind (always overwrites its table)
        #[arg(long)]
        kind: Option<EntityKind>,
    },
    /// List the months covered by the sentiment-enriched review table
    Months,
    /// Summarise one month of sentiment-enriched reviews
    Report {
        /// Month as YYYY-MM; defaults to the earliest month with reviews
        #[arg(long)]
        month: Option<MonthBucket>,
        /// Number of most frequent words to include
        #[arg(long, default_value_t = 20)]
        top: usize,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scrape { force, kind } => scrape(&config, force, kind).await,
        Commands::Months => list_months(&config),
        Commands::Report { month, top, json } => print_report(&config, month, top, json),
    }
}

async fn scrape(config: &Config, force: bool, kind: Option<EntityKind>) -> Result<()> {
    info!("Starting scrape of {}", config.base_url);

    let pipeline = Pipeline::from_config(config)?;

    if let Some(kind) = kind {
        let written = pipeline.run_kind(kind).await?;
        info!(
            "Wrote {} {} rows to {} ({})",
            written.rows,
            kind,
            written.path.display(),
            written.stop
        );
        return Ok(());
    }

    let summary = pipeline.ensure_artifacts(force).await;
    if summary.skipped {
        info!("Tables already present, pass --force to refresh");
        return Ok(());
    }

    for (kind, outcome) in &summary.outcomes {
        match outcome {
            KindOutcome::Written(written) if !written.stop.is_clean() => {
                warn!(
                    "{}: wrote {} rows, listing cut short ({})",
                    kind, written.rows, written.stop
                );
            }
            KindOutcome::Written(written) => info!("{}: wrote {} rows", kind, written.rows),
            KindOutcome::Failed(reason) => error!("{}: {}", kind, reason),
        }
    }

    if summary.has_failures() {
        bail!("one or more tables could not be written");
    }
    Ok(())
}

fn load_sentiment_reviews(config: &Config) -> Result<Vec<SentimentReview>> {
    TableReader::new(&config.output_dir)
        .read_sentiment_reviews()
        .with_context(|| {
            format!(
                "could not load {} from {}; run the sentiment enrichment step first",
                SENTIMENT_ARTIFACT,
                config.output_dir.display()
            )
        })
}

fn list_months(config: &Config) -> Result<()> {
    let reviews = load_sentiment_reviews(config)?;
    for month in report::months(&reviews) {
        println!("{month}\t{}", month.label());
    }
    Ok(())
}

fn print_report(config: &Config, month: Option<MonthBucket>, top: usize, json: bool) -> Result<()> {
    let reviews = load_sentiment_reviews(config)?;

    let Some(month) = month.or_else(|| report::months(&reviews).first().copied()) else {
        bail!("no reviews with a readable date in {SENTIMENT_ARTIFACT}");
    };

    let summary = report::summarize(&reviews, month, top);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} ({} reviews)", summary.label, summary.total);
    for (sentiment, count) in &summary.sentiment_counts {
        println!("  {sentiment:<10} {count}");
    }
    match summary.average_confidence {
        Some(avg) => println!("Average model confidence: {avg:.3}"),
        None => println!("Average model confidence: n/a"),
    }
    if summary.top_words.is_empty() {
        println!("Not enough review text for a word cloud");
    } else {
        let words: Vec<String> = summary
            .top_words
            .iter()
            .map(|(word, count)| format!("{word} ({count})"))
            .collect();
        println!("Top words: {}", words.join(", "));
    }

    Ok(())
}
