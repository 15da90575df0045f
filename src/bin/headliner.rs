//! headliner: headlinerd CLI client
//!
//! Fetches the personalized copy for a set of campaign attributes and shows
//! it as it arrives.

use std::io::{self, Write};

use clap::Parser;
use futures_util::StreamExt;
use tracing::warn;

use headliner::client::{DEFAULT_SERVER_URL, HeadlinerClient};
use headliner::parser::ParsedMessage;
use headliner::types::AttributeRecord;

/// Headliner CLI client
#[derive(Parser)]
#[command(name = "headliner")]
#[command(version = headliner::PKG_VERSION)]
#[command(about = "Fetch personalized landing-page copy from headlinerd")]
struct Args {
    /// Server address
    #[arg(short, long, env = "HEADLINER_URL", default_value = DEFAULT_SERVER_URL)]
    url: String,

    /// Landing-page query string, e.g. "?utm_source=google&utm_medium=cpc"
    query: Option<String>,

    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    medium: Option<String>,
    #[arg(long)]
    campaign: Option<String>,
    #[arg(long)]
    term: Option<String>,
    #[arg(long)]
    content: Option<String>,

    /// Request the complete message instead of streaming it
    #[arg(long)]
    no_stream: bool,
}

impl Args {
    /// Attributes from the query string, overridden by explicit flags.
    fn record(&self) -> AttributeRecord {
        let mut record = self
            .query
            .as_deref()
            .map(AttributeRecord::from_query)
            .unwrap_or_default();
        let flags = [
            (headliner::Attribute::Source, &self.source),
            (headliner::Attribute::Medium, &self.medium),
            (headliner::Attribute::Campaign, &self.campaign),
            (headliner::Attribute::Term, &self.term),
            (headliner::Attribute::Content, &self.content),
        ];
        for (attr, value) in flags {
            if let Some(value) = value {
                record.set(attr, value.clone());
            }
        }
        record
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let record = args.record();

    if !record.has_any() {
        // nothing to personalize, same as the page's static copy
        print_message(&ParsedMessage::fallback());
        return Ok(());
    }

    println!("campaign: {}", record.describe());
    let client = HeadlinerClient::new(&args.url)?;

    if args.no_stream {
        match client.generate(&record).await {
            Ok(generated) => {
                let parsed = headliner::parser::parse_message(&generated.message);
                print_message(&parsed);
                println!("cached: {}", generated.cached);
            }
            Err(e) => {
                warn!(error = %e, "generation failed");
                print_message(&ParsedMessage::fallback());
            }
        }
        return Ok(());
    }

    let mut parses = match client.generate_stream(&record).await {
        Ok(parses) => parses,
        Err(e) => {
            warn!(error = %e, "generation failed");
            print_message(&ParsedMessage::fallback());
            return Ok(());
        }
    };

    let mut stdout = io::stdout();
    let mut last = None;
    while let Some(item) = parses.next().await {
        match item {
            Ok(parsed) => {
                write!(stdout, "\r\x1b[2K{}", parsed.headline)?;
                stdout.flush()?;
                last = Some(parsed);
            }
            Err(e) => {
                // keep whatever prefix arrived
                warn!(error = %e, "stream aborted");
                break;
            }
        }
    }
    writeln!(stdout)?;

    print_message(&last.unwrap_or_else(ParsedMessage::fallback));
    Ok(())
}

fn print_message(parsed: &ParsedMessage) {
    println!("headline: {}", parsed.headline);
    println!("description: {}", parsed.description);
}
