use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use wechat_draft_pub::{publish_file, Config, PublishOutcome, Result};

/// Publish a Markdown article to a WeChat Official Account as a draft.
#[derive(Parser)]
#[command(name = "wechat-draft-pub", version, about)]
struct Cli {
    /// Markdown file to publish
    markdown_file: PathBuf,

    /// Always create a new draft instead of updating a same-title one
    #[arg(long)]
    skip_existing_check: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

async fn run(cli: &Cli) -> Result<PublishOutcome> {
    let config = Config::from_env()?;
    publish_file(&config, &cli.markdown_file, !cli.skip_existing_check).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wechat_draft_pub={default_level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&cli).await {
        Ok(outcome) => {
            let verb = match &outcome {
                PublishOutcome::Created(_) => "created",
                PublishOutcome::Updated(_) => "updated",
            };
            println!("Draft {verb}: {}", outcome.media_id());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, severity = %e.severity(), "publish failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
