//! Omniseal - Code integrity screening CLI
//!
//! Reads an untrusted Python snippet from a file or stdin, runs the
//! integrity validator, and reports the verdict as text or JSON.

use anyhow::Context;
use clap::Parser;
use omniseal::{config::ValidatorConfig, logging, validator::CodeIntegrityValidator};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "omniseal")]
#[command(author = "MadKoding")]
#[command(version = "0.1.0")]
#[command(about = "Static safety screening for untrusted Python snippets", long_about = None)]
struct Args {
    /// File containing the candidate code, or '-' for stdin
    input: PathBuf,

    /// Configuration file path (overrides defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the verdict as JSON ({"safe": ...})
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose);

    match run(args).await {
        Ok(accepted) => {
            if accepted {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    if let Err(e) = logging::init_audit_log() {
        tracing::warn!("audit log unavailable: {}", e);
    }

    let config = ValidatorConfig::load(args.config.as_deref())?;
    let validator = CodeIntegrityValidator::new(config)?;

    let candidate = read_candidate(&args.input)?;
    let verdict = validator.validate(&candidate).await;

    logging::audit(
        if verdict.accepted { "ACCEPT" } else { "REJECT" },
        verdict
            .reason_code
            .map(|r| r.as_code())
            .unwrap_or("candidate passed all checks"),
    );

    if args.json {
        println!("{}", verdict.safe_json());
    } else if verdict.accepted {
        println!("ACCEPT");
    } else {
        let reason = verdict
            .reason_code
            .map(|r| r.as_code())
            .unwrap_or("UNKNOWN");
        let message = verdict.message.as_deref().unwrap_or("");
        println!("REJECT {} - {}", reason, message);
    }

    Ok(verdict.accepted)
}

fn read_candidate(input: &PathBuf) -> anyhow::Result<String> {
    if input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read candidate from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read candidate from {:?}", input))
    }
}

/// Initialize logging
fn init_logging(verbose: bool) {
    let filter = if verbose {
        "omniseal=debug,info"
    } else {
        "omniseal=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
