//! Observatory - query the Mozilla HTTP Observatory from the command line

use anyhow::{Context, Result};
use clap::Parser;
use observatory_client::{ObservatoryClient, INVALID_GRADE, INVALID_SCORE};
use observatory_core::AppConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Grade websites with the Mozilla HTTP Observatory
#[derive(Debug, Parser)]
#[command(name = "observatory", version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Debug output
    #[arg(short = 'D', long)]
    debug: bool,

    /// Print the full scan report as JSON
    #[arg(short, long)]
    detailed: bool,

    /// Print the scan history of each site as JSON
    #[arg(long, conflicts_with = "detailed")]
    history: bool,

    /// Print the numeric score instead of the grade
    #[arg(long)]
    score: bool,

    /// Force a new scan (default)
    #[arg(long, overrides_with = "no_rescan")]
    rescan: bool,

    /// Use the most recent scan instead of starting a new one
    #[arg(long, overrides_with = "rescan")]
    no_rescan: bool,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sites to look up
    #[arg(required = true)]
    sites: Vec<String>,
}

impl Cli {
    /// Verbosity requested on the command line, if any
    fn verbosity(&self) -> Option<u8> {
        if self.debug {
            Some(2)
        } else if self.verbose {
            Some(1)
        } else {
            None
        }
    }
}

/// Filter directive for a verbosity level
fn filter_for(level: u8) -> String {
    let level = match level {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    format!("warn,observatory={level},observatory_client={level},observatory_core={level}")
}

/// Initialize tracing subscriber for logging; `RUST_LOG` wins when set
fn init_tracing(level: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_for(level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(level > 1).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("failed to load config")?,
    };
    config.apply_env(|key| std::env::var(key).ok());

    if let Some(level) = cli.verbosity() {
        config.client.log_level = level;
    }
    Ok(config)
}

async fn show_grade(client: &mut ObservatoryClient, site: &str, cli: &Cli) -> Result<()> {
    let rescan = cli.rescan || !cli.no_rescan;
    let record = client.analyze(site, rescan).await;

    match record {
        Ok(record) if cli.score => println!("Score for '{site}' is {}", record.score),
        Ok(record) => println!("Grade for '{site}' is {}", record.grade),
        Err(e) => {
            if cli.score {
                println!("Score for '{site}' is {INVALID_SCORE}");
            } else {
                println!("Grade for '{site}' is {INVALID_GRADE}");
            }
            return Err(e).with_context(|| format!("failed to scan '{site}'"));
        }
    }
    Ok(())
}

async fn show_report(client: &mut ObservatoryClient, site: &str) -> Result<()> {
    let report = client
        .scan_report(site)
        .await
        .with_context(|| format!("failed to fetch report for '{site}'"))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn show_history(client: &ObservatoryClient, site: &str) -> Result<()> {
    let history = client
        .host_history(site)
        .await
        .with_context(|| format!("failed to fetch history for '{site}'"))?;
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(config.client.log_level);

    debug!(
        "observatory v{} (client v{})",
        env!("CARGO_PKG_VERSION"),
        observatory_client::VERSION
    );

    let mut client = ObservatoryClient::new(&config).context("failed to create client")?;
    let mut failures = 0usize;

    for site in &cli.sites {
        let outcome = if cli.detailed {
            show_report(&mut client, site).await
        } else if cli.history {
            show_history(&client, site).await
        } else {
            show_grade(&mut client, site, &cli).await
        };
        if let Err(e) = outcome {
            error!("{:#}", e);
            failures += 1;
        }
    }

    if failures > 0 {
        debug!("{} of {} site(s) failed", failures, cli.sites.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["observatory", "www.mozilla.org"]).expect("parse");
        assert_eq!(cli.sites, vec!["www.mozilla.org"]);
        assert!(!cli.no_rescan);
        assert!(!cli.score);
        assert_eq!(cli.verbosity(), None);
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "observatory",
            "-v",
            "-D",
            "--score",
            "--no-rescan",
            "a.example",
            "b.example",
        ])
        .expect("parse");
        assert_eq!(cli.verbosity(), Some(2));
        assert!(cli.score);
        assert!(cli.no_rescan);
        assert_eq!(cli.sites.len(), 2);

        let cli = Cli::try_parse_from(["observatory", "--no-rescan", "--rescan", "a.example"])
            .expect("parse");
        assert!(!cli.no_rescan);
    }

    #[test]
    fn test_site_required() {
        assert!(Cli::try_parse_from(["observatory"]).is_err());
        assert!(Cli::try_parse_from(["observatory", "-d", "--history", "a.example"]).is_err());
    }

    #[test]
    fn test_filter_for() {
        assert!(filter_for(0).contains("observatory_client=warn"));
        assert!(filter_for(1).contains("observatory_client=info"));
        assert!(filter_for(2).contains("observatory_client=debug"));
        assert!(filter_for(7).contains("observatory_client=debug"));
    }
}
