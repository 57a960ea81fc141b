//! `dep-diligence`: inventory a project's open source dependencies.
//!
//! # Flow
//! 1. Parse CLI arguments ([`Cli`]); prompt for the folder when none is given.
//! 2. Validate the target and load config ([`load_config`]).
//! 3. Discover manifests ([`discover_manifests`]), minus `--exclude-lang`.
//! 4. Look up registry metadata and known vulnerabilities ([`Scanner`]).
//! 5. Write the Markdown (or JSON) report and print a terminal summary.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dep_diligence::cli::{Cli, ReportFormat};
use dep_diligence::config::{load_config, validate_target};
use dep_diligence::detector::discover_manifests;
use dep_diligence::report;
use dep_diligence::scan::Scanner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    let path = match &cli.path {
        Some(path) => path.clone(),
        None => prompt_for_path()?,
    };
    let path = validate_target(&path)?;

    let mut config = load_config(&path, cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    let excluded = cli.excluded();
    let manifests: Vec<_> = discover_manifests(&path)?
        .into_iter()
        .filter(|m| !excluded.contains(&m.ecosystem))
        .collect();
    if manifests.is_empty() {
        warn!("No supported dependency manifests found in {}", path.display());
    }

    let mut scanner = Scanner::new(&config)?;
    if !cli.quiet {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        pb.set_message("looking up dependencies");
        scanner = scanner.with_progress(pb);
    }

    let scan = scanner.run(&manifests).await;

    let rendered = match cli.format {
        ReportFormat::Markdown => report::markdown::render(&scan),
        ReportFormat::Json => serde_json::to_string_pretty(&scan)?,
    };
    std::fs::write(&cli.output, rendered)
        .with_context(|| format!("Failed to write report to {}", cli.output.display()))?;
    info!("Report generated: {}", cli.output.display());

    report::terminal::render(&scan, &path, &cli.output, cli.verbose, cli.quiet);

    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn prompt_for_path() -> Result<PathBuf> {
    print!("Enter the folder path to analyze: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim();
    if answer.is_empty() {
        bail!("No folder path given");
    }
    Ok(PathBuf::from(answer))
}
