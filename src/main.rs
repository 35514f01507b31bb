mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use docs2md::{BatchOptions, CancellationToken, ConversionReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(report) => {
            print_report(&report);
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &cli::Cli) -> Result<ConversionReport> {
    let options = BatchOptions {
        input_dir: cli.input.clone(),
        output_dir: cli.output_dir(),
        recursive: cli.recursive,
        include_legacy: cli.include_doc,
        overwrite: cli.overwrite,
        office_executable: cli.soffice.clone(),
    };

    let bar = if cli.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    bar.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {wide_msg}")
            .context("Invalid progress bar template")?,
    );

    let mut on_progress = |current: usize, total: usize, path: &Path| {
        bar.set_length(total as u64);
        bar.set_position(current as u64);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        bar.set_message(name);
    };

    // The CLI runs to completion; only library callers stop a run early.
    let report = if cli.input.is_file() {
        docs2md::run_file(&cli.input, &options, &mut on_progress, &CancellationToken::default())
    } else {
        docs2md::run_batch_with_progress(&options, &mut on_progress, &CancellationToken::default())
    }
    .with_context(|| format!("Failed to convert {}", cli.input.display()))?;

    bar.finish_and_clear();
    Ok(report)
}

fn print_report(report: &ConversionReport) {
    println!("Converted: {}", report.converted);
    println!("Skipped:   {}", report.skipped);
    println!("Failed:    {}", report.failed);

    if !report.failures.is_empty() {
        println!("\nFailures:");
        for failure in &report.failures {
            println!("- {}", failure);
        }
    }
}
