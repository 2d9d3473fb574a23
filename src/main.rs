//! Messenger Export - flatten a Facebook Messenger threads_db2 database.
//!
//! Reads the `thread_users` and `messages` tables, normalizes the JSON
//! blobs embedded in message rows (attachments, call events, sender
//! envelopes), resolves participant identities, downloads referenced
//! media and writes one delimited file grouped by conversation thread.

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::Path;

use clap::Parser;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{collect_threads, load_resolver, run_export, ExportOptions};
use cli::{Cli, Commands};
use domain::ExportStats;
use infrastructure::{load_config, DownloadPolicy, DownloadReport, ThreadsDbReader};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> domain::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Export {
            db,
            output,
            files_dir,
            skip_downloads,
            fail_fast,
        } => {
            let policy = if fail_fast {
                DownloadPolicy::FailFast
            } else {
                config.downloads.policy
            };

            let options = ExportOptions {
                db_path: db,
                output_path: output,
                files_dir: files_dir.unwrap_or_else(|| config.downloads.files_dir.clone()),
                download: !skip_downloads,
                policy,
                delimiter: config.delimiter_byte()?,
            };

            cmd_export(&options)?;
        }
        Commands::Stats { db } => {
            cmd_stats(&db)?;
        }
        Commands::Contacts { db, limit } => {
            cmd_contacts(&db, limit)?;
        }
    }

    Ok(())
}

/// Full export command.
fn cmd_export(options: &ExportOptions) -> domain::Result<()> {
    let outcome = run_export(options)?;

    println!(
        "{} Exported {} messages in {} threads to {}",
        "✓".green().bold(),
        outcome.stats.message_count,
        outcome.stats.thread_count,
        options.output_path.display()
    );

    if options.download {
        print_download_summary(&outcome.downloads, &options.files_dir);
    }

    Ok(())
}

/// Database summary without writing anything.
fn cmd_stats(db: &Path) -> domain::Result<()> {
    let reader = ThreadsDbReader::open(db)?;
    let resolver = load_resolver(&reader)?;

    let mut report = DownloadReport::default();
    let (_, stats) = collect_threads(&reader, &resolver, None, &mut report)?;

    println!("{}", format_stats(&stats));

    Ok(())
}

/// List the resolved contacts table.
fn cmd_contacts(db: &Path, limit: usize) -> domain::Result<()> {
    let reader = ThreadsDbReader::open(db)?;
    let resolver = load_resolver(&reader)?;

    let mut entries: Vec<(&str, &str)> = resolver.entries().collect();
    entries.sort_unstable();
    if limit > 0 {
        entries.truncate(limit);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Key", "Name"]);
    for (key, name) in &entries {
        table.add_row(vec![key, name]);
    }

    println!("{table}");
    println!();
    println!("Total: {} contact(s)", resolver.len());

    Ok(())
}

/// Formats run statistics for display.
fn format_stats(stats: &ExportStats) -> String {
    format!(
        "{}\n  Contacts: {}\n  Threads: {}\n  Messages: {}\n  Attachments: {}\n  Calls: {}",
        "📊 Statistics".bold(),
        stats.contact_count.to_string().cyan(),
        stats.thread_count.to_string().cyan(),
        stats.message_count.to_string().cyan(),
        stats.attachment_count.to_string().green(),
        stats.call_count.to_string().blue()
    )
}

/// Prints the per-run download report.
fn print_download_summary(report: &DownloadReport, files_dir: &Path) {
    println!(
        "{} Downloaded {}/{} attachments to {}",
        "✓".green(),
        report.succeeded,
        report.attempted,
        files_dir.display()
    );

    if !report.failures.is_empty() {
        println!(
            "{} {} download(s) failed:",
            "!".yellow().bold(),
            report.failed()
        );
        for failure in &report.failures {
            println!("    {} ({}): {}", failure.file_name, failure.url, failure.error);
        }
    }
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
