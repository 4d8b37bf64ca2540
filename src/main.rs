//! CLI entry point for the mediasync tool.

use std::path::Path;

use anyhow::{Result, bail};
use clap::Parser;
use mediasync_core::{
    MatchPolicy, MediaKind, ProbeOutcome, RegistryStore, SyncOutcome, YtDlp, run_sync,
};
use tracing::{debug, info};

mod cli;
mod display;

use cli::{Args, Command};
use display::CliObserver;

/// Title placeholder recorded when a title probe times out during `list`.
const FAILED_FETCH_TITLE: &str = "[Failed to fetch]";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let store = RegistryStore::new(&args.registry);

    match args.command {
        Command::Sync { kind } => run_sync_command(&store, kind, args.quiet).await,
        Command::Add { kind, link } => run_add_command(&store, kind, &link),
        Command::List => run_list_command(&store).await,
        Command::SetPath { path } => run_set_path_command(&store, &path),
    }
}

async fn run_sync_command(store: &RegistryStore, kind: MediaKind, quiet: bool) -> Result<()> {
    let tool = match YtDlp::discover() {
        Ok(tool) => tool,
        Err(error) => bail!("{error}"),
    };

    let observer = CliObserver::new(quiet);
    let summary = run_sync(store, &tool, kind, MatchPolicy::default(), &observer).await?;
    observer.finish();

    info!(
        passes = summary.passes,
        completed = summary.completed,
        failed = summary.failed,
        "Sync run finished"
    );

    match summary.outcome {
        SyncOutcome::NoEntries => {
            println!(
                "No {kind} links found in {}",
                store.path().display()
            );
        }
        SyncOutcome::Satisfied => {
            if summary.completed > 0 {
                println!(
                    "All {kind} links are downloaded ({} fetched this run).",
                    summary.completed
                );
            } else {
                println!("All {kind} links are already downloaded.");
            }
        }
        SyncOutcome::Stalled { remaining } => {
            println!(
                "{remaining} {kind} item(s) could not be fetched; they stay pending."
            );
            bail!("{remaining} item(s) failed; run the sync again later to retry");
        }
    }
    Ok(())
}

fn run_add_command(store: &RegistryStore, kind: MediaKind, link: &str) -> Result<()> {
    let mut document = store.load()?;
    if document.find_by_link(kind, link).is_some() {
        println!("Link already registered for {kind}: {link}");
        return Ok(());
    }
    store.upsert(&mut document, kind, link)?;
    println!("Added {kind} link: {link}");
    Ok(())
}

async fn run_list_command(store: &RegistryStore) -> Result<()> {
    let mut document = store.load()?;

    // Backfill missing titles with the fast title-only probe when the tool
    // is around; listing still works without it.
    if let Ok(tool) = YtDlp::discover() {
        use mediasync_core::MediaTool;

        let mut changed = false;
        for kind in [MediaKind::Audio, MediaKind::Video] {
            let untitled: Vec<String> = document
                .section(kind)
                .links
                .iter()
                .filter(|entry| entry.has_link() && entry.known_title().is_empty())
                .map(|entry| entry.link.clone())
                .collect();
            if untitled.is_empty() {
                continue;
            }

            println!("Fetching {} missing {kind} title(s)...", untitled.len());
            for link in untitled {
                match tool.probe_title(&link).await {
                    ProbeOutcome::Found { title, .. } => {
                        if let Some(entry) = document.find_by_link_mut(kind, &link) {
                            entry.title = Some(title);
                            changed = true;
                        }
                    }
                    ProbeOutcome::TimedOut => {
                        if let Some(entry) = document.find_by_link_mut(kind, &link) {
                            entry.title = Some(FAILED_FETCH_TITLE.to_string());
                            changed = true;
                        }
                    }
                    ProbeOutcome::Unavailable => {}
                }
            }
        }
        if changed {
            store.save(&document)?;
        }
    } else {
        debug!("Fetch tool unavailable; listing without title backfill");
    }

    for kind in [MediaKind::Audio, MediaKind::Video] {
        let links = &document.section(kind).links;
        println!(
            "\n{} ({} links):",
            kind.as_str().to_uppercase(),
            links.len()
        );
        if links.is_empty() {
            println!("  (none)");
            continue;
        }
        for (index, entry) in links.iter().enumerate() {
            let marker = if entry.downloaded() { "[x]" } else { "[ ]" };
            let label = if !entry.known_title().is_empty() {
                display::truncate_title(entry.known_title(), 40)
            } else if entry.has_link() {
                entry.link.clone()
            } else {
                "(invalid entry: missing link)".to_string()
            };
            println!("  {}. {marker} {label}", index + 1);
        }
    }
    Ok(())
}

fn run_set_path_command(store: &RegistryStore, path: &Path) -> Result<()> {
    let mut document = store.load()?;
    document.meta.default_path = path.display().to_string();
    store.save(&document)?;
    std::fs::create_dir_all(path)?;
    println!("Download path updated to: {}", path.display());
    Ok(())
}
