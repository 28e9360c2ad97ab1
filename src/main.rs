//! marquee
//!
//! Usage:
//!     marquee ingest --collection "Michael Mann" --type movie titles.txt
//!     marquee monitor
//!     marquee watch
//!     marquee lists import "someone|best-of-mann" --type movie --collection Mann

mod app;
mod error;
mod render;

use crate::app::App;
use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Parser, Subcommand};
use exn::ResultExt;
use marquee_config::Config;
use marquee_engine::{PassReport, ScanEvent};
use marquee_services::ListRef;
use marquee_store::MediaType;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tokio::signal;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "marquee", version, about = "Keep media collections in sync with your library")]
struct Cli {
    /// Config file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging; repeat for even more
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add "Title (Year)" lines to a collection and reconcile them
    Ingest {
        #[arg(long)]
        collection: String,
        #[arg(long = "type")]
        media_type: MediaType,
        /// Read from this file instead of stdin ("-" is stdin)
        file: Option<PathBuf>,
    },
    /// Re-check pending items once
    Monitor {
        /// Only this collection
        #[arg(long)]
        collection: Option<String>,
    },
    /// Re-check pending items periodically until interrupted
    Watch,
    /// Show collection progress
    Status {
        /// Show the items of one collection
        name: Option<String>,
    },
    /// Stop tracking a collection
    Delete { name: String },
    /// Public lists
    Lists {
        #[command(subcommand)]
        command: ListsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ListsCommand {
    Search { query: String },
    /// Ingest a list's items into a collection
    Import {
        /// USER|ID, as printed by `lists search`
        list: ListRef,
        #[arg(long = "type")]
        media_type: MediaType,
        #[arg(long)]
        collection: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let app = App::build(config).await?;
    let coordinator = &app.coordinator;

    match cli.command {
        Command::Ingest { collection, media_type, file } => {
            let text = read_input(file.as_deref()).await?;
            let events = coordinator.subscribe();
            let pass = coordinator.ingest_text(&collection, media_type, &text).await.or_raise(|| ErrorKind::Engine)?;
            follow_pass(pass, events, || coordinator.cancel_ingest()).await?;
        },
        Command::Monitor { collection } => {
            let events = coordinator.subscribe();
            let pass = match collection.as_deref() {
                Some(name) => coordinator.rescan(name),
                None => coordinator.start_monitor(None),
            }
            .or_raise(|| ErrorKind::Engine)?;
            follow_pass(pass, events, || coordinator.cancel_monitor()).await?;
        },
        Command::Watch => {
            let every = app.config.monitor.auto_scan_interval();
            info!(minutes = app.config.monitor.auto_scan_minutes, "Watching collections, Ctrl-C to stop");
            let printer = tokio::spawn(render::follow(coordinator.subscribe(), false));
            let scans = coordinator.spawn_auto_scan(every);
            signal::ctrl_c().await.or_raise(|| ErrorKind::Io)?;
            coordinator.cancel_monitor();
            scans.abort();
            printer.abort();
        },
        Command::Status { name: None } => print!("{}", render::status(&coordinator.status().await)),
        Command::Status { name: Some(name) } => match coordinator.context().store.collection(&name).await {
            Some(collection) => print!("{}", render::collection(&name, &collection)),
            None => exn::bail!(ErrorKind::Input(format!("no collection named '{name}'"))),
        },
        Command::Delete { name } => {
            if !coordinator.delete(&name).await {
                exn::bail!(ErrorKind::Input(format!("no collection named '{name}'")));
            }
            println!("Deleted '{name}'");
        },
        Command::Lists { command: ListsCommand::Search { query } } => {
            let found = app.discovery()?.search_lists(&query).await.or_raise(|| ErrorKind::Service)?;
            print!("{}", render::lists(&found));
        },
        Command::Lists { command: ListsCommand::Import { list, media_type, collection } } => {
            let discovery = app.discovery()?;
            let events = coordinator.subscribe();
            let pass = coordinator
                .import_list(discovery.as_ref(), &list, media_type, &collection)
                .await
                .or_raise(|| ErrorKind::Engine)?;
            follow_pass(pass, events, || coordinator.cancel_ingest()).await?;
        },
    }
    Ok(())
}

async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path).await.or_raise(|| ErrorKind::Io),
        _ => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await.or_raise(|| ErrorKind::Io)?;
            Ok(text)
        },
    }
}

/// Prints a pass's events while it runs. Ctrl-C calls `cancel` and waits for
/// the pass to wind down.
async fn follow_pass(
    mut pass: JoinHandle<PassReport>,
    events: Receiver<ScanEvent>,
    cancel: impl FnOnce(),
) -> Result<PassReport> {
    let printer = tokio::spawn(render::follow(events, true));
    let report = tokio::select! {
        report = &mut pass => report,
        _ = signal::ctrl_c() => {
            warn!("Interrupted, stopping after the current item");
            cancel();
            pass.await
        },
    };
    match report.or_raise(|| ErrorKind::Engine) {
        Ok(report) => {
            let _ = printer.await;
            Ok(report)
        },
        Err(err) => {
            printer.abort();
            Err(err)
        },
    }
}
