mod app;
mod cache;
mod cli;
mod config;
mod constants;
mod error;
mod input;
mod mail;
mod ui;

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::cache::MemoryCache;
use crate::cli::{Command, USAGE};
use crate::config::Config;
use crate::mail::{JmapEngine, JmapSession};

fn setup_logging() {
    use std::fs::{self, OpenOptions};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,lttr=debug"));

    // The terminal belongs to the UI, so log to a file in the data directory
    let log_file = Config::data_dir()
        .ok()
        .and_then(|dir| fs::create_dir_all(&dir).ok().map(|_| dir.join("lttr.log")))
        .and_then(|path| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .ok()
        });

    if let Some(file) = log_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        // Fallback to stderr if file logging fails
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let raw: Vec<String> = env::args().skip(1).collect();
    let args = match cli::parse_args(&raw) {
        Ok(Command::Help) => {
            print!("{}", USAGE);
            return Ok(());
        }
        Ok(Command::Run(args)) => args,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            process::exit(1);
        }
    };

    setup_logging();
    let config = Config::load()?;

    let session = match args.session_url() {
        Some(url) => JmapSession::connect(&url, &args.username, &args.password).await,
        None => Err(error::SyncError::NotFound(format!(
            "domain in username {}",
            args.username
        ))),
    };
    let session = match session {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Session setup failed: {}", e);
            eprintln!("Could not find primary email account");
            process::exit(1);
        }
    };

    let cache = Arc::new(MemoryCache::new());
    let engine = Arc::new(JmapEngine::new(
        session,
        cache.clone(),
        config.sync.query_page_size,
    ));

    let (app, render_thread) = match App::new(&config, engine, cache, &args.username) {
        Ok(started) => started,
        Err(e) => {
            eprintln!("unable to create terminal: {}", e);
            process::exit(1);
        }
    };

    let result = app.run().await;
    render_thread.shutdown();
    tracing::info!("Bye");
    result
}
