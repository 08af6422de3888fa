// Flight trails - main entry point
// Copyright (C) 2024 - flight-trails contributors
// Licensed under AGPL v3
// Tails decoder output, keeps per-aircraft trails and serves the snapshot to the map page

use clap::Parser;
use flight_trails::config::Config;
use flight_trails::ingest::Ingestor;
use flight_trails::server;
use flight_trails::snapshot::SnapshotExporter;
use flight_trails::trail::TrailStore;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_logging(config.verbose);

    info!("Starting flight trail tracker");
    info!(
        "Input: {}, snapshot: {}",
        config.input.display(),
        config.output.display()
    );

    let exporter = SnapshotExporter::new(&config.output);
    // The map page polls the snapshot immediately, so it must exist before serving
    if let Err(e) = exporter.ensure_exists().await {
        error!("Failed to create initial snapshot: {}", e);
    }

    let store = Arc::new(TrailStore::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut ingestor = Ingestor::new(
        config.input.clone(),
        Arc::clone(&store),
        exporter.clone(),
        config.ingest_options(),
    );
    let ingest_rx = shutdown_rx.clone();
    let mut ingest_handle = tokio::spawn(async move {
        match ingestor.run(ingest_rx).await {
            Ok(stats) => info!("Ingestion finished after {} records", stats.records_accepted),
            Err(e) => error!("Ingestion stopped: {}", e),
        }
    });

    let mut server_handle = None;
    if config.no_serve {
        info!("Static server disabled");
    } else {
        let root = exporter.directory();
        if !root.join(&config.map_page).exists() {
            warn!("Map page {} not found in {}", config.map_page, root.display());
        }
        match server::bind(config.port).await {
            Ok(listener) => {
                let server_rx = shutdown_rx.clone();
                server_handle = Some(tokio::spawn(async move {
                    if let Err(e) = server::serve(listener, &root, server_rx).await {
                        error!("{}", e);
                    }
                }));
                let url = config.map_url();
                info!("Serving at {}", url);
                if !config.no_browser {
                    tokio::spawn(server::open_browser(url));
                }
            }
            Err(e) => error!("{}", e),
        }
    }

    // Without a server there is nothing left to do once ingestion ends
    let wait_for_ingest = server_handle.is_none();
    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
                return Err(err.into());
            }
        },
        _ = &mut ingest_handle, if wait_for_ingest => {
            info!("Ingestion ended and no server is running");
        }
    }

    info!("Shutting down...");
    let _ = shutdown_tx.send(true);
    if !ingest_handle.is_finished() {
        let _ = ingest_handle.await;
    }
    if let Some(handle) = server_handle {
        let _ = handle.await;
    }

    info!("Stopped with {} aircraft tracked", store.len().await);
    Ok(())
}

/// Initialize logging subsystem. `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_env_filter(filter)
        .init();

    if verbose {
        info!("Verbose logging enabled (DEBUG level)");
    }
}
