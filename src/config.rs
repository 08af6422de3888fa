use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_EXPORT_INTERVAL_MS, DEFAULT_HTTP_PORT, DEFAULT_INPUT_FILE, DEFAULT_MAP_PAGE,
    DEFAULT_OUTPUT_FILE, DEFAULT_POLL_INTERVAL_MS,
};
use crate::ingest::IngestOptions;

/// Flight trail tracker configuration
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Decoder text output to tail (e.g. `dump1090 --interactive > FILE`).
    #[arg(long, value_name = "FILE", default_value = DEFAULT_INPUT_FILE)]
    pub input: PathBuf,

    /// Snapshot file rewritten after every accepted record.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,

    /// Map page, relative to the snapshot's directory, opened in the browser.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_MAP_PAGE)]
    pub map_page: String,

    /// Port for the static file server.
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// Delay before re-checking the input when no new line is available.
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Export at most once per interval; 0 exports after every record.
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_EXPORT_INTERVAL_MS)]
    pub export_interval_ms: u64,

    /// Do not start the static file server
    #[arg(long, default_value_t = false)]
    pub no_serve: bool,

    /// Do not open a browser on start-up
    #[arg(long, default_value_t = false)]
    pub no_browser: bool,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Settings for the ingestion loop.
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            export_interval: Duration::from_millis(self.export_interval_ms),
        }
    }

    /// URL of the map page on the local static server.
    pub fn map_url(&self) -> String {
        format!("http://localhost:{}/{}", self.port, self.map_page.trim_start_matches('/'))
    }
}
