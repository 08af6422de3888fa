// Ingestion loop
// Tails the decoder output, folds parsed records into the trail store and exports snapshots

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::constants::{DEFAULT_EXPORT_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS};
use crate::error::IngestError;
use crate::parser::parse_line;
use crate::snapshot::SnapshotExporter;
use crate::tail::LineTailer;
use crate::trail::TrailStore;

/// Tunables for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Pause before re-checking the source when no line is available
    pub poll_interval: Duration,
    /// Minimum spacing between exports. Zero exports after every record.
    pub export_interval: Duration,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            export_interval: Duration::from_millis(DEFAULT_EXPORT_INTERVAL_MS),
        }
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    /// Opening the source and seeking to its end
    Opening,
    /// Reading appended lines
    Tailing,
    /// No new data; sleeping before the next check
    IdleWait,
    /// Source could not be opened or read; the loop has exited
    Failed,
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines_read: u64,
    pub records_accepted: u64,
    pub lines_skipped: u64,
    pub exports_written: u64,
    pub export_failures: u64,
}

/// Single driver of the parse -> store -> export pipeline.
pub struct Ingestor {
    source: PathBuf,
    store: Arc<TrailStore>,
    exporter: SnapshotExporter,
    options: IngestOptions,
    state: IngestState,
    stats: IngestStats,
    /// Store has changes not yet in the snapshot file
    dirty: bool,
    last_export_attempt: Option<Instant>,
}

impl Ingestor {
    pub fn new(
        source: impl Into<PathBuf>,
        store: Arc<TrailStore>,
        exporter: SnapshotExporter,
        options: IngestOptions,
    ) -> Self {
        Ingestor {
            source: source.into(),
            store,
            exporter,
            options,
            state: IngestState::Opening,
            stats: IngestStats::default(),
            dirty: false,
            last_export_attempt: None,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn state(&self) -> IngestState {
        self.state
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Run until `shutdown` turns true.
    ///
    /// Only lines appended after start-up are processed. Shutdown is checked
    /// at the top of each iteration. Returns `SourceUnavailable` without
    /// touching the store if the source cannot be opened.
    pub async fn run(&mut self, shutdown: watch::Receiver<bool>) -> Result<IngestStats, IngestError> {
        self.state = IngestState::Opening;
        let mut tailer = match LineTailer::open_at_end(&self.source).await {
            Ok(t) => t,
            Err(source) => {
                self.state = IngestState::Failed;
                error!("{} not found or unreadable: {}", self.source.display(), source);
                return Err(IngestError::SourceUnavailable {
                    path: self.source.clone(),
                    source,
                });
            }
        };
        info!(
            "Watching {} from offset {}",
            self.source.display(),
            tailer.offset()
        );

        while !*shutdown.borrow() {
            match tailer.next_line().await {
                Ok(Some(line)) => {
                    self.state = IngestState::Tailing;
                    self.process_line(&line).await;
                }
                Ok(None) => {
                    self.state = IngestState::IdleWait;
                    if self.export_due(true) {
                        self.export().await;
                    }
                    match tailer.reopen_if_rotated().await {
                        Ok(true) => warn!(
                            "{} was rotated or truncated, reading from start",
                            self.source.display()
                        ),
                        Ok(false) => {}
                        Err(e) => warn!("Failed to check {}: {}", self.source.display(), e),
                    }
                    tokio::time::sleep(self.options.poll_interval).await;
                }
                Err(source) => {
                    self.state = IngestState::Failed;
                    error!("Failed reading {}: {}", self.source.display(), source);
                    return Err(IngestError::Read {
                        path: self.source.clone(),
                        source,
                    });
                }
            }
        }

        self.flush().await;
        info!(
            "Ingestion stopped: {} lines, {} records, {} exports ({} failed)",
            self.stats.lines_read,
            self.stats.records_accepted,
            self.stats.exports_written,
            self.stats.export_failures
        );
        Ok(self.stats)
    }

    /// Apply one raw line. Returns true if it was a data row.
    pub async fn process_line(&mut self, raw: &str) -> bool {
        self.stats.lines_read += 1;
        let Some(record) = parse_line(raw) else {
            self.stats.lines_skipped += 1;
            return false;
        };

        let outcome = self.store.update(&record).await;
        self.stats.records_accepted += 1;
        self.dirty = true;

        if outcome.created {
            info!("New aircraft {} ({})", record.flight, record.hex);
        }
        debug!(
            "{} alt={} spd={} pos=({}, {}) trail={}{}",
            record.flight,
            record.altitude,
            record.speed,
            record.latitude,
            record.longitude,
            outcome.trail_len,
            if outcome.appended { "" } else { " (repeat)" }
        );

        if self.export_due(false) {
            self.export().await;
        }
        true
    }

    /// Export now if the store has changes that are not on disk yet.
    pub async fn flush(&mut self) {
        if self.dirty {
            self.export().await;
        }
    }

    /// Pending changes and the coalescing interval (if any) has elapsed.
    /// Without coalescing, a failed export is retried on the next record, not while idle.
    fn export_due(&self, idle: bool) -> bool {
        if !self.dirty {
            return false;
        }
        if self.options.export_interval.is_zero() {
            return !idle;
        }
        self.last_export_attempt
            .map_or(true, |t| t.elapsed() >= self.options.export_interval)
    }

    async fn export(&mut self) {
        let states = self.store.snapshot().await;
        self.last_export_attempt = Some(Instant::now());
        match self.exporter.export(&states).await {
            Ok(()) => {
                self.stats.exports_written += 1;
                self.dirty = false;
            }
            Err(e) => {
                self.stats.export_failures += 1;
                error!("Snapshot export failed: {}", e);
            }
        }
    }
}
