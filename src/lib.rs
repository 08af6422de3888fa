pub mod constants;
pub mod error;
pub mod parser;
pub mod trail;
pub mod snapshot;
pub mod tail;
pub mod ingest;
pub mod server;
pub mod config;

pub use error::{ExportError, IngestError, ServerError};
pub use ingest::{IngestOptions, IngestState, IngestStats, Ingestor};
pub use parser::{parse_line, TelemetryRecord};
pub use snapshot::SnapshotExporter;
pub use trail::{AircraftState, TrailPoint, TrailStore, UpdateOutcome};
