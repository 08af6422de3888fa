// Shared defaults for the ingestion pipeline and static server

/// Text feed written by the external decoder (`dump1090 --interactive > ...`).
pub const DEFAULT_INPUT_FILE: &str = "dump1090_output.txt";

/// Snapshot polled by the map page.
pub const DEFAULT_OUTPUT_FILE: &str = "flights.json";

/// Map page served next to the snapshot.
pub const DEFAULT_MAP_PAGE: &str = "flights_map.html";

/// HTTP port of the static server.
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Idle-wait between polls of the source when no new line is available (ms).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Minimum spacing between snapshot exports (ms). 0 = export after every record.
pub const DEFAULT_EXPORT_INTERVAL_MS: u64 = 0;

/// Contents of a freshly seeded snapshot.
pub const EMPTY_SNAPSHOT: &str = "[]";

/// Suffix of the temporary file written before the atomic rename.
pub const TMP_SUFFIX: &str = "tmp";
