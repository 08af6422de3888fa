// Record parser for the decoder's interactive text output
// Turns one raw line into a TelemetryRecord, or None for anything that is not a data row

use regex::Regex;
use std::sync::OnceLock;

/// Terminal escape sequence: ESC '[' digits/semicolons, then one letter.
const ANSI_ESCAPE_PATTERN: &str = r"\x1b\[[0-9;]*[A-Za-z]";

/// Positional row grammar. Anchored at both ends so extra columns never match.
const RECORD_PATTERN: &str = concat!(
    r"^(?P<hex>[a-fA-F0-9]+)\s+",
    r"(?P<flight>\S+)\s+",
    r"(?P<altitude>[0-9]+)\s+",
    r"(?P<speed>[0-9]+)\s+",
    r"(?P<lat>-?[0-9]+\.[0-9]+)\s+",
    r"(?P<lon>-?[0-9]+\.[0-9]+)\s+",
    r"(?P<track>[0-9]+)\s+",
    r"(?P<messages>[0-9]+)$",
);

/// Header rows start with this token.
const HEADER_TOKEN: &str = "Hex";

/// Separator rows start with this character.
const SEPARATOR: char = '-';

fn ansi_escape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ANSI_ESCAPE_PATTERN).expect("ANSI escape pattern is valid"))
}

fn record_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(RECORD_PATTERN).expect("record pattern is valid"))
}

/// One parsed data row. Produced per line and folded into the trail store.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// ICAO address as printed (hex digits, case preserved)
    pub hex: String,
    /// Callsign; the aircraft key
    pub flight: String,
    /// Altitude in feet as reported
    pub altitude: u64,
    /// Ground speed in knots as reported
    pub speed: u64,
    pub latitude: f64,
    pub longitude: f64,
    /// Heading in degrees
    pub track: u64,
    /// Messages seen from this aircraft
    pub messages: u64,
}

impl TelemetryRecord {
    /// Position as a (lat, lon) pair.
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// Remove terminal escape sequences and surrounding whitespace.
pub fn clean_line(raw: &str) -> String {
    ansi_escape().replace_all(raw, "").trim().to_string()
}

/// Parse one raw line.
///
/// Returns `None` for blank lines, header and separator rows, and any row
/// that does not match the full column grammar. None of these are errors.
pub fn parse_line(raw: &str) -> Option<TelemetryRecord> {
    let line = clean_line(raw);
    if line.is_empty() || line.starts_with(HEADER_TOKEN) || line.starts_with(SEPARATOR) {
        return None;
    }

    let caps = record_pattern().captures(&line)?;

    Some(TelemetryRecord {
        hex: caps["hex"].to_string(),
        flight: caps["flight"].to_string(),
        altitude: caps["altitude"].parse().ok()?,
        speed: caps["speed"].parse().ok()?,
        latitude: caps["lat"].parse().ok()?,
        longitude: caps["lon"].parse().ok()?,
        track: caps["track"].parse().ok()?,
        messages: caps["messages"].parse().ok()?,
    })
}
