// Trail store - per-aircraft latest state and position history
// Shared between the ingestion loop (writer) and snapshot readers

use std::collections::HashMap;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::parser::TelemetryRecord;

/// One trail position. Serializes as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailPoint(pub f64, pub f64);

impl From<(f64, f64)> for TrailPoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        TrailPoint(lat, lon)
    }
}

/// Accumulated state of one aircraft, keyed by callsign.
///
/// The serialized form is one element of the exported snapshot array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftState {
    /// Callsign (store key)
    pub flight: String,
    /// ICAO address from the most recent record
    pub hex: String,
    /// Altitude from the most recent record
    pub altitude: u64,
    /// Speed from the most recent record
    pub speed: u64,
    /// Positions in arrival order, without consecutive duplicates
    pub trail: Vec<TrailPoint>,
}

impl AircraftState {
    fn new(record: &TelemetryRecord) -> Self {
        AircraftState {
            flight: record.flight.clone(),
            hex: record.hex.clone(),
            altitude: record.altitude,
            speed: record.speed,
            trail: Vec::new(),
        }
    }

    /// Append a point unless it equals the last one. Returns true if appended.
    ///
    /// Only the immediately preceding point is compared, so returning to an
    /// earlier position after moving away adds a new entry.
    pub fn push_point(&mut self, point: TrailPoint) -> bool {
        if self.trail.last() == Some(&point) {
            return false;
        }
        self.trail.push(point);
        true
    }

    /// Last known position, if any.
    pub fn last_position(&self) -> Option<TrailPoint> {
        self.trail.last().copied()
    }
}

/// What an update did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The callsign was seen for the first time
    pub created: bool,
    /// The record's position was appended to the trail
    pub appended: bool,
    /// Trail length after the update
    pub trail_len: usize,
}

#[derive(Debug, Default)]
struct Inner {
    /// flight -> index into `aircraft`
    index: HashMap<String, usize>,
    /// Aircraft in first-sighting order
    aircraft: Vec<AircraftState>,
}

/// Concurrency-safe map of callsign -> AircraftState.
///
/// Every update is applied under one write guard for its whole
/// read-modify-write, and snapshots copy under the read guard, so readers
/// never see a half-applied update. Entries are never removed.
#[derive(Debug, Default)]
pub struct TrailStore {
    inner: RwLock<Inner>,
}

impl TrailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the store.
    ///
    /// Creates the aircraft on first sighting, appends the position unless it
    /// repeats the last trail point, and always overwrites hex/altitude/speed.
    pub async fn update(&self, record: &TelemetryRecord) -> UpdateOutcome {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;

        let (idx, created) = match inner.index.get(&record.flight) {
            Some(&idx) => (idx, false),
            None => {
                let idx = inner.aircraft.len();
                inner.aircraft.push(AircraftState::new(record));
                inner.index.insert(record.flight.clone(), idx);
                (idx, true)
            }
        };

        let state = &mut inner.aircraft[idx];
        let appended = state.push_point(record.position().into());
        state.hex.clone_from(&record.hex);
        state.altitude = record.altitude;
        state.speed = record.speed;

        UpdateOutcome {
            created,
            appended,
            trail_len: state.trail.len(),
        }
    }

    /// Deep copy of every aircraft, in first-sighting order.
    ///
    /// The guard is released before returning, so the caller can serialize
    /// and write the copy without blocking updates.
    pub async fn snapshot(&self) -> Vec<AircraftState> {
        self.inner.read().await.aircraft.clone()
    }

    /// Copy of one aircraft's state.
    pub async fn get(&self, flight: &str) -> Option<AircraftState> {
        let inner = self.inner.read().await;
        inner.index.get(flight).map(|&idx| inner.aircraft[idx].clone())
    }

    /// Number of distinct callsigns seen so far.
    pub async fn len(&self) -> usize {
        self.inner.read().await.aircraft.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(flight: &str, altitude: u64, lat: f64, lon: f64) -> TelemetryRecord {
        TelemetryRecord {
            hex: "4840D6".to_string(),
            flight: flight.to_string(),
            altitude,
            speed: 450,
            latitude: lat,
            longitude: lon,
            track: 270,
            messages: 12,
        }
    }

    #[tokio::test]
    async fn test_first_sighting_creates_aircraft() {
        let store = TrailStore::new();
        assert!(store.is_empty().await);

        let outcome = store.update(&record("BAW123", 35000, 51.47, -0.4543)).await;
        assert!(outcome.created);
        assert!(outcome.appended);
        assert_eq!(outcome.trail_len, 1);

        let ac = store.get("BAW123").await.unwrap();
        assert_eq!(ac.hex, "4840D6");
        assert_eq!(ac.altitude, 35000);
        assert_eq!(ac.trail, vec![TrailPoint(51.47, -0.4543)]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_repeated_point_not_appended_but_values_updated() {
        let store = TrailStore::new();
        store.update(&record("BAW123", 35000, 51.47, -0.4543)).await;

        let mut second = record("BAW123", 36000, 51.47, -0.4543);
        second.hex = "4840D7".to_string();
        second.speed = 460;
        let outcome = store.update(&second).await;
        assert!(!outcome.created);
        assert!(!outcome.appended);

        let ac = store.get("BAW123").await.unwrap();
        assert_eq!(ac.trail.len(), 1);
        assert_eq!(ac.altitude, 36000);
        assert_eq!(ac.speed, 460);
        assert_eq!(ac.hex, "4840D7");
    }

    #[tokio::test]
    async fn test_only_previous_point_is_compared() {
        let store = TrailStore::new();
        store.update(&record("EZY45K", 1000, 1.0, 2.0)).await;
        store.update(&record("EZY45K", 1000, 1.5, 2.5)).await;
        store.update(&record("EZY45K", 1000, 1.0, 2.0)).await;

        let ac = store.get("EZY45K").await.unwrap();
        assert_eq!(
            ac.trail,
            vec![TrailPoint(1.0, 2.0), TrailPoint(1.5, 2.5), TrailPoint(1.0, 2.0)]
        );
        assert_eq!(ac.last_position(), Some(TrailPoint(1.0, 2.0)));
    }

    #[tokio::test]
    async fn test_trail_length_never_decreases() {
        let store = TrailStore::new();
        let positions = [(1.0, 1.0), (1.0, 1.0), (1.1, 1.0), (1.1, 1.0), (1.2, 1.1), (1.1, 1.0)];
        let mut last_len = 0;
        for (i, &(lat, lon)) in positions.iter().enumerate() {
            let outcome = store.update(&record("DLH4AB", 30000 + i as u64, lat, lon)).await;
            assert!(outcome.trail_len >= last_len);
            last_len = outcome.trail_len;
        }
        assert_eq!(last_len, 4);
        assert_eq!(store.get("DLH4AB").await.unwrap().altitude, 30005);
    }

    #[tokio::test]
    async fn test_latitude_only_change_is_appended() {
        let store = TrailStore::new();
        store.update(&record("KLM1", 1000, 52.0, 4.0)).await;
        let outcome = store.update(&record("KLM1", 1000, 52.0, 4.1)).await;
        assert!(outcome.appended);
        assert_eq!(outcome.trail_len, 2);
    }

    #[tokio::test]
    async fn test_snapshot_order_and_isolation() {
        let store = TrailStore::new();
        store.update(&record("CCC", 1, 3.0, 3.0)).await;
        store.update(&record("AAA", 1, 1.0, 1.0)).await;
        store.update(&record("BBB", 1, 2.0, 2.0)).await;
        store.update(&record("AAA", 2, 1.5, 1.5)).await;

        let snap = store.snapshot().await;
        let flights: Vec<&str> = snap.iter().map(|a| a.flight.as_str()).collect();
        assert_eq!(flights, vec!["CCC", "AAA", "BBB"]);
        assert_eq!(snap[1].trail.len(), 2);

        // Later updates do not leak into an earlier snapshot
        store.update(&record("AAA", 3, 1.6, 1.6)).await;
        assert_eq!(snap[1].trail.len(), 2);
        assert_eq!(snap[1].altitude, 2);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_completed_update() {
        let store = TrailStore::new();
        store.update(&record("BAW123", 35000, 51.47, -0.4543)).await;
        store.update(&record("BAW123", 36000, 51.48, -0.4543)).await;

        let snap = store.snapshot().await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].altitude, 36000);
        assert_eq!(snap[0].trail.last(), Some(&TrailPoint(51.48, -0.4543)));
    }

    #[tokio::test]
    async fn test_concurrent_updates_and_snapshots() {
        let store = Arc::new(TrailStore::new());
        let mut handles = Vec::new();

        for w in 0..4u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 0..100u64 {
                    let flight = format!("W{}", w);
                    store.update(&record(&flight, i, i as f64, w as f64)).await;
                }
            }));
        }

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..50 {
                    for ac in store.snapshot().await {
                        // altitude and trail come from the same update
                        assert_eq!(ac.trail.len() as u64, ac.altitude + 1);
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for h in handles {
            h.await.unwrap();
        }
        reader.await.unwrap();

        let snap = store.snapshot().await;
        assert_eq!(snap.len(), 4);
        assert!(snap.iter().all(|ac| ac.trail.len() == 100 && ac.altitude == 99));
    }

    #[test]
    fn test_state_serialization() {
        let ac = AircraftState {
            flight: "BAW123".to_string(),
            hex: "4840D6".to_string(),
            altitude: 35000,
            speed: 450,
            trail: vec![TrailPoint(51.47, -0.4543)],
        };
        let json = serde_json::to_value(&ac).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "flight": "BAW123",
                "hex": "4840D6",
                "altitude": 35000,
                "speed": 450,
                "trail": [[51.47, -0.4543]],
            })
        );
    }
}
