// Snapshot exporter
// Writes the trail store as a JSON array, replacing the previous file atomically

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{EMPTY_SNAPSHOT, TMP_SUFFIX};
use crate::error::ExportError;
use crate::trail::AircraftState;

/// Writes snapshots to a fixed path.
///
/// Each export goes to `<path>.tmp` first and is then renamed over the
/// target, so a reader polling the file sees either the old or the new
/// snapshot, never a partial one.
#[derive(Debug, Clone)]
pub struct SnapshotExporter {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl SnapshotExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".");
        tmp_name.push(TMP_SUFFIX);
        let tmp_path = path.with_file_name(tmp_name);
        SnapshotExporter { path, tmp_path }
    }

    /// Target snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the snapshot (what the static server exposes).
    pub fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Seed an empty snapshot if none exists yet. Returns true if one was written.
    pub async fn ensure_exists(&self) -> Result<bool, ExportError> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(false);
        }
        let dir = self.directory();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ExportError::Write { path: dir, source })?;
        self.write_atomic(EMPTY_SNAPSHOT.as_bytes()).await?;
        info!("Created empty snapshot {}", self.path.display());
        Ok(true)
    }

    /// Serialize and write the given states, replacing the previous snapshot.
    pub async fn export(&self, states: &[AircraftState]) -> Result<(), ExportError> {
        let bytes = serde_json::to_vec(states)?;
        self.write_atomic(&bytes).await?;
        debug!("Exported {} aircraft to {}", states.len(), self.path.display());
        Ok(())
    }

    async fn write_atomic(&self, bytes: &[u8]) -> Result<(), ExportError> {
        tokio::fs::write(&self.tmp_path, bytes)
            .await
            .map_err(|source| ExportError::Write {
                path: self.tmp_path.clone(),
                source,
            })?;

        if let Err(source) = tokio::fs::rename(&self.tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&self.tmp_path).await;
            return Err(ExportError::Rename {
                from: self.tmp_path.clone(),
                to: self.path.clone(),
                source,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trail::TrailPoint;
    use tempfile::TempDir;

    fn state(flight: &str, trail: Vec<TrailPoint>) -> AircraftState {
        AircraftState {
            flight: flight.to_string(),
            hex: "4840D6".to_string(),
            altitude: 35000,
            speed: 450,
            trail,
        }
    }

    #[test]
    fn test_paths() {
        let exporter = SnapshotExporter::new("/srv/www/flights.json");
        assert_eq!(exporter.path(), Path::new("/srv/www/flights.json"));
        assert_eq!(exporter.tmp_path, PathBuf::from("/srv/www/flights.json.tmp"));
        assert_eq!(exporter.directory(), PathBuf::from("/srv/www"));

        let bare = SnapshotExporter::new("flights.json");
        assert_eq!(bare.directory(), PathBuf::from("."));
    }

    #[tokio::test]
    async fn test_ensure_exists_seeds_empty_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("web").join("flights.json");
        let exporter = SnapshotExporter::new(&path);

        assert!(exporter.ensure_exists().await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");

        // Existing snapshot is left alone
        std::fs::write(&path, "[{\"flight\":\"X\"}]").unwrap();
        assert!(!exporter.ensure_exists().await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{\"flight\":\"X\"}]");
    }

    #[tokio::test]
    async fn test_export_writes_full_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flights.json");
        let exporter = SnapshotExporter::new(&path);

        let states = vec![
            state("BAW123", vec![TrailPoint(51.47, -0.4543), TrailPoint(51.48, -0.45)]),
            state("EZY45K", vec![]),
        ];
        exporter.export(&states).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["flight"], "BAW123");
        assert_eq!(arr[0]["hex"], "4840D6");
        assert_eq!(arr[0]["altitude"], 35000);
        assert_eq!(arr[0]["speed"], 450);
        assert_eq!(arr[0]["trail"], serde_json::json!([[51.47, -0.4543], [51.48, -0.45]]));
        assert_eq!(arr[1]["flight"], "EZY45K");
        assert_eq!(arr[1]["trail"], serde_json::json!([]));

        // No temporary file left behind
        assert!(!dir.path().join("flights.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_export_overwrites_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flights.json");
        let exporter = SnapshotExporter::new(&path);

        exporter
            .export(&[state("A", vec![]), state("B", vec![]), state("C", vec![])])
            .await
            .unwrap();
        exporter.export(&[state("A", vec![])]).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_export_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let exporter = SnapshotExporter::new(dir.path().join("missing").join("flights.json"));

        let err = exporter.export(&[]).await.unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
    }
}
