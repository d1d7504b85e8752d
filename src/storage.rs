use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::domain::{Registry, RegistryHeader};

const EVENTS_MARKER: &str = "\n=== CONFIRMATIONS ===\n";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    TomlDecode(toml::de::Error),
    TomlEncode(toml::ser::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::TomlDecode(err) => write!(f, "failed to parse TOML header: {err}"),
            StorageError::TomlEncode(err) => write!(f, "failed to encode TOML header: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse JSONL confirmation: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode JSONL confirmation: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

pub fn load_registry(path: &Path) -> Result<Registry, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Registry::new()),
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(Registry::new());
    }

    let (header_blob, events_blob) = if let Some((header, events)) = raw.split_once(EVENTS_MARKER) {
        (header, events)
    } else {
        (raw.as_str(), "")
    };

    let header: RegistryHeader = toml::from_str(header_blob).map_err(StorageError::TomlDecode)?;
    let mut events = Vec::new();
    for line in events_blob.lines() {
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(line).map_err(StorageError::JsonDecode)?);
    }

    Ok(Registry { header, events })
}

pub fn save_registry(path: &Path, registry: &Registry) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }

    let header = toml::to_string_pretty(&registry.header).map_err(StorageError::TomlEncode)?;
    let mut file = fs::File::create(path).map_err(StorageError::Io)?;
    file.write_all(header.as_bytes())
        .map_err(StorageError::Io)?;
    file.write_all(EVENTS_MARKER.as_bytes())
        .map_err(StorageError::Io)?;

    for event in &registry.events {
        let line = serde_json::to_string(event).map_err(StorageError::JsonEncode)?;
        file.write_all(line.as_bytes()).map_err(StorageError::Io)?;
        file.write_all(b"\n").map_err(StorageError::Io)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use std::fs;
    use std::path::PathBuf;

    use crate::domain::{Frequency, Registry, Role, Treatment};

    use super::{load_registry, save_registry};

    #[test]
    fn round_trips_toml_and_jsonl() {
        let mut registry = Registry::new();
        let patient_id = registry
            .add_user("ana".to_string(), "secret".to_string(), Role::Patient)
            .expect("patient should be created");
        let plan_id = registry
            .add_plan(
                &patient_id,
                "Post-op".to_string(),
                "dr.lopez".to_string(),
                Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            )
            .expect("plan should be created");

        let mut treatment = Treatment::new("Amoxicillin");
        treatment.dose = "500".to_string();
        treatment.frequency = Some(Frequency::Every8h);
        treatment.from = Some("2025-06-01".to_string());
        treatment.to = Some("2025-06-10".to_string());
        registry
            .add_treatment(&plan_id, treatment)
            .expect("treatment should be added");
        registry
            .record_confirmation(
                &plan_id,
                0,
                "2025-06-02",
                "08:30".to_string(),
                Utc.with_ymd_and_hms(2025, 6, 2, 8, 30, 0).unwrap(),
            )
            .expect("confirmation should be recorded");

        let path = temp_file("mediplan_storage_roundtrip.registry");
        save_registry(&path, &registry).expect("save should succeed");
        let loaded = load_registry(&path).expect("load should succeed");

        assert_eq!(loaded.header.users.len(), 1);
        assert_eq!(loaded.header.plans.len(), 1);
        assert_eq!(loaded.header.plans[0].treatments.len(), 1);
        assert_eq!(
            loaded.header.plans[0].treatments[0].frequency,
            Some(Frequency::Every8h)
        );
        assert_eq!(loaded.events.len(), 1);
        assert_eq!(
            loaded.confirmations().time_for(&plan_id, 0, "2025-06-02"),
            Some("08:30")
        );
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_loads_an_empty_registry() {
        let path = temp_file("mediplan_storage_missing.registry");
        let _ = fs::remove_file(&path);
        let loaded = load_registry(&path).expect("load should succeed");
        assert!(loaded.header.users.is_empty());
        assert!(loaded.events.is_empty());
    }

    #[test]
    fn header_without_events_section_still_loads() {
        let mut registry = Registry::new();
        registry
            .add_user("ana".to_string(), "secret".to_string(), Role::Patient)
            .expect("patient should be created");

        let path = temp_file("mediplan_storage_headeronly.registry");
        save_registry(&path, &registry).expect("save should succeed");
        let raw = fs::read_to_string(&path).expect("file should exist");
        let header_only = raw
            .split_once("\n=== CONFIRMATIONS ===\n")
            .map(|(header, _)| header.to_string())
            .expect("marker should be present");
        fs::write(&path, header_only).expect("rewrite should succeed");

        let loaded = load_registry(&path).expect("load should succeed");
        assert_eq!(loaded.header.users.len(), 1);
        assert!(loaded.events.is_empty());
        let _ = fs::remove_file(path);
    }

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }
}
