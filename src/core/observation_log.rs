//! Observation log store
//!
//! The log is append-only: every submission adds one row per observation
//! entry and nothing already written is ever rewritten.

use csv::WriterBuilder;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::catalog::FixtureCatalog;
use crate::core::error::{StoreError, StoreResult};
use crate::entities::column::log_header;
use crate::entities::observation::{ObservationEntry, ObservationGroup, ObservationKey, SessionMeta};

/// Blank observation rows for one accessory, seeded from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryTemplate {
    pub accessory_name: String,
    pub entries: Vec<ObservationEntry>,
}

/// Observation templates for every accessory of a fixture, keyed by accessory number
pub fn lookup(catalog: &FixtureCatalog, fixture_number: &str) -> BTreeMap<String, AccessoryTemplate> {
    catalog
        .accessories_for(fixture_number)
        .map(|acc| {
            let entries = acc
                .rows()
                .iter()
                .map(|row| ObservationEntry {
                    parameter: row.parameter.clone(),
                    specification: row.specification.clone(),
                    inspection_instrument: row.inspection_instrument.clone(),
                    observation: String::new(),
                    remark: String::new(),
                    status: None,
                })
                .collect();
            (
                acc.number.clone(),
                AccessoryTemplate {
                    accessory_name: acc.name.clone(),
                    entries,
                },
            )
        })
        .collect()
}

/// Appends submission batches to the observation log
#[derive(Debug, Clone)]
pub struct ObservationLog {
    path: PathBuf,
}

impl ObservationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append every group, one row per entry.
    ///
    /// Date, machine and operation repeat on every row; the status column
    /// carries the group status. The header is written only when the file
    /// is new. The batch is encoded up front and written in one call.
    pub fn append<'a, I>(&self, meta: &SessionMeta, groups: I) -> StoreResult<usize>
    where
        I: IntoIterator<Item = (&'a ObservationKey, &'a ObservationGroup)>,
    {
        if meta.machine.trim().is_empty() || meta.operation.trim().is_empty() {
            return Err(StoreError::incomplete(
                "machine number and operation are required",
            ));
        }

        let file_exists = self.path.is_file();
        let date = meta.date.format("%Y-%m-%d").to_string();

        let mut wtr = WriterBuilder::new().from_writer(Vec::new());
        if !file_exists {
            wtr.write_record(log_header())
                .map_err(|e| StoreError::from_csv(e, &self.path))?;
        }

        let mut rows = 0;
        for (key, group) in groups {
            if key.fixture_number.trim().is_empty() || key.accessory_number.trim().is_empty() {
                return Err(StoreError::incomplete(
                    "fixture and accessory numbers are required",
                ));
            }
            let status = group.status.as_str();
            for entry in &group.entries {
                wtr.write_record([
                    date.as_str(),
                    meta.machine.as_str(),
                    meta.operation.as_str(),
                    key.fixture_number.as_str(),
                    key.accessory_number.as_str(),
                    group.accessory_name.as_str(),
                    entry.parameter.as_str(),
                    entry.specification.as_str(),
                    entry.inspection_instrument.as_str(),
                    entry.observation.as_str(),
                    entry.remark.as_str(),
                    status,
                ])
                .map_err(|e| StoreError::from_csv(e, &self.path))?;
                rows += 1;
            }
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| StoreError::Unexpected(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::from_io(e, parent))?;
            }
        }
        if let Ok(meta) = std::fs::metadata(&self.path) {
            if meta.permissions().readonly() {
                return Err(StoreError::PermissionDenied {
                    path: self.path.clone(),
                });
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::from_io(e, &self.path))?;
        file.write_all(&bytes)
            .map_err(|e| StoreError::from_io(e, &self.path))?;

        tracing::info!(path = %self.path.display(), rows, date = %date, "appended observations");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{CatalogKey, CatalogStore};
    use crate::entities::fixture::FixtureRecord;
    use crate::entities::observation::Status;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    fn meta() -> SessionMeta {
        SessionMeta {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            machine: "M-07".to_string(),
            operation: "OP20".to_string(),
        }
    }

    fn entry(parameter: &str, observation: &str, status: Option<Status>) -> ObservationEntry {
        ObservationEntry {
            parameter: parameter.to_string(),
            specification: "spec".to_string(),
            inspection_instrument: "Vernier".to_string(),
            observation: observation.to_string(),
            remark: String::new(),
            status,
        }
    }

    #[test]
    fn test_append_to_empty_log_writes_header_and_rows() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("All_Accessories_Data.csv");
        let log = ObservationLog::new(&path);

        let key = ObservationKey::new("F1", "A1");
        let group = ObservationGroup::new(
            "Clamp",
            vec![
                entry("Torque", "10.1", Some(Status::Ok)),
                entry("Gap", "0.21", Some(Status::Ok)),
                entry("Flatness", "0.05", Some(Status::Ok)),
            ],
        );
        let rows = log.append(&meta(), [(&key, &group)]).unwrap();
        assert_eq!(rows, 3);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], log_header().join(","));
        assert_eq!(
            lines[1],
            "2024-03-05,M-07,OP20,F1,A1,Clamp,Torque,spec,Vernier,10.1,,OK"
        );
    }

    #[test]
    fn test_append_never_rewrites_and_header_written_once() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("All_Accessories_Data.csv");
        let log = ObservationLog::new(&path);
        let key = ObservationKey::new("F1", "A1");
        let group = ObservationGroup::new("Clamp", vec![entry("Torque", "10", Some(Status::Ok))]);

        log.append(&meta(), [(&key, &group)]).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        log.append(&meta(), [(&key, &group)]).unwrap();
        let second = fs::read_to_string(&path).unwrap();

        assert!(second.starts_with(&first));
        assert_eq!(second.lines().count(), 3);
        assert_eq!(second.matches("Machine No.").count(), 1);
    }

    #[test]
    fn test_group_status_stamped_on_every_row() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("log.csv");
        let log = ObservationLog::new(&path);
        let key = ObservationKey::new("F1", "A1");
        let mut group = ObservationGroup::new(
            "Clamp",
            vec![
                entry("Torque", "10", Some(Status::Ok)),
                entry("Gap", "0.9", Some(Status::Ok)),
            ],
        );
        group.status = Status::Ng;

        log.append(&meta(), [(&key, &group)]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.lines().skip(1).all(|l| l.ends_with(",NG")));
    }

    #[test]
    fn test_append_requires_session_fields() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("log.csv");
        let log = ObservationLog::new(&path);
        let key = ObservationKey::new("F1", "A1");
        let group = ObservationGroup::new("Clamp", vec![entry("Torque", "10", None)]);

        let mut missing_machine = meta();
        missing_machine.machine.clear();
        let err = log.append(&missing_machine, [(&key, &group)]).unwrap_err();
        assert!(matches!(err, StoreError::IncompleteData { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_lookup_templates_from_catalog() {
        let tmp = tempdir().unwrap();
        let store = CatalogStore::new(tmp.path().join("fixture_data.csv"), CatalogKey::Accessory);
        let mut fixture = FixtureRecord::new("F1", "Weld Jig").unwrap();
        let clamp = fixture.add_accessory("A1", "Clamp").unwrap();
        clamp.push_parameter("Torque", "10 Nm", "Torque wrench");
        clamp.push_parameter("Gap", "0.2 mm", "Feeler gauge");
        fixture
            .add_accessory("A2", "Pin")
            .unwrap()
            .push_parameter("Dia", "6 h7", "Micrometer");
        store.merge_save(&fixture).unwrap();

        let templates = lookup(&store.load().unwrap(), "F1");
        assert_eq!(templates.len(), 2);
        let a1 = &templates["A1"];
        assert_eq!(a1.accessory_name, "Clamp");
        assert_eq!(a1.entries.len(), 2);
        assert_eq!(a1.entries[1].inspection_instrument, "Feeler gauge");
        assert!(a1.entries.iter().all(|e| e.status.is_none() && e.observation.is_empty()));

        assert!(lookup(&store.load().unwrap(), "F9").is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_append_to_read_only_log_keeps_contents() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let path = tmp.path().join("All_Accessories_Data.csv");
        let log = ObservationLog::new(&path);
        let key = ObservationKey::new("F1", "A1");
        let group = ObservationGroup::new("Clamp", vec![entry("Torque", "10", Some(Status::Ok))]);
        log.append(&meta(), [(&key, &group)]).unwrap();
        let before = fs::read_to_string(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();

        let err = log.append(&meta(), [(&key, &group)]).unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn test_append_into_read_only_directory_fails() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("data");
        fs::create_dir(&dir).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users ignore directory modes
        if fs::write(dir.join(".writable"), b"").is_ok() {
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let path = dir.join("All_Accessories_Data.csv");
        let key = ObservationKey::new("F1", "A1");
        let group = ObservationGroup::new("Clamp", vec![entry("Torque", "10", Some(Status::Ok))]);
        let err = ObservationLog::new(&path)
            .append(&meta(), [(&key, &group)])
            .unwrap_err();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(err, StoreError::PermissionDenied { .. }));
        assert!(!path.exists());
    }
}
