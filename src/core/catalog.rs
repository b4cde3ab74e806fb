//! Fixture catalog store
//!
//! The catalog is a flat CSV file with one row per
//! (fixture, accessory, parameter). Loading groups the rows back into
//! accessories; saving a fixture rewrites the file so that rows for every
//! other fixture survive untouched and the saved fixture's rows are
//! replaced wholesale.

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{StoreError, StoreResult};
use crate::entities::column::CATALOG_HEADER;
use crate::entities::fixture::{AccessoryRecord, FixtureRecord};

/// Which fields identify an accessory when the catalog is loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogKey {
    /// Accessory number alone, across the whole file
    #[default]
    Accessory,
    /// Fixture number and accessory number together
    FixtureAccessory,
}

impl std::fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogKey::Accessory => write!(f, "accessory"),
            CatalogKey::FixtureAccessory => write!(f, "fixture-accessory"),
        }
    }
}

/// Summary line for the fixture pick-list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    pub number: String,
    pub name: String,
    pub accessories: usize,
    pub parameters: usize,
}

/// One data line of the catalog file, as written
#[derive(Debug, Clone, PartialEq, Eq)]
struct CatalogLine {
    fixture_number: String,
    fixture_name: String,
    accessory_name: String,
    accessory_number: String,
    parameter: String,
    specification: String,
    inspection_instrument: String,
}

/// All accessories known to the catalog, in first-seen order.
///
/// The grouped accessories follow the configured [`CatalogKey`]; the file
/// lines are kept alongside so a fixture can be rebuilt for editing from
/// exactly the rows stored under its number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureCatalog {
    key: CatalogKey,
    accessories: Vec<AccessoryRecord>,
    lines: Vec<CatalogLine>,
}

impl FixtureCatalog {
    pub fn key(&self) -> CatalogKey {
        self.key
    }

    pub fn accessories(&self) -> &[AccessoryRecord] {
        &self.accessories
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    /// Accessories filed under a fixture number
    pub fn accessories_for<'a>(
        &'a self,
        fixture_number: &'a str,
    ) -> impl Iterator<Item = &'a AccessoryRecord> + 'a {
        self.accessories
            .iter()
            .filter(move |a| a.fixture_number == fixture_number)
    }

    /// Distinct fixtures, in the order they first appear in the file
    pub fn fixtures(&self) -> Vec<FixtureSummary> {
        let mut summaries: Vec<FixtureSummary> = Vec::new();
        let mut seen: Vec<(&str, &str)> = Vec::new();
        for line in &self.lines {
            let idx = match summaries.iter().position(|s| s.number == line.fixture_number) {
                Some(idx) => idx,
                None => {
                    summaries.push(FixtureSummary {
                        number: line.fixture_number.clone(),
                        name: line.fixture_name.clone(),
                        accessories: 0,
                        parameters: 0,
                    });
                    summaries.len() - 1
                }
            };
            let pair = (line.fixture_number.as_str(), line.accessory_number.as_str());
            if !seen.contains(&pair) {
                seen.push(pair);
                summaries[idx].accessories += 1;
            }
            summaries[idx].parameters += 1;
        }
        summaries
    }

    /// Rebuild one fixture for editing.
    ///
    /// Only lines stored under `number` are used, whatever the catalog key,
    /// so saving the result never pulls in rows of another fixture that
    /// shares an accessory number.
    pub fn fixture(&self, number: &str) -> Option<FixtureRecord> {
        let mut lines = self
            .lines
            .iter()
            .filter(|l| l.fixture_number == number)
            .peekable();
        let name = lines.peek()?.fixture_name.clone();

        let mut accessories: Vec<AccessoryRecord> = Vec::new();
        for line in lines {
            let idx = match accessories
                .iter()
                .position(|a| a.number == line.accessory_number)
            {
                Some(idx) => idx,
                None => {
                    accessories.push(AccessoryRecord::new(
                        number,
                        name.as_str(),
                        line.accessory_number.as_str(),
                        line.accessory_name.as_str(),
                    ));
                    accessories.len() - 1
                }
            };
            accessories[idx].push_parameter(
                line.parameter.as_str(),
                line.specification.as_str(),
                line.inspection_instrument.as_str(),
            );
        }
        Some(FixtureRecord {
            number: number.to_string(),
            name,
            accessories,
        })
    }

    /// Like [`fixture`](Self::fixture) but fails when the fixture is absent
    pub fn require_fixture(&self, number: &str) -> StoreResult<FixtureRecord> {
        self.fixture(number)
            .ok_or_else(|| StoreError::UnknownFixture(number.to_string()))
    }

    /// Refuse an accessory number already stored under another fixture.
    ///
    /// Only applies when accessories are keyed by number alone; otherwise
    /// the new accessory would be merged into the other fixture on load.
    pub fn check_accessory_free(
        &self,
        fixture_number: &str,
        accessory_number: &str,
    ) -> StoreResult<()> {
        if self.key != CatalogKey::Accessory {
            return Ok(());
        }
        match self
            .lines
            .iter()
            .find(|l| l.accessory_number == accessory_number && l.fixture_number != fixture_number)
        {
            Some(line) => Err(StoreError::DuplicateAccessory {
                fixture: line.fixture_number.clone(),
                accessory: accessory_number.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Reads and rewrites the catalog file
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
    key: CatalogKey,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>, key: CatalogKey) -> Self {
        Self {
            path: path.into(),
            key,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> CatalogKey {
        self.key
    }

    /// Parse the catalog file.
    ///
    /// Rows are grouped by the configured [`CatalogKey`]. The first row seen
    /// for a key fixes the accessory's fixture number, fixture name and
    /// accessory name; later rows for the same key only contribute
    /// parameters. Serial numbers are reassigned 1..n per accessory.
    pub fn load(&self) -> StoreResult<FixtureCatalog> {
        let file = fs::File::open(&self.path).map_err(|e| StoreError::from_io(e, &self.path))?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut catalog = self.empty_catalog();
        for (row_idx, result) in rdr.records().enumerate() {
            let line = row_idx + 2;
            let record = result.map_err(|e| StoreError::from_csv(e, &self.path))?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            if record.len() != CATALOG_HEADER.len() {
                return Err(StoreError::Unexpected(format!(
                    "{} line {}: expected {} fields, found {}",
                    self.path.display(),
                    line,
                    CATALOG_HEADER.len(),
                    record.len()
                )));
            }
            self.absorb(&mut catalog, &record);
        }

        tracing::debug!(
            path = %self.path.display(),
            accessories = catalog.accessories.len(),
            "loaded fixture catalog"
        );
        Ok(catalog)
    }

    /// Load, treating a missing file as an empty catalog
    pub fn load_or_default(&self) -> StoreResult<FixtureCatalog> {
        match self.load() {
            Err(StoreError::NotFound { .. }) => {
                tracing::debug!(path = %self.path.display(), "no catalog yet, starting empty");
                Ok(self.empty_catalog())
            }
            other => other,
        }
    }

    fn empty_catalog(&self) -> FixtureCatalog {
        FixtureCatalog {
            key: self.key,
            ..Default::default()
        }
    }

    fn absorb(&self, catalog: &mut FixtureCatalog, record: &StringRecord) {
        let field = |i: usize| record.get(i).unwrap_or("").to_string();
        let line = CatalogLine {
            fixture_number: field(0),
            fixture_name: field(1),
            accessory_name: field(2),
            accessory_number: field(3),
            parameter: field(4),
            specification: field(5),
            inspection_instrument: field(6),
        };

        let existing = catalog.accessories.iter().position(|a| {
            a.number == line.accessory_number
                && match self.key {
                    CatalogKey::Accessory => true,
                    CatalogKey::FixtureAccessory => a.fixture_number == line.fixture_number,
                }
        });
        let idx = match existing {
            Some(idx) => idx,
            None => {
                catalog.accessories.push(AccessoryRecord::new(
                    line.fixture_number.as_str(),
                    line.fixture_name.as_str(),
                    line.accessory_number.as_str(),
                    line.accessory_name.as_str(),
                ));
                catalog.accessories.len() - 1
            }
        };
        catalog.accessories[idx].push_parameter(
            line.parameter.as_str(),
            line.specification.as_str(),
            line.inspection_instrument.as_str(),
        );
        catalog.lines.push(line);
    }

    /// Replace every stored row of `fixture` with its current contents.
    ///
    /// Rows belonging to other fixtures are copied through in file order.
    /// The new file is staged next to the target and renamed over it, so a
    /// failed write leaves the previous catalog in place.
    pub fn merge_save(&self, fixture: &FixtureRecord) -> StoreResult<usize> {
        fixture.validate_complete()?;

        let kept = self.rows_of_other_fixtures(&fixture.number)?;

        let mut wtr = WriterBuilder::new().from_writer(Vec::new());
        wtr.write_record(CATALOG_HEADER)
            .map_err(|e| StoreError::from_csv(e, &self.path))?;
        for record in &kept {
            wtr.write_record(record)
                .map_err(|e| StoreError::from_csv(e, &self.path))?;
        }
        let mut written = 0;
        for accessory in &fixture.accessories {
            for row in accessory.rows() {
                wtr.write_record([
                    fixture.number.as_str(),
                    fixture.name.as_str(),
                    accessory.name.as_str(),
                    accessory.number.as_str(),
                    row.parameter.as_str(),
                    row.specification.as_str(),
                    row.inspection_instrument.as_str(),
                ])
                .map_err(|e| StoreError::from_csv(e, &self.path))?;
                written += 1;
            }
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| StoreError::Unexpected(e.to_string()))?;

        self.replace_file(&bytes)?;

        tracing::info!(
            fixture = %fixture.number,
            kept = kept.len(),
            written,
            "saved fixture catalog"
        );
        Ok(written)
    }

    /// Existing data rows whose fixture number differs from `fixture_number`
    fn rows_of_other_fixtures(&self, fixture_number: &str) -> StoreResult<Vec<StringRecord>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::from_io(e, &self.path)),
        };
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut kept = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| StoreError::from_csv(e, &self.path))?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            if record.get(0) != Some(fixture_number) {
                kept.push(record);
            }
        }
        Ok(kept)
    }

    fn replace_file(&self, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::from_io(e, parent))?;
            }
        }
        if let Ok(meta) = fs::metadata(&self.path) {
            if meta.permissions().readonly() {
                return Err(StoreError::PermissionDenied {
                    path: self.path.clone(),
                });
            }
        }

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, bytes).map_err(|e| StoreError::from_io(e, &staging))?;
        if let Err(e) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(StoreError::from_io(e, &self.path));
        }
        Ok(())
    }

    /// Write a header-only catalog if none exists yet
    pub fn ensure_exists(&self) -> StoreResult<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        let mut wtr = WriterBuilder::new().from_writer(Vec::new());
        wtr.write_record(CATALOG_HEADER)
            .map_err(|e| StoreError::from_csv(e, &self.path))?;
        let bytes = wtr
            .into_inner()
            .map_err(|e| StoreError::Unexpected(e.to_string()))?;
        self.replace_file(&bytes)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::fixture::ParameterColumn;
    use tempfile::tempdir;

    const HEADER: &str = "Fixture Number,Fixture Name,Accessory Name,Accessory Number,Parameter,Specification,Inspection Instrument";

    /// Build a fixture; parameters are given comma-separated per accessory
    fn fixture(number: &str, name: &str, accessories: &[(&str, &str, &str)]) -> FixtureRecord {
        let mut fixture = FixtureRecord::new(number, name).unwrap();
        for (acc_no, acc_name, params) in accessories {
            let acc = fixture.add_accessory(*acc_no, *acc_name).unwrap();
            for p in params.split(',') {
                acc.push_parameter(p, format!("{} spec", p), "Vernier");
            }
        }
        fixture
    }

    fn data_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let tmp = tempdir().unwrap();
        let store = CatalogStore::new(tmp.path().join("fixture_data.csv"), CatalogKey::Accessory);
        assert!(matches!(store.load(), Err(StoreError::NotFound { .. })));
        assert!(store.load_or_default().unwrap().is_empty());
    }

    #[test]
    fn test_first_save_writes_header_and_rows() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        let store = CatalogStore::new(&path, CatalogKey::Accessory);

        let written = store
            .merge_save(&fixture("F1", "Weld Jig", &[("A1", "Clamp", "Torque,Gap")]))
            .unwrap();
        assert_eq!(written, 2);

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(HEADER));
        assert_eq!(
            lines.next(),
            Some("F1,Weld Jig,Clamp,A1,Torque,Torque spec,Vernier")
        );
        assert_eq!(lines.next(), Some("F1,Weld Jig,Clamp,A1,Gap,Gap spec,Vernier"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_merge_keeps_other_fixtures() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        fs::write(
            &path,
            format!("{}\nF1,Weld Jig,Clamp,A1,Torque,10 Nm,Torque wrench\n", HEADER),
        )
        .unwrap();
        let store = CatalogStore::new(&path, CatalogKey::Accessory);

        store
            .merge_save(&fixture("F2", "Drill Jig", &[("B1", "Bush", "Bore")]))
            .unwrap();

        let lines = data_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "F1,Weld Jig,Clamp,A1,Torque,10 Nm,Torque wrench");
        assert_eq!(lines[1], "F2,Drill Jig,Bush,B1,Bore,Bore spec,Vernier");
    }

    #[test]
    fn test_save_a_then_b_then_a_again_replaces_a() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        let store = CatalogStore::new(&path, CatalogKey::Accessory);

        store
            .merge_save(&fixture("A", "Old", &[("A1", "Clamp", "Torque,Gap")]))
            .unwrap();
        store
            .merge_save(&fixture("B", "Other", &[("B1", "Pin", "Dia")]))
            .unwrap();
        store
            .merge_save(&fixture("A", "New", &[("A9", "Stop", "Height")]))
            .unwrap();

        let lines = data_lines(&path);
        assert_eq!(
            lines,
            vec![
                "B,Other,Pin,B1,Dia,Dia spec,Vernier".to_string(),
                "A,New,Stop,A9,Height,Height spec,Vernier".to_string(),
            ]
        );
    }

    #[test]
    fn test_repeated_identical_saves_are_idempotent() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        let store = CatalogStore::new(&path, CatalogKey::Accessory);
        let f1 = fixture("F1", "Weld Jig", &[("A1", "Clamp", "Torque")]);

        store.merge_save(&f1).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        store.merge_save(&f1).unwrap();
        store.merge_save(&f1).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_incomplete_fixture_is_not_saved() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        let store = CatalogStore::new(&path, CatalogKey::Accessory);

        let mut f1 = fixture("F1", "Weld Jig", &[("A1", "Clamp", "Torque")]);
        f1.accessory_mut("A1").unwrap().add_parameter_row();
        let err = store.merge_save(&f1).unwrap_err();
        assert!(matches!(err, StoreError::IncompleteData { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_groups_by_accessory_number_first_seen_wins() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        fs::write(
            &path,
            format!(
                "{}\n\
                 F1,Weld Jig,Clamp,A1,Torque,10 Nm,Torque wrench\n\
                 F1,Weld Jig Mk2,Clamp B,A1,Gap,0.2 mm,Feeler gauge\n\
                 F2,Drill Jig,Bush,B1,Bore,8 H7,Plug gauge\n",
                HEADER
            ),
        )
        .unwrap();
        let catalog = CatalogStore::new(&path, CatalogKey::Accessory).load().unwrap();

        assert_eq!(catalog.accessories().len(), 2);
        let a1 = &catalog.accessories()[0];
        assert_eq!(a1.fixture_name, "Weld Jig");
        assert_eq!(a1.name, "Clamp");
        assert_eq!(a1.rows().len(), 2);
        assert_eq!(a1.rows()[1].serial, 2);
        assert_eq!(a1.rows()[1].accessory_name, "Clamp");
        assert_eq!(a1.rows()[1].parameter, "Gap");
    }

    #[test]
    fn test_accessory_key_ignores_fixture_label() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        fs::write(
            &path,
            format!(
                "{}\nF1,Weld Jig,Clamp,A1,Torque,10 Nm,Wrench\nF2,Drill Jig,Clamp,A1,Gap,0.2,Gauge\n",
                HEADER
            ),
        )
        .unwrap();

        let by_accessory = CatalogStore::new(&path, CatalogKey::Accessory).load().unwrap();
        assert_eq!(by_accessory.accessories().len(), 1);
        assert_eq!(by_accessory.accessories()[0].fixture_number, "F1");
        assert_eq!(by_accessory.accessories()[0].rows().len(), 2);
        let f2 = by_accessory.fixture("F2").unwrap();
        assert_eq!(f2.accessories.len(), 1);
        assert_eq!(f2.accessories[0].rows().len(), 1);
        assert_eq!(f2.accessories[0].rows()[0].parameter, "Gap");

        let by_pair = CatalogStore::new(&path, CatalogKey::FixtureAccessory)
            .load()
            .unwrap();
        assert_eq!(by_pair.accessories().len(), 2);
        assert_eq!(by_pair.fixture("F2").unwrap().accessories[0].rows()[0].parameter, "Gap");
    }

    #[test]
    fn test_resaving_fixture_with_shared_accessory_is_stable() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        fs::write(
            &path,
            format!(
                "{}\nF1,Weld Jig,Clamp,A1,Torque,10 Nm,Wrench\nF2,Drill Jig,Clamp,A1,Gap,0.2,Gauge\n",
                HEADER
            ),
        )
        .unwrap();
        let store = CatalogStore::new(&path, CatalogKey::Accessory);

        for _ in 0..2 {
            let mut f1 = store.load().unwrap().require_fixture("F1").unwrap();
            assert_eq!(f1.parameter_count(), 1);
            f1.accessory_mut("A1")
                .unwrap()
                .edit_cell(1, ParameterColumn::Specification, "11 Nm")
                .unwrap();
            store.merge_save(&f1).unwrap();

            assert_eq!(
                data_lines(&path),
                vec![
                    "F2,Drill Jig,Clamp,A1,Gap,0.2,Gauge".to_string(),
                    "F1,Weld Jig,Clamp,A1,Torque,11 Nm,Wrench".to_string(),
                ]
            );
        }

        // F2 is now first in the file and owns A1 on load, F1 stays editable
        let catalog = store.load().unwrap();
        assert_eq!(catalog.accessories()[0].fixture_number, "F2");
        assert_eq!(catalog.require_fixture("F1").unwrap().parameter_count(), 1);
        let numbers: Vec<String> = catalog.fixtures().into_iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec!["F2".to_string(), "F1".to_string()]);
    }

    #[test]
    fn test_accessory_number_claimed_by_other_fixture() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        fs::write(
            &path,
            format!("{}\nF1,Weld Jig,Clamp,A1,Torque,10 Nm,Wrench\n", HEADER),
        )
        .unwrap();

        let catalog = CatalogStore::new(&path, CatalogKey::Accessory).load().unwrap();
        assert!(catalog.check_accessory_free("F1", "A1").is_ok());
        assert!(catalog.check_accessory_free("F2", "B1").is_ok());
        match catalog.check_accessory_free("F2", "A1") {
            Err(StoreError::DuplicateAccessory { fixture, accessory }) => {
                assert_eq!(fixture, "F1");
                assert_eq!(accessory, "A1");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let by_pair = CatalogStore::new(&path, CatalogKey::FixtureAccessory)
            .load()
            .unwrap();
        assert!(by_pair.check_accessory_free("F2", "A1").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_catalog_is_left_intact() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        let before = format!("{}\nF1,Weld Jig,Clamp,A1,Torque,10 Nm,Wrench\n", HEADER);
        fs::write(&path, &before).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();

        let store = CatalogStore::new(&path, CatalogKey::Accessory);
        let err = store
            .merge_save(&fixture("F2", "Drill Jig", &[("B1", "Bush", "Bore")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(!tmp.path().join("fixture_data.csv.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directory_blocks_staging() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("data");
        fs::create_dir(&dir).unwrap();
        let path = dir.join("fixture_data.csv");
        let before = format!("{}\nF1,Weld Jig,Clamp,A1,Torque,10 Nm,Wrench\n", HEADER);
        fs::write(&path, &before).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users ignore directory modes
        if fs::write(dir.join(".writable"), b"").is_ok() {
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let store = CatalogStore::new(&path, CatalogKey::Accessory);
        let err = store
            .merge_save(&fixture("F2", "Drill Jig", &[("B1", "Bush", "Bore")]))
            .unwrap_err();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(err, StoreError::PermissionDenied { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(!dir.join("fixture_data.csv.tmp").exists());
    }

    #[test]
    fn test_failed_rename_removes_staging_file() {
        let tmp = tempdir().unwrap();
        // A non-empty directory where the catalog should be cannot be replaced
        let path = tmp.path().join("fixture_data.csv");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep.txt"), "keep").unwrap();

        let store = CatalogStore::new(&path, CatalogKey::Accessory);
        assert!(store.replace_file(HEADER.as_bytes()).is_err());
        assert!(!tmp.path().join("fixture_data.csv.tmp").exists());
        assert_eq!(fs::read_to_string(path.join("keep.txt")).unwrap(), "keep");
    }

    #[test]
    fn test_load_rejects_short_rows() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        fs::write(&path, format!("{}\nF1,Weld Jig,Clamp\n", HEADER)).unwrap();
        let err = CatalogStore::new(&path, CatalogKey::Accessory).load().unwrap_err();
        match err {
            StoreError::Unexpected(msg) => assert!(msg.contains("line 2")),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_quoted_fields_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        let store = CatalogStore::new(&path, CatalogKey::Accessory);
        let mut f1 = FixtureRecord::new("F1", "Jig, welding").unwrap();
        f1.add_accessory("A1", "Clamp \"heavy\"")
            .unwrap()
            .push_parameter("Torque", "10, +/-1", "Wrench");
        store.merge_save(&f1).unwrap();

        let loaded = store.load().unwrap().require_fixture("F1").unwrap();
        assert_eq!(loaded, f1);
    }

    #[test]
    fn test_fixture_summaries_in_first_seen_order() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fixture_data.csv");
        let store = CatalogStore::new(&path, CatalogKey::Accessory);
        store
            .merge_save(&fixture("F2", "Drill Jig", &[("B1", "Bush", "Bore,Depth")]))
            .unwrap();
        store
            .merge_save(&fixture(
                "F1",
                "Weld Jig",
                &[("A1", "Clamp", "Torque"), ("A2", "Pin", "Dia")],
            ))
            .unwrap();

        let summaries = store.load().unwrap().fixtures();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].number, "F2");
        assert_eq!(summaries[0].parameters, 2);
        assert_eq!(summaries[1].accessories, 2);
    }

    #[test]
    fn test_ensure_exists_writes_header_once() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("data").join("fixture_data.csv");
        let store = CatalogStore::new(&path, CatalogKey::Accessory);
        assert!(store.ensure_exists().unwrap());
        assert!(!store.ensure_exists().unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap().trim_end(), HEADER);
        assert!(store.load().unwrap().is_empty());
    }
}
