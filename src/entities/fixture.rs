//! Fixture, accessory and inspection parameter records

use serde::{Deserialize, Serialize};

use crate::core::error::{StoreError, StoreResult};

/// Editable cells of an accessory's parameter grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterColumn {
    Parameter,
    #[value(alias = "spec")]
    Specification,
    #[value(alias = "instrument")]
    InspectionInstrument,
}

impl ParameterColumn {
    pub const ALL: [ParameterColumn; 3] = [
        ParameterColumn::Parameter,
        ParameterColumn::Specification,
        ParameterColumn::InspectionInstrument,
    ];

    /// Column heading as it appears in the catalog file
    pub fn header(&self) -> &'static str {
        match self {
            ParameterColumn::Parameter => "Parameter",
            ParameterColumn::Specification => "Specification",
            ParameterColumn::InspectionInstrument => "Inspection Instrument",
        }
    }
}

impl std::fmt::Display for ParameterColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.header())
    }
}

/// One inspection checkpoint of an accessory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRow {
    /// 1-based position within the owning accessory
    pub serial: usize,
    pub accessory_number: String,
    pub accessory_name: String,
    pub parameter: String,
    pub specification: String,
    pub inspection_instrument: String,
}

impl ParameterRow {
    pub fn get(&self, column: ParameterColumn) -> &str {
        match column {
            ParameterColumn::Parameter => &self.parameter,
            ParameterColumn::Specification => &self.specification,
            ParameterColumn::InspectionInstrument => &self.inspection_instrument,
        }
    }

    fn set(&mut self, column: ParameterColumn, value: String) {
        match column {
            ParameterColumn::Parameter => self.parameter = value,
            ParameterColumn::Specification => self.specification = value,
            ParameterColumn::InspectionInstrument => self.inspection_instrument = value,
        }
    }
}

/// A sub-component of a fixture carrying its own inspection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryRecord {
    pub fixture_number: String,
    pub fixture_name: String,
    pub number: String,
    pub name: String,
    rows: Vec<ParameterRow>,
}

impl AccessoryRecord {
    pub fn new(
        fixture_number: impl Into<String>,
        fixture_name: impl Into<String>,
        number: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            fixture_number: fixture_number.into(),
            fixture_name: fixture_name.into(),
            number: number.into(),
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[ParameterRow] {
        &self.rows
    }

    /// Append a blank parameter row and return its serial number
    pub fn add_parameter_row(&mut self) -> usize {
        let serial = self.rows.len() + 1;
        self.rows.push(ParameterRow {
            serial,
            accessory_number: self.number.clone(),
            accessory_name: self.name.clone(),
            parameter: String::new(),
            specification: String::new(),
            inspection_instrument: String::new(),
        });
        serial
    }

    /// Append a filled-in parameter row and return its serial number
    pub fn push_parameter(
        &mut self,
        parameter: impl Into<String>,
        specification: impl Into<String>,
        inspection_instrument: impl Into<String>,
    ) -> usize {
        let serial = self.add_parameter_row();
        let row = &mut self.rows[serial - 1];
        row.parameter = parameter.into();
        row.specification = specification.into();
        row.inspection_instrument = inspection_instrument.into();
        serial
    }

    /// Overwrite one cell of the parameter grid
    pub fn edit_cell(
        &mut self,
        serial: usize,
        column: ParameterColumn,
        value: impl Into<String>,
    ) -> StoreResult<()> {
        let row = serial
            .checked_sub(1)
            .and_then(|idx| self.rows.get_mut(idx))
            .ok_or_else(|| StoreError::UnknownRow {
                accessory: self.number.clone(),
                serial,
            })?;
        row.set(column, value.into());
        Ok(())
    }

    /// Rename the accessory, keeping every row in step with it
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        for row in &mut self.rows {
            row.accessory_name = self.name.clone();
        }
    }

    /// Fail if any parameter row still has an empty cell
    pub fn validate_complete(&self) -> StoreResult<()> {
        if self.number.trim().is_empty() || self.name.trim().is_empty() {
            return Err(StoreError::incomplete(format!(
                "accessory on fixture '{}' needs both a number and a name",
                self.fixture_number
            )));
        }
        for row in &self.rows {
            if let Some(column) = ParameterColumn::ALL
                .into_iter()
                .find(|c| row.get(*c).trim().is_empty())
            {
                return Err(StoreError::incomplete(format!(
                    "accessory '{}' row {} has no {}",
                    self.number,
                    row.serial,
                    column.header()
                )));
            }
        }
        Ok(())
    }

    /// Re-home the accessory under a fixture
    pub(crate) fn set_fixture(&mut self, number: &str, name: &str) {
        self.fixture_number = number.to_string();
        self.fixture_name = name.to_string();
    }
}

/// A physical test jig and its accessories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub number: String,
    pub name: String,
    pub accessories: Vec<AccessoryRecord>,
}

impl FixtureRecord {
    /// Start a new fixture; both number and name are required
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> StoreResult<Self> {
        let number = number.into();
        let name = name.into();
        if number.trim().is_empty() || name.trim().is_empty() {
            return Err(StoreError::incomplete(
                "enter both the fixture number and name",
            ));
        }
        Ok(Self {
            number,
            name,
            accessories: Vec::new(),
        })
    }

    /// Add an accessory; its number must be unique within this fixture
    pub fn add_accessory(
        &mut self,
        number: impl Into<String>,
        name: impl Into<String>,
    ) -> StoreResult<&mut AccessoryRecord> {
        let number = number.into();
        if self.accessory(&number).is_some() {
            return Err(StoreError::DuplicateAccessory {
                fixture: self.number.clone(),
                accessory: number,
            });
        }
        self.accessories
            .push(AccessoryRecord::new(&self.number, &self.name, number, name));
        let last = self.accessories.len() - 1;
        Ok(&mut self.accessories[last])
    }

    pub fn accessory(&self, number: &str) -> Option<&AccessoryRecord> {
        self.accessories.iter().find(|a| a.number == number)
    }

    pub fn accessory_mut(&mut self, number: &str) -> StoreResult<&mut AccessoryRecord> {
        let fixture = self.number.clone();
        self.accessories
            .iter_mut()
            .find(|a| a.number == number)
            .ok_or_else(|| StoreError::UnknownAccessory {
                fixture,
                accessory: number.to_string(),
            })
    }

    /// Point every accessory back at this fixture's number and name
    pub fn sync_accessories(&mut self) {
        let (number, name) = (self.number.clone(), self.name.clone());
        for accessory in &mut self.accessories {
            accessory.set_fixture(&number, &name);
        }
    }

    /// Validate every accessory before a save
    pub fn validate_complete(&self) -> StoreResult<()> {
        self.accessories
            .iter()
            .try_for_each(AccessoryRecord::validate_complete)
    }

    pub fn parameter_count(&self) -> usize {
        self.accessories.iter().map(|a| a.rows().len()).sum()
    }
}
