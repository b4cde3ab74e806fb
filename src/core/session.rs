//! Measurement session: the in-memory context of one inspection run
//!
//! An operator works through the accessories of one fixture. The accessory
//! currently on screen is the working group; edits to it are held there until
//! they are cached. Opening another accessory while the working group has
//! uncached edits is refused, so the caller has to choose between caching and
//! discarding.

use std::collections::BTreeMap;

use crate::core::catalog::FixtureCatalog;
use crate::core::error::{StoreError, StoreResult};
use crate::core::observation_log::{lookup, AccessoryTemplate, ObservationLog};
use crate::entities::observation::{ObservationGroup, ObservationKey, SessionMeta, Status};

#[derive(Debug, Clone)]
struct WorkingGroup {
    key: ObservationKey,
    group: ObservationGroup,
    dirty: bool,
}

#[derive(Debug, Clone)]
pub struct MeasurementSession {
    meta: SessionMeta,
    fixture_number: String,
    templates: BTreeMap<String, AccessoryTemplate>,
    cache: BTreeMap<ObservationKey, ObservationGroup>,
    working: Option<WorkingGroup>,
}

impl MeasurementSession {
    /// Start a session for one fixture, seeding templates from the catalog
    pub fn start(catalog: &FixtureCatalog, fixture_number: &str, meta: SessionMeta) -> StoreResult<Self> {
        let templates = lookup(catalog, fixture_number);
        if templates.is_empty() {
            return Err(StoreError::UnknownFixture(fixture_number.to_string()));
        }
        Ok(Self {
            meta,
            fixture_number: fixture_number.to_string(),
            templates,
            cache: BTreeMap::new(),
            working: None,
        })
    }

    pub fn meta(&self) -> &SessionMeta {
        &self.meta
    }

    pub fn fixture_number(&self) -> &str {
        &self.fixture_number
    }

    /// Accessory numbers and names available in this session
    pub fn accessories(&self) -> impl Iterator<Item = (&str, &str)> {
        self.templates
            .iter()
            .map(|(number, t)| (number.as_str(), t.accessory_name.as_str()))
    }

    /// Make `accessory` the working group.
    ///
    /// Restores cached observations when there are any, otherwise starts from
    /// the catalog template. Fails with `UnsavedChanges` if the current
    /// working group has edits that were never cached.
    pub fn open(&mut self, accessory: &str) -> StoreResult<&ObservationGroup> {
        if let Some(working) = &self.working {
            if working.dirty && working.key.accessory_number != accessory {
                return Err(StoreError::UnsavedChanges {
                    fixture: working.key.fixture_number.clone(),
                    accessory: working.key.accessory_number.clone(),
                });
            }
            if working.key.accessory_number == accessory {
                return Ok(&self.working_ref()?.group);
            }
        }

        let key = ObservationKey::new(&self.fixture_number, accessory);
        let group = match self.restore(&key) {
            Some(cached) => cached.clone(),
            None => {
                let template = self.templates.get(accessory).ok_or_else(|| {
                    StoreError::UnknownAccessory {
                        fixture: self.fixture_number.clone(),
                        accessory: accessory.to_string(),
                    }
                })?;
                ObservationGroup::new(&template.accessory_name, template.entries.clone())
            }
        };
        tracing::debug!(key = %key, "opened accessory");
        self.working = Some(WorkingGroup {
            key,
            group,
            dirty: false,
        });
        Ok(&self.working_ref()?.group)
    }

    /// The working group, if an accessory is open
    pub fn working(&self) -> Option<&ObservationGroup> {
        self.working.as_ref().map(|w| &w.group)
    }

    pub fn is_dirty(&self) -> bool {
        self.working.as_ref().is_some_and(|w| w.dirty)
    }

    fn working_ref(&self) -> StoreResult<&WorkingGroup> {
        self.working
            .as_ref()
            .ok_or_else(|| StoreError::incomplete("no accessory is open"))
    }

    fn working_mut(&mut self) -> StoreResult<&mut WorkingGroup> {
        self.working
            .as_mut()
            .ok_or_else(|| StoreError::incomplete("no accessory is open"))
    }

    fn entry_mut(&mut self, index: usize) -> StoreResult<(&mut WorkingGroup, usize)> {
        let working = self.working_mut()?;
        if index >= working.group.entries.len() {
            return Err(StoreError::UnknownRow {
                accessory: working.key.accessory_number.clone(),
                serial: index + 1,
            });
        }
        Ok((working, index))
    }

    pub fn set_observation(&mut self, index: usize, value: impl Into<String>) -> StoreResult<()> {
        let (working, idx) = self.entry_mut(index)?;
        working.group.entries[idx].observation = value.into();
        working.dirty = true;
        Ok(())
    }

    pub fn set_remark(&mut self, index: usize, value: impl Into<String>) -> StoreResult<()> {
        let (working, idx) = self.entry_mut(index)?;
        working.group.entries[idx].remark = value.into();
        working.dirty = true;
        Ok(())
    }

    /// Set one row's status; the group status is recomputed from the rows
    pub fn set_row_status(&mut self, index: usize, status: Status) -> StoreResult<()> {
        let (working, idx) = self.entry_mut(index)?;
        working.group.entries[idx].status = Some(status);
        working.group.refresh_status();
        working.dirty = true;
        Ok(())
    }

    /// Flip the group status and stamp it onto every row
    pub fn toggle_status(&mut self) -> StoreResult<Status> {
        let working = self.working_mut()?;
        let status = working.group.status.toggled();
        working.group.status = status;
        for entry in &mut working.group.entries {
            entry.status = Some(status);
        }
        working.dirty = true;
        Ok(status)
    }

    /// Store the working group in the session cache
    pub fn cache(&mut self) -> StoreResult<()> {
        let working = self.working_mut()?;
        working.dirty = false;
        let (key, group) = (working.key.clone(), working.group.clone());
        tracing::debug!(key = %key, rows = group.entries.len(), "cached observations");
        self.cache.insert(key, group);
        Ok(())
    }

    /// Drop uncached edits to the working group
    pub fn discard(&mut self) {
        if let Some(working) = self.working.take() {
            tracing::debug!(key = %working.key, dirty = working.dirty, "discarded working group");
        }
    }

    /// Cached observations for a key
    pub fn restore(&self, key: &ObservationKey) -> Option<&ObservationGroup> {
        self.cache.get(key)
    }

    pub fn cached(&self) -> impl Iterator<Item = (&ObservationKey, &ObservationGroup)> {
        self.cache.iter()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Append every cached group to the log.
    ///
    /// Refuses while the working group has uncached edits. On success the
    /// cache is cleared so the same observations are not submitted twice.
    pub fn submit(&mut self, log: &ObservationLog) -> StoreResult<usize> {
        if let Some(working) = self.working.as_ref().filter(|w| w.dirty) {
            return Err(StoreError::UnsavedChanges {
                fixture: working.key.fixture_number.clone(),
                accessory: working.key.accessory_number.clone(),
            });
        }
        if self.cache.is_empty() {
            return Err(StoreError::incomplete("no observations have been saved"));
        }
        let rows = log.append(&self.meta, self.cache.iter())?;
        self.cache.clear();
        self.working = None;
        Ok(rows)
    }
}
