use crate::record::{roster_order, MemberId, Record};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Every known member keyed by id. The active/inactive split is a filter over
/// one map, so an id can never sit in both partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    source: Option<PathBuf>,
    records: BTreeMap<MemberId, Record>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub inactive_selected: usize,
    pub selected: usize,
    pub unselected: usize,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            records: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, path: impl Into<PathBuf>) {
        self.source = Some(path.into());
    }

    /// Adds a record unless its id is already present, in which case the
    /// rejected record is handed back.
    pub fn insert(&mut self, record: Record) -> Result<(), Record> {
        if self.records.contains_key(&record.id) {
            return Err(record);
        }
        self.records.insert(record.id, record);
        Ok(())
    }

    pub fn get(&self, id: MemberId) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: MemberId) -> Option<&mut Record> {
        self.records.get_mut(&id)
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.values_mut()
    }

    pub fn active(&self) -> impl Iterator<Item = &Record> {
        self.records.values().filter(|record| record.active)
    }

    pub fn inactive(&self) -> impl Iterator<Item = &Record> {
        self.records.values().filter(|record| !record.active)
    }

    pub fn ids(&self) -> BTreeSet<MemberId> {
        self.records.keys().copied().collect()
    }

    pub fn active_ids(&self) -> BTreeSet<MemberId> {
        self.active().map(|record| record.id).collect()
    }

    pub fn inactive_ids(&self) -> BTreeSet<MemberId> {
        self.inactive().map(|record| record.id).collect()
    }

    pub fn eligible_count(&self) -> usize {
        self.active().filter(|record| record.is_eligible()).count()
    }

    pub fn in_roster_order(&self) -> Vec<&Record> {
        let mut ordered: Vec<&Record> = self.records.values().collect();
        ordered.sort_by(|left, right| roster_order(left, right));
        ordered
    }

    pub fn stats(&self) -> RosterStats {
        let mut stats = RosterStats::default();
        for record in self.records.values() {
            stats.total += 1;
            match (record.active, record.has_been_selected()) {
                (true, true) => {
                    stats.active += 1;
                    stats.selected += 1;
                }
                (true, false) => {
                    stats.active += 1;
                    stats.unselected += 1;
                }
                (false, true) => {
                    stats.inactive += 1;
                    stats.inactive_selected += 1;
                }
                (false, false) => stats.inactive += 1,
            }
        }
        stats
    }
}
