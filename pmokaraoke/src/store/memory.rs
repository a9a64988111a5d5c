//! Stockage en mémoire, même contrat transactionnel que SQLite

use super::{QueueStore, QueueTransaction};
use crate::entry::{EntryDraft, EntryId, QueueEntry};
use crate::priority::FairnessKey;
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    entries: BTreeMap<EntryId, QueueEntry>,
    last_id: i64,
    current: Option<EntryId>,
    regression_value: Option<f64>,
    counters: HashMap<String, u64>,
}

/// File sans base de données (tests, intégrations légères)
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: MemoryState,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueStore for MemoryStore {
    type Tx<'a> = MemoryTransaction<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>> {
        let work = self.state.clone();
        Ok(MemoryTransaction {
            target: &mut self.state,
            work,
        })
    }
}

/// Travaille sur une copie, remplacée d'un bloc au commit
pub struct MemoryTransaction<'a> {
    target: &'a mut MemoryState,
    work: MemoryState,
}

impl QueueTransaction for MemoryTransaction<'_> {
    fn current_pointer(&self) -> Result<Option<EntryId>> {
        Ok(self.work.current)
    }

    fn set_current_pointer(&mut self, id: Option<EntryId>) -> Result<()> {
        self.work.current = id;
        Ok(())
    }

    fn regression_value(&self) -> Result<Option<f64>> {
        Ok(self.work.regression_value)
    }

    fn set_regression_value(&mut self, value: f64) -> Result<()> {
        self.work.regression_value = Some(value);
        Ok(())
    }

    fn entry(&self, id: EntryId) -> Result<Option<QueueEntry>> {
        Ok(self.work.entries.get(&id).cloned())
    }

    fn load_queue(&self) -> Result<Vec<QueueEntry>> {
        let mut entries: Vec<QueueEntry> = self.work.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    fn count_requests(&self, key: FairnessKey, value: &str) -> Result<u64> {
        Ok(self
            .work
            .entries
            .values()
            .filter(|entry| key.of_entry(entry) == value)
            .count() as u64)
    }

    fn create_entry(&mut self, draft: &EntryDraft, priority: f64) -> Result<EntryId> {
        self.work.last_id += 1;
        let id = EntryId(self.work.last_id);
        self.work
            .entries
            .insert(id, QueueEntry::from_draft(id, draft, priority));
        Ok(id)
    }

    fn set_position(&mut self, id: EntryId, position: u32) -> Result<()> {
        let entry = self
            .work
            .entries
            .get_mut(&id)
            .ok_or(Error::EntryNotFound(id))?;
        entry.position = position;
        Ok(())
    }

    fn update_entries(&mut self, entries: &[QueueEntry]) -> Result<()> {
        for update in entries {
            let entry = self
                .work
                .entries
                .get_mut(&update.id)
                .ok_or(Error::EntryNotFound(update.id))?;
            entry.position = update.position;
            entry.priority = update.priority;
            entry.regression_count = update.regression_count;
        }
        Ok(())
    }

    fn remove_entry(&mut self, id: EntryId) -> Result<bool> {
        Ok(self.work.entries.remove(&id).is_some())
    }

    fn counter(&self, name: &str) -> Result<u64> {
        Ok(self.work.counters.get(name).copied().unwrap_or(0))
    }

    fn bump_counter(&mut self, name: &str) -> Result<u64> {
        let counter = self.work.counters.entry(name.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn commit(self) -> Result<()> {
        *self.target = self.work;
        Ok(())
    }
}
