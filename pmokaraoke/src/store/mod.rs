//! Accès au stockage de la file
//!
//! Le scheduler ne voit le stockage qu'à travers des transactions : tout ce
//! qu'une opération écrit devient visible au `commit()`, et une transaction
//! abandonnée (drop sans commit) ne laisse aucune trace.

mod memory;
mod sqlite;

pub use memory::{MemoryStore, MemoryTransaction};
pub use sqlite::{SqliteStore, SqliteTransaction};

use crate::entry::{EntryDraft, EntryId, QueueEntry};
use crate::priority::FairnessKey;
use crate::Result;

/// Compteur du nombre d'entrées passées en lecture
pub const PLAYED_COUNTER: &str = "played";

/// Un stockage de file capable d'ouvrir des transactions
pub trait QueueStore: Send {
    type Tx<'a>: QueueTransaction
    where
        Self: 'a;

    /// Ouvre une transaction exclusive sur la file
    fn begin(&mut self) -> Result<Self::Tx<'_>>;
}

/// Opérations disponibles à l'intérieur d'une transaction
pub trait QueueTransaction {
    /// Identifiant de l'entrée en cours de lecture
    fn current_pointer(&self) -> Result<Option<EntryId>>;

    fn set_current_pointer(&mut self, id: Option<EntryId>) -> Result<()>;

    /// Décrément de régression configuré, `None` si jamais réglé
    fn regression_value(&self) -> Result<Option<f64>>;

    fn set_regression_value(&mut self, value: f64) -> Result<()>;

    fn entry(&self, id: EntryId) -> Result<Option<QueueEntry>>;

    /// Toutes les entrées, par position puis id
    fn load_queue(&self) -> Result<Vec<QueueEntry>>;

    /// Nombre d'entrées dont la clé d'équité vaut `value`
    fn count_requests(&self, key: FairnessKey, value: &str) -> Result<u64>;

    /// Crée une entrée sans position (0) et retourne son identifiant
    fn create_entry(&mut self, draft: &EntryDraft, priority: f64) -> Result<EntryId>;

    fn set_position(&mut self, id: EntryId, position: u32) -> Result<()>;

    /// Écrit position, priorité et compteur de régression
    fn update_entries(&mut self, entries: &[QueueEntry]) -> Result<()>;

    /// Retourne `false` si l'entrée n'existait pas
    fn remove_entry(&mut self, id: EntryId) -> Result<bool>;

    fn counter(&self, name: &str) -> Result<u64>;

    /// Incrémente un compteur et retourne sa nouvelle valeur
    fn bump_counter(&mut self, name: &str) -> Result<u64>;

    fn commit(self) -> Result<()>;
}
