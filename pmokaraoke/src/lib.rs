//! # pmokaraoke - Ordonnancement équitable de la file d'une soirée karaoké
//!
//! Les participants soumettent leurs demandes depuis leurs appareils ; une
//! seule file ordonnée décide de l'ordre de passage, sans DJ.
//!
//! # Architecture
//!
//! - **priority** : priorité d'une nouvelle demande (pénalité par chanson
//!   déjà demandée, jamais meilleure que l'entrée en cours)
//! - **position** : placement provisoire, derrière la fenêtre protégée
//! - **resort** : retri complet par zones et régression des entrées repoussées
//! - **store** : transactions sur la file (SQLite ou mémoire)
//! - **Scheduler** : point d'entrée unique, une section critique par opération
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use pmokaraoke::{EntryDraft, Scheduler, SqliteStore};
//!
//! # #[tokio::main]
//! # async fn main() -> pmokaraoke::Result<()> {
//! let store = SqliteStore::open(std::path::Path::new("queue.db"))?;
//! let scheduler = Scheduler::new(store);
//!
//! let outcome = scheduler
//!     .insert(EntryDraft::new("Alice", "phone-42", "Bohemian Rhapsody").with_artist("Queen"))
//!     .await?;
//! println!("Alice chante en position {}", outcome.final_position);
//!
//! scheduler.advance().await?;
//! # Ok(())
//! # }
//! ```

mod entry;
mod error;
mod events;
mod scheduler;

pub mod position;
pub mod priority;
pub mod resort;
pub mod store;

#[cfg(feature = "pmoconfig")]
mod config_ext;

// Réexports publics
pub use entry::{EntryDraft, EntryId, EntryMetadata, QueueEntry};
pub use error::{Error, Result};
pub use events::{QueueEvent, QueueEventKind};
pub use priority::FairnessKey;
pub use resort::{CurrentSlot, ResortReport, DEFAULT_REGRESSION, PRIORITY_FLOOR, PRIORITY_TOLERANCE};
pub use scheduler::{InsertOutcome, QueueSnapshot, Scheduler, SchedulerOptions};
pub use store::{MemoryStore, QueueStore, QueueTransaction, SqliteStore};

#[cfg(feature = "pmoconfig")]
pub use config_ext::KaraokeConfigExt;
