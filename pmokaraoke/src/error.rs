//! Types d'erreurs pour pmokaraoke

use crate::entry::EntryId;

/// Erreurs du scheduler de file karaoké
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Queue entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("Invalid queue state: {0}")]
    InvalidState(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Vrai si l'appelant peut rejouer l'opération telle quelle
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::PersistenceError(_))
    }
}

/// Type Result spécialisé pour pmokaraoke
pub type Result<T> = std::result::Result<T, Error>;
