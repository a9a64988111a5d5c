//! Entrées de la file : une demande de chanson = un créneau dans l'ordre de passage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifiant stable d'une entrée, attribué par le store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntryId {
    fn from(value: i64) -> Self {
        EntryId(value)
    }
}

/// Métadonnées du morceau, opaques pour l'algorithme de planification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub title: String,
    pub artist: Option<String>,
    /// Référence vers le média (chemin, URL, clé de catalogue...)
    pub media: Option<String>,
    pub duration_secs: Option<u32>,
}

impl EntryMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Demande soumise par un participant, avant priorité et position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    /// Nom affiché du chanteur
    pub requester_name: String,
    /// Identité de la soumission (appareil, session...)
    pub requester_id: String,
    pub metadata: EntryMetadata,
}

impl EntryDraft {
    pub fn new(
        requester_name: impl Into<String>,
        requester_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            requester_name: requester_name.into(),
            requester_id: requester_id.into(),
            metadata: EntryMetadata::new(title),
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.metadata.artist = Some(artist.into());
        self
    }

    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.metadata.media = Some(media.into());
        self
    }

    pub fn with_duration_secs(mut self, secs: u32) -> Self {
        self.metadata.duration_secs = Some(secs);
        self
    }
}

/// Une entrée persistée de la file
///
/// `position` est 1-based ; entre deux opérations, les positions de toutes
/// les entrées forment exactement `1..=N`. `priority` : plus bas = plus tôt,
/// jamais sous [`crate::PRIORITY_FLOOR`] après une régression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub position: u32,
    pub priority: f64,
    pub regression_count: u32,
    pub requester_name: String,
    pub requester_id: String,
    pub metadata: EntryMetadata,
    pub requested_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Construit une entrée à partir d'un brouillon (position non attribuée)
    pub fn from_draft(id: EntryId, draft: &EntryDraft, priority: f64) -> Self {
        Self {
            id,
            position: 0,
            priority,
            regression_count: 0,
            requester_name: draft.requester_name.clone(),
            requester_id: draft.requester_id.clone(),
            metadata: draft.metadata.clone(),
            requested_at: Utc::now(),
        }
    }
}
