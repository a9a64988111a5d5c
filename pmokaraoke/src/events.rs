//! Évènements émis après chaque modification validée de la file

use crate::entry::EntryId;
use serde::Serialize;
use std::time::SystemTime;

/// Ce qui vient de changer dans la file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueEventKind {
    Inserted { id: EntryId, position: u32 },
    Resorted { moved: usize, regressed: usize },
    Removed { id: EntryId },
    CurrentChanged { id: Option<EntryId> },
    RegressionChanged { value: f64 },
}

/// Évènement horodaté, diffusé aux abonnés du scheduler
#[derive(Debug, Clone, Serialize)]
pub struct QueueEvent {
    pub kind: QueueEventKind,
    pub timestamp: SystemTime,
}

impl QueueEvent {
    pub(crate) fn now(kind: QueueEventKind) -> Self {
        Self {
            kind,
            timestamp: SystemTime::now(),
        }
    }
}
