//! Calcul de priorité d'une nouvelle demande

use crate::entry::{EntryDraft, QueueEntry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Priorité d'un premier passage quand rien n'est en cours
pub const BASE_PRIORITY: f64 = 1.0;

/// Clé utilisée pour compter les demandes d'un même chanteur
///
/// Par défaut le nom affiché : une personne sur deux appareils partage un
/// seul compteur, deux homonymes aussi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairnessKey {
    #[default]
    RequesterName,
    RequesterId,
}

impl FairnessKey {
    /// Valeur de la clé pour un brouillon
    pub fn of_draft<'a>(&self, draft: &'a EntryDraft) -> &'a str {
        match self {
            FairnessKey::RequesterName => &draft.requester_name,
            FairnessKey::RequesterId => &draft.requester_id,
        }
    }

    /// Valeur de la clé pour une entrée existante
    pub fn of_entry<'a>(&self, entry: &'a QueueEntry) -> &'a str {
        match self {
            FairnessKey::RequesterName => &entry.requester_name,
            FairnessKey::RequesterId => &entry.requester_id,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FairnessKey::RequesterName => "name",
            FairnessKey::RequesterId => "requester_id",
        }
    }
}

impl fmt::Display for FairnessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FairnessKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "requester_name" => Ok(FairnessKey::RequesterName),
            "id" | "requester_id" => Ok(FairnessKey::RequesterId),
            other => Err(format!("unknown fairness key '{}'", other)),
        }
    }
}

/// Priorité d'une nouvelle demande
///
/// `prior_requests` est le nombre d'entrées déjà enregistrées pour la même
/// clé d'équité. Le résultat n'est jamais meilleur que la priorité de
/// l'entrée en cours de lecture.
pub fn compute_priority(prior_requests: u64, current: Option<&QueueEntry>) -> f64 {
    let min_priority = current.map(|entry| entry.priority).unwrap_or(BASE_PRIORITY);
    (prior_requests as f64 + 1.0).max(min_priority)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryId;

    fn playing(priority: f64) -> QueueEntry {
        let draft = EntryDraft::new("Zoe", "dev-z", "Song");
        let mut entry = QueueEntry::from_draft(EntryId(1), &draft, priority);
        entry.position = 1;
        entry
    }

    #[test]
    fn test_first_request_gets_base_priority() {
        assert_eq!(compute_priority(0, None), 1.0);
    }

    #[test]
    fn test_repeat_singer_pays_per_request() {
        assert_eq!(compute_priority(1, None), 2.0);
        assert_eq!(compute_priority(4, None), 5.0);
    }

    #[test]
    fn test_current_entry_sets_the_floor() {
        let current = playing(3.5);
        assert_eq!(compute_priority(0, Some(&current)), 3.5);
        assert_eq!(compute_priority(5, Some(&current)), 6.0);
    }

    #[test]
    fn test_regressed_current_entry_does_not_lower_base() {
        let current = playing(0.4);
        assert_eq!(compute_priority(0, Some(&current)), 1.0);
    }

    #[test]
    fn test_fairness_key_parsing() {
        assert_eq!("name".parse::<FairnessKey>(), Ok(FairnessKey::RequesterName));
        assert_eq!(" Requester_ID ".parse::<FairnessKey>(), Ok(FairnessKey::RequesterId));
        assert!("device".parse::<FairnessKey>().is_err());
    }

    #[test]
    fn test_fairness_key_selects_field() {
        let draft = EntryDraft::new("Alice", "phone-1", "Song");
        assert_eq!(FairnessKey::RequesterName.of_draft(&draft), "Alice");
        assert_eq!(FairnessKey::RequesterId.of_draft(&draft), "phone-1");
    }
}
