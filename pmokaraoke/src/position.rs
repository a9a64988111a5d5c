//! Placement provisoire des nouvelles entrées et maintien de `1..=N`

use crate::entry::QueueEntry;

/// Nombre de créneaux à venir protégés contre le retri
pub const PROTECTED_SLOTS: u32 = 3;

/// Écart minimal entre l'entrée en cours et une nouvelle entrée
pub const INSERT_FLOOR_OFFSET: u32 = PROTECTED_SLOTS + 1;

/// Taille de file à partir de laquelle le plancher s'applique
pub const INSERT_FLOOR_MIN_QUEUE: usize = 4;

/// Position provisoire d'une entrée qui vient d'être créée
///
/// `queue_len` et `max_position` décrivent les entrées déjà placées (sans la
/// nouvelle). L'entrée va en fin de file, mais jamais à moins de
/// [`INSERT_FLOOR_OFFSET`] créneaux derrière l'entrée en cours une fois la file
/// suffisamment longue.
pub fn assign_position(queue_len: usize, max_position: u32, current_position: Option<u32>) -> u32 {
    let min_position = match current_position {
        Some(current) if queue_len >= INSERT_FLOOR_MIN_QUEUE => current + INSERT_FLOOR_OFFSET,
        _ => 1,
    };
    min_position.max(max_position + 1)
}

/// Vrai si les positions forment exactement `1..=N`
pub fn is_contiguous(entries: &[QueueEntry]) -> bool {
    let mut positions: Vec<u32> = entries.iter().map(|e| e.position).collect();
    positions.sort_unstable();
    positions
        .iter()
        .enumerate()
        .all(|(i, &p)| p as usize == i + 1)
}

/// Renumérote `1..=N` dans l'ordre observé (position, puis id)
///
/// Retourne les entrées dont la position a changé.
pub fn normalize(entries: &mut [QueueEntry]) -> Vec<QueueEntry> {
    entries.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));

    let mut changed = Vec::new();
    for (i, entry) in entries.iter_mut().enumerate() {
        let expected = i as u32 + 1;
        if entry.position != expected {
            entry.position = expected;
            changed.push(entry.clone());
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryDraft, EntryId};

    fn at(id: i64, position: u32) -> QueueEntry {
        let draft = EntryDraft::new(format!("s{}", id), format!("d{}", id), "Song");
        let mut entry = QueueEntry::from_draft(EntryId(id), &draft, 1.0);
        entry.position = position;
        entry
    }

    #[test]
    fn test_empty_queue_starts_at_one() {
        assert_eq!(assign_position(0, 0, None), 1);
    }

    #[test]
    fn test_appends_without_current() {
        assert_eq!(assign_position(1, 1, None), 2);
        assert_eq!(assign_position(6, 6, None), 7);
    }

    #[test]
    fn test_floor_ignored_on_short_queue() {
        assert_eq!(assign_position(3, 3, Some(1)), 4);
    }

    #[test]
    fn test_floor_behind_current_entry() {
        assert_eq!(assign_position(4, 4, Some(1)), 5);
        assert_eq!(assign_position(4, 4, Some(3)), 7);
        assert_eq!(assign_position(10, 10, Some(2)), 11);
    }

    #[test]
    fn test_contiguity_check() {
        assert!(is_contiguous(&[]));
        assert!(is_contiguous(&[at(2, 2), at(1, 1)]));
        assert!(!is_contiguous(&[at(1, 1), at(2, 3)]));
        assert!(!is_contiguous(&[at(1, 1), at(2, 1)]));
    }

    #[test]
    fn test_normalize_keeps_observed_order() {
        let mut entries = vec![at(3, 7), at(1, 2), at(2, 2), at(4, 0)];
        let changed = normalize(&mut entries);

        let order: Vec<(i64, u32)> = entries.iter().map(|e| (e.id.0, e.position)).collect();
        assert_eq!(order, vec![(4, 1), (1, 2), (2, 3), (3, 4)]);
        assert_eq!(changed.len(), 3);
        assert!(is_contiguous(&entries));
    }
}
