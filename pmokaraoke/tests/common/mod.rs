#![allow(dead_code)]

use pmokaraoke::{EntryDraft, EntryId, QueueSnapshot, QueueStore, QueueTransaction};

/// Remplit directement le store : une entrée par ligne, positions 1..=N
pub fn seed<S: QueueStore>(store: &mut S, rows: &[(&str, f64)], current: Option<usize>) -> Vec<EntryId> {
    let mut tx = store.begin().unwrap();
    let mut ids = Vec::with_capacity(rows.len());

    for (i, (name, priority)) in rows.iter().enumerate() {
        let draft = EntryDraft::new(*name, format!("{}-phone", name), format!("Song {}", i + 1));
        let id = tx.create_entry(&draft, *priority).unwrap();
        tx.set_position(id, i as u32 + 1).unwrap();
        ids.push(id);
    }

    if let Some(index) = current {
        tx.set_current_pointer(Some(ids[index])).unwrap();
    }

    tx.commit().unwrap();
    ids
}

pub fn draft(name: &str) -> EntryDraft {
    EntryDraft::new(name, format!("{}-phone", name), format!("{}'s song", name))
}

pub fn order(snapshot: &QueueSnapshot) -> Vec<EntryId> {
    snapshot.entries.iter().map(|entry| entry.id).collect()
}

pub fn assert_contiguous(snapshot: &QueueSnapshot) {
    let mut positions: Vec<u32> = snapshot.entries.iter().map(|e| e.position).collect();
    positions.sort_unstable();
    let expected: Vec<u32> = (1..=snapshot.entries.len() as u32).collect();
    assert_eq!(positions, expected, "positions are not 1..=N");
}
