//! Retri complet de la file et régression des entrées repoussées
//!
//! Après chaque insertion, l'ordre est recalculé à partir des priorités en
//! trois zones, découpées selon les positions *avant* le retri :
//!
//! - **zone jouée** : l'entrée en cours et tout ce qui la précède, triée par
//!   priorité ;
//! - **fenêtre protégée** : les [`PROTECTED_SLOTS`] créneaux qui suivent
//!   l'entrée en cours, conservés tels quels (jamais retriés) ;
//! - **zone ouverte** : le reste, triée par priorité.
//!
//! Deux priorités à moins de [`PRIORITY_TOLERANCE`] l'une de l'autre sont
//! considérées égales et gardent leur ordre précédent. Toute entrée dont la
//! nouvelle position est plus loin que l'ancienne régresse : son compteur
//! augmente et sa priorité baisse de la valeur de régression, sans passer
//! sous [`PRIORITY_FLOOR`].

use crate::entry::{EntryId, QueueEntry};
use crate::position::PROTECTED_SLOTS;
use serde::Serialize;

/// Écart de priorité en dessous duquel l'ordre précédent est conservé
pub const PRIORITY_TOLERANCE: f64 = 0.01;

/// Priorité minimale atteignable par régression
pub const PRIORITY_FLOOR: f64 = 0.1;

/// Décrément de priorité par déplacement quand aucun réglage n'existe
pub const DEFAULT_REGRESSION: f64 = 0.1;

/// L'entrée en cours de lecture et sa position avant le retri
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentSlot {
    pub id: EntryId,
    pub position: u32,
}

impl CurrentSlot {
    pub fn of(entry: &QueueEntry) -> Self {
        Self {
            id: entry.id,
            position: entry.position,
        }
    }
}

/// Résultat d'un retri
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResortReport {
    /// Entrées dont la position a changé
    pub moved: Vec<EntryId>,
    /// Entrées repoussées, donc régressées
    pub regressed: Vec<EntryId>,
}

impl ResortReport {
    pub fn is_noop(&self) -> bool {
        self.moved.is_empty() && self.regressed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Settled,
    Protected,
    Open,
}

fn zone_of(entry: &QueueEntry, current: Option<CurrentSlot>) -> Zone {
    let Some(current) = current else {
        return Zone::Open;
    };

    if entry.id == current.id || entry.position <= current.position {
        Zone::Settled
    } else if entry.position <= current.position + PROTECTED_SLOTS {
        Zone::Protected
    } else {
        Zone::Open
    }
}

/// Priorité ramenée à la tolérance : les quasi-égalités tombent dans le même seau
fn priority_bucket(priority: f64) -> i64 {
    (priority / PRIORITY_TOLERANCE).round() as i64
}

/// Tri par (seau de priorité, ancienne position), l'ancienne position étant
/// portée à côté de l'entrée
fn sort_by_priority(group: &mut [(u32, QueueEntry)]) {
    group.sort_by(|(old_a, a), (old_b, b)| {
        priority_bucket(a.priority)
            .cmp(&priority_bucket(b.priority))
            .then(old_a.cmp(old_b))
            .then(a.id.cmp(&b.id))
    });
}

fn regress(entry: &mut QueueEntry, regression_value: f64) {
    entry.regression_count = entry.regression_count.saturating_add(1);
    entry.priority = (entry.priority - regression_value).max(PRIORITY_FLOOR);
}

/// Recalcule toutes les positions de `entries`
///
/// `current` est l'entrée en cours avec sa position avant retri ; sans entrée
/// en cours, toute la file est zone ouverte. En sortie `entries` est rangé
/// par position, numérotée `1..=N`.
pub fn resort(
    entries: &mut Vec<QueueEntry>,
    current: Option<CurrentSlot>,
    regression_value: f64,
) -> ResortReport {
    let mut report = ResortReport::default();
    if entries.is_empty() {
        return report;
    }

    entries.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));

    let mut settled = Vec::new();
    let mut protected = Vec::new();
    let mut open = Vec::new();
    for entry in entries.drain(..) {
        let old_position = entry.position;
        match zone_of(&entry, current) {
            Zone::Settled => settled.push((old_position, entry)),
            Zone::Protected => protected.push((old_position, entry)),
            Zone::Open => open.push((old_position, entry)),
        }
    }

    sort_by_priority(&mut settled);
    sort_by_priority(&mut open);

    // La zone ouverte suit directement la fenêtre : une fenêtre incomplète ne
    // laisse pas de trou dans 1..=N.
    for (index, (old_position, mut entry)) in settled
        .into_iter()
        .chain(protected)
        .chain(open)
        .enumerate()
    {
        entry.position = index as u32 + 1;

        if entry.position != old_position {
            report.moved.push(entry.id);
        }
        if entry.position > old_position {
            regress(&mut entry, regression_value);
            report.regressed.push(entry.id);
        }

        entries.push(entry);
    }

    tracing::debug!(
        size = entries.len(),
        moved = report.moved.len(),
        regressed = report.regressed.len(),
        "Queue resorted"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryDraft;

    fn entry(id: i64, position: u32, priority: f64) -> QueueEntry {
        let draft = EntryDraft::new(format!("singer-{}", id), format!("dev-{}", id), "Song");
        let mut entry = QueueEntry::from_draft(EntryId(id), &draft, priority);
        entry.position = position;
        entry
    }

    fn order(entries: &[QueueEntry]) -> Vec<i64> {
        entries.iter().map(|e| e.id.0).collect()
    }

    fn find(entries: &[QueueEntry], id: i64) -> &QueueEntry {
        entries.iter().find(|e| e.id.0 == id).unwrap()
    }

    fn slot(id: i64, position: u32) -> Option<CurrentSlot> {
        Some(CurrentSlot {
            id: EntryId(id),
            position,
        })
    }

    #[test]
    fn test_empty_queue_is_noop() {
        let mut entries = Vec::new();
        let report = resort(&mut entries, None, DEFAULT_REGRESSION);
        assert!(report.is_noop());
        assert!(entries.is_empty());
    }

    #[test]
    fn test_single_entry_lands_on_one_without_regression() {
        let mut entries = vec![entry(1, 5, 2.0)];
        let report = resort(&mut entries, None, DEFAULT_REGRESSION);

        assert_eq!(entries[0].position, 1);
        assert_eq!(entries[0].regression_count, 0);
        assert_eq!(entries[0].priority, 2.0);
        assert_eq!(report.moved, vec![EntryId(1)]);
        assert!(report.regressed.is_empty());
    }

    #[test]
    fn test_without_current_everything_is_sorted() {
        let mut entries = vec![entry(1, 1, 3.0), entry(2, 2, 1.0), entry(3, 3, 2.0)];
        let report = resort(&mut entries, None, DEFAULT_REGRESSION);

        assert_eq!(order(&entries), vec![2, 3, 1]);
        assert_eq!(report.regressed, vec![EntryId(1)]);
        let first = find(&entries, 1);
        assert_eq!(first.position, 3);
        assert_eq!(first.regression_count, 1);
        assert!((first.priority - 2.9).abs() < 1e-9);
    }

    #[test]
    fn test_new_singer_after_full_window() {
        // A joue, B C D sont protégés, E vient d'arriver en 5
        let mut entries = vec![
            entry(1, 1, 1.0),
            entry(2, 2, 1.0),
            entry(3, 3, 1.0),
            entry(4, 4, 1.0),
            entry(5, 5, 1.0),
        ];
        let report = resort(&mut entries, slot(1, 1), DEFAULT_REGRESSION);

        assert_eq!(order(&entries), vec![1, 2, 3, 4, 5]);
        assert!(report.is_noop());
    }

    #[test]
    fn test_displaced_open_entry_regresses() {
        let mut entries = vec![
            entry(1, 1, 1.0),
            entry(2, 2, 1.0),
            entry(3, 3, 1.0),
            entry(4, 4, 1.0),
            entry(5, 5, 1.0),
            entry(6, 6, 5.0),
            entry(7, 7, 1.0),
        ];
        let report = resort(&mut entries, slot(1, 1), DEFAULT_REGRESSION);

        assert_eq!(order(&entries), vec![1, 2, 3, 4, 5, 7, 6]);
        assert_eq!(report.regressed, vec![EntryId(6)]);

        let bumped = find(&entries, 6);
        assert_eq!(bumped.position, 7);
        assert_eq!(bumped.regression_count, 1);
        assert!((bumped.priority - 4.9).abs() < 1e-9);

        let newcomer = find(&entries, 7);
        assert_eq!(newcomer.position, 6);
        assert_eq!(newcomer.regression_count, 0);
    }

    #[test]
    fn test_protected_window_is_never_sorted() {
        let mut entries = vec![
            entry(1, 1, 1.0),
            entry(2, 2, 9.0),
            entry(3, 3, 5.0),
            entry(4, 4, 7.0),
            entry(5, 5, 0.5),
        ];
        let report = resort(&mut entries, slot(1, 1), DEFAULT_REGRESSION);

        assert_eq!(order(&entries), vec![1, 2, 3, 4, 5]);
        assert!(report.is_noop());
    }

    #[test]
    fn test_settled_zone_is_sorted_by_priority() {
        let mut entries = vec![
            entry(1, 1, 4.0),
            entry(2, 2, 1.0),
            entry(3, 3, 2.0),
            entry(4, 4, 1.0),
        ];
        resort(&mut entries, slot(3, 3), DEFAULT_REGRESSION);

        assert_eq!(order(&entries), vec![2, 3, 1, 4]);
        assert_eq!(find(&entries, 1).regression_count, 1);
        assert_eq!(find(&entries, 4).position, 4);
    }

    #[test]
    fn test_near_ties_keep_previous_order() {
        let mut entries = vec![entry(1, 1, 1.004), entry(2, 2, 1.0), entry(3, 3, 0.98)];
        let report = resort(&mut entries, None, DEFAULT_REGRESSION);

        // 1.004 et 1.0 sont à égalité, 0.98 passe devant
        assert_eq!(order(&entries), vec![3, 1, 2]);
        assert_eq!(report.regressed, vec![EntryId(1), EntryId(2)]);
    }

    #[test]
    fn test_window_shift_regresses_protected_entries() {
        // Deux entrées en position 2 : la zone jouée grossit et décale la fenêtre
        let mut entries = vec![
            entry(1, 1, 1.0),
            entry(2, 2, 1.0),
            entry(9, 2, 1.0),
            entry(3, 3, 1.0),
            entry(4, 4, 1.0),
        ];
        let report = resort(&mut entries, slot(2, 2), DEFAULT_REGRESSION);

        assert_eq!(order(&entries), vec![1, 2, 9, 3, 4]);
        assert_eq!(report.regressed, vec![EntryId(9), EntryId(3), EntryId(4)]);
        assert_eq!(find(&entries, 3).position, 4);
        assert_eq!(find(&entries, 3).regression_count, 1);
    }

    #[test]
    fn test_short_window_leaves_no_hole() {
        // En cours en 3, une seule entrée derrière, nouvelle entrée placée en 7
        let mut entries = vec![
            entry(1, 1, 1.0),
            entry(2, 2, 1.0),
            entry(3, 3, 1.0),
            entry(4, 4, 1.0),
            entry(5, 7, 1.0),
        ];
        let report = resort(&mut entries, slot(3, 3), DEFAULT_REGRESSION);

        let positions: Vec<u32> = entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
        assert_eq!(find(&entries, 5).position, 5);
        assert!(report.regressed.is_empty());
    }

    #[test]
    fn test_priority_never_drops_below_floor() {
        let mut low = entry(1, 1, 0.3);
        for _ in 0..10 {
            regress(&mut low, 0.25);
            assert!(low.priority >= PRIORITY_FLOOR);
        }
        assert_eq!(low.priority, PRIORITY_FLOOR);
        assert_eq!(low.regression_count, 10);
    }

    #[test]
    fn test_second_resort_changes_nothing() {
        let mut entries = vec![
            entry(1, 1, 1.0),
            entry(2, 2, 1.0),
            entry(3, 3, 1.0),
            entry(4, 4, 1.0),
            entry(5, 5, 1.0),
            entry(6, 6, 5.0),
            entry(7, 7, 1.0),
        ];
        resort(&mut entries, slot(1, 1), DEFAULT_REGRESSION);
        let first_pass = entries.clone();

        let report = resort(&mut entries, slot(1, 1), DEFAULT_REGRESSION);
        assert!(report.is_noop());
        assert_eq!(entries, first_pass);
    }
}
