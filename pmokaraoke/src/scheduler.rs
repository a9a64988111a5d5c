//! Scheduler : point d'entrée unique qui fait évoluer la file
//!
//! Chaque opération qui écrit est une section critique (mutex tokio) et une
//! seule transaction du store : deux `insert` concurrents ne peuvent pas
//! s'entrelacer, et un échec d'écriture n'expose aucun état partiel.

use crate::entry::{EntryDraft, EntryId, QueueEntry};
use crate::events::{QueueEvent, QueueEventKind};
use crate::position::{self, assign_position};
use crate::priority::{compute_priority, FairnessKey};
use crate::resort::{resort, CurrentSlot, ResortReport, DEFAULT_REGRESSION};
use crate::store::{QueueStore, QueueTransaction, PLAYED_COUNTER};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

/// Réglages du scheduler fournis par l'application hôte
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerOptions {
    /// Clé de comptage des demandes par chanteur
    pub fairness_key: FairnessKey,
    /// Décrément de régression utilisé tant que le store n'en définit pas
    pub default_regression: f64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            fairness_key: FairnessKey::default(),
            default_regression: DEFAULT_REGRESSION,
        }
    }
}

/// Résultat d'une insertion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertOutcome {
    pub id: EntryId,
    pub priority: f64,
    pub provisional_position: u32,
    pub final_position: u32,
    pub report: ResortReport,
}

/// Vue cohérente de la file à un instant donné
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSnapshot {
    pub entries: Vec<QueueEntry>,
    pub current: Option<EntryId>,
    pub regression_value: f64,
    pub played: u64,
}

impl QueueSnapshot {
    pub fn current_entry(&self) -> Option<&QueueEntry> {
        let id = self.current?;
        self.entries.iter().find(|entry| entry.id == id)
    }
}

/// Scheduler de la file karaoké, générique sur le stockage
pub struct Scheduler<S: QueueStore> {
    store: Mutex<S>,
    options: SchedulerOptions,
    event_tx: broadcast::Sender<QueueEvent>,
}

impl<S: QueueStore> Scheduler<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, SchedulerOptions::default())
    }

    pub fn with_options(store: S, options: SchedulerOptions) -> Self {
        Self {
            store: Mutex::new(store),
            options,
            event_tx: broadcast::channel(256).0,
        }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Flux des évènements de la file (après commit uniquement)
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, kind: QueueEventKind) {
        // ignoré si personne n'écoute
        let _ = self.event_tx.send(QueueEvent::now(kind));
    }

    fn regression_value_in<T: QueueTransaction>(&self, tx: &T) -> Result<f64> {
        match tx.regression_value()? {
            Some(value) if value.is_finite() && value >= 0.0 => Ok(value),
            Some(value) => {
                warn!(value, "Ignoring invalid regression value");
                Ok(self.options.default_regression)
            }
            None => Ok(self.options.default_regression),
        }
    }

    /// Ajoute une demande et retourne sa position après retri
    pub async fn insert(&self, draft: EntryDraft) -> Result<InsertOutcome> {
        let mut store = self.store.lock().await;
        let mut tx = store.begin()?;

        let regression_value = self.regression_value_in(&tx)?;
        let (mut queue, current) = prepare_queue(&mut tx)?;
        let current_slot = current.as_ref().map(CurrentSlot::of);

        let key = self.options.fairness_key;
        let prior_requests = tx.count_requests(key, key.of_draft(&draft))?;
        let priority = compute_priority(prior_requests, current.as_ref());

        let id = tx.create_entry(&draft, priority)?;
        let max_position = queue.iter().map(|e| e.position).max().unwrap_or(0);
        let provisional_position = assign_position(
            queue.len(),
            max_position,
            current_slot.map(|slot| slot.position),
        );
        tx.set_position(id, provisional_position)?;

        debug!(
            %id,
            singer = %draft.requester_name,
            prior_requests,
            priority,
            provisional_position,
            "Computed placement for new request"
        );

        let created = tx.entry(id)?.ok_or_else(|| {
            Error::InvalidState(format!("entry {} vanished inside its own transaction", id))
        })?;
        queue.push(created);

        let report = resort(&mut queue, current_slot, regression_value);
        tx.update_entries(&changed_entries(&queue, &report))?;

        let final_position = queue
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.position)
            .ok_or_else(|| Error::InvalidState(format!("entry {} lost during resort", id)))?;

        tx.commit()?;
        drop(store);

        info!(
            %id,
            singer = %draft.requester_name,
            title = %draft.metadata.title,
            priority,
            final_position,
            regressed = report.regressed.len(),
            "Song queued"
        );

        self.emit(QueueEventKind::Inserted {
            id,
            position: final_position,
        });
        if report.moved.iter().any(|moved| *moved != id) {
            self.emit(QueueEventKind::Resorted {
                moved: report.moved.len(),
                regressed: report.regressed.len(),
            });
        }

        Ok(InsertOutcome {
            id,
            priority,
            provisional_position,
            final_position,
            report,
        })
    }

    /// Relance le retri sans insertion (après une modification externe)
    pub async fn resort(&self) -> Result<ResortReport> {
        let mut store = self.store.lock().await;
        let mut tx = store.begin()?;

        let regression_value = self.regression_value_in(&tx)?;
        let (mut queue, current) = prepare_queue(&mut tx)?;
        let current_slot = current.as_ref().map(CurrentSlot::of);

        let report = resort(&mut queue, current_slot, regression_value);
        tx.update_entries(&changed_entries(&queue, &report))?;
        tx.commit()?;
        drop(store);

        if !report.is_noop() {
            info!(
                moved = report.moved.len(),
                regressed = report.regressed.len(),
                "Queue resorted"
            );
            self.emit(QueueEventKind::Resorted {
                moved: report.moved.len(),
                regressed: report.regressed.len(),
            });
        }

        Ok(report)
    }

    /// Retire une entrée ; les suivantes remontent d'un cran
    pub async fn remove(&self, id: EntryId) -> Result<bool> {
        let mut store = self.store.lock().await;
        let mut tx = store.begin()?;

        if !tx.remove_entry(id)? {
            return Ok(false);
        }

        if tx.current_pointer()? == Some(id) {
            tx.set_current_pointer(None)?;
        }

        let mut queue = tx.load_queue()?;
        let changed = position::normalize(&mut queue);
        tx.update_entries(&changed)?;
        tx.commit()?;
        drop(store);

        info!(%id, remaining = queue.len(), "Entry removed from queue");
        self.emit(QueueEventKind::Removed { id });

        Ok(true)
    }

    /// Positionne (ou efface) l'entrée en cours de lecture
    pub async fn set_current(&self, id: Option<EntryId>) -> Result<()> {
        let mut store = self.store.lock().await;
        let mut tx = store.begin()?;

        if let Some(id) = id {
            if tx.entry(id)?.is_none() {
                return Err(Error::EntryNotFound(id));
            }
        }

        tx.set_current_pointer(id)?;
        if id.is_some() {
            tx.bump_counter(PLAYED_COUNTER)?;
        }
        tx.commit()?;
        drop(store);

        match id {
            Some(id) => info!(%id, "Now playing"),
            None => info!("Playback stopped"),
        }
        self.emit(QueueEventKind::CurrentChanged { id });

        Ok(())
    }

    /// Passe à l'entrée qui suit l'entrée en cours (ou à la première)
    ///
    /// Retourne `None` en fin de file ; l'entrée en cours ne change pas.
    pub async fn advance(&self) -> Result<Option<QueueEntry>> {
        let mut store = self.store.lock().await;
        let mut tx = store.begin()?;

        let (queue, current) = prepare_queue(&mut tx)?;
        let next = match &current {
            Some(current) => queue
                .iter()
                .find(|entry| entry.position > current.position)
                .cloned(),
            None => queue.first().cloned(),
        };

        let Some(next) = next else {
            tx.commit()?;
            debug!("End of queue reached");
            return Ok(None);
        };

        tx.set_current_pointer(Some(next.id))?;
        tx.bump_counter(PLAYED_COUNTER)?;
        tx.commit()?;
        drop(store);

        info!(id = %next.id, singer = %next.requester_name, position = next.position, "Now playing");
        self.emit(QueueEventKind::CurrentChanged { id: Some(next.id) });

        Ok(Some(next))
    }

    /// Change le décrément de priorité appliqué à chaque déplacement
    pub async fn set_regression_value(&self, value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidSetting(format!(
                "regression value must be a finite, non-negative number (got {})",
                value
            )));
        }

        let mut store = self.store.lock().await;
        let mut tx = store.begin()?;
        tx.set_regression_value(value)?;
        tx.commit()?;
        drop(store);

        info!(value, "Regression value updated");
        self.emit(QueueEventKind::RegressionChanged { value });

        Ok(())
    }

    /// Lecture cohérente de la file et des réglages
    pub async fn snapshot(&self) -> Result<QueueSnapshot> {
        let mut store = self.store.lock().await;
        let tx = store.begin()?;

        let entries = tx.load_queue()?;
        let current = tx
            .current_pointer()?
            .filter(|id| entries.iter().any(|entry| entry.id == *id));
        let regression_value = self.regression_value_in(&tx)?;
        let played = tx.counter(PLAYED_COUNTER)?;

        // lecture seule : la transaction est abandonnée
        drop(tx);

        Ok(QueueSnapshot {
            entries,
            current,
            regression_value,
            played,
        })
    }
}

/// Charge la file, répare les positions si besoin et résout l'entrée en cours
///
/// Un pointeur vers une entrée disparue vaut « rien en cours ».
fn prepare_queue<T: QueueTransaction>(tx: &mut T) -> Result<(Vec<QueueEntry>, Option<QueueEntry>)> {
    let mut queue = tx.load_queue()?;

    if !position::is_contiguous(&queue) {
        let changed = position::normalize(&mut queue);
        warn!(
            size = queue.len(),
            repaired = changed.len(),
            "Queue positions were not contiguous, renumbering in observed order"
        );
        tx.update_entries(&changed)?;
    }

    let current = match tx.current_pointer()? {
        Some(id) => {
            let found = queue.iter().find(|entry| entry.id == id).cloned();
            if found.is_none() {
                warn!(%id, "Current entry no longer exists, treating queue as idle");
            }
            found
        }
        None => None,
    };

    Ok((queue, current))
}

fn changed_entries(queue: &[QueueEntry], report: &ResortReport) -> Vec<QueueEntry> {
    let moved: HashSet<EntryId> = report.moved.iter().copied().collect();
    queue
        .iter()
        .filter(|entry| moved.contains(&entry.id))
        .cloned()
        .collect()
}
