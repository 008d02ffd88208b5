//! Authoritative in-memory train collection.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    batch::{self, BatchReport, EditableField},
    error::{StoreError, UpdateError},
    filter::{self, FilterParams},
    models::{Country, Train},
};

/// One field change recorded by [`TrainStore::update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Field name in wire form.
    pub field: String,
    /// Value before the update.
    pub old: Option<String>,
    /// Value after the update.
    pub new: Option<String>,
    /// When the update was applied.
    pub at: DateTime<Utc>,
}

/// Aggregate counts for the dashboard header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// All records.
    pub total: usize,
    /// Records marked completed.
    pub completed: usize,
    /// Records not yet completed.
    pub pending: usize,
    /// Records carrying at least one proposed change.
    pub with_changes: usize,
}

/// Shared handle to the train collection.
///
/// Clones share the same data. Records are replaced wholesale by id and
/// never removed.
#[derive(Clone)]
pub struct TrainStore {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    trains: Vec<Train>,
    history: HashMap<String, Vec<ChangeRecord>>,
}

impl TrainStore {
    /// Build a store, rejecting collections with duplicate ids.
    pub fn new(trains: Vec<Train>) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(trains.len());
        for train in &trains {
            if !seen.insert(train.id.as_str()) {
                return Err(StoreError::DuplicateId(train.id.clone()));
            }
        }

        Ok(Self {
            inner: Arc::new(RwLock::new(Inner {
                trains,
                history: HashMap::new(),
            })),
        })
    }

    /// Snapshot of every record in collection order.
    pub fn all(&self) -> Vec<Train> {
        self.inner.read().trains.clone()
    }

    /// Current record for `id`.
    pub fn get(&self, id: &str) -> Option<Train> {
        self.inner
            .read()
            .trains
            .iter()
            .find(|train| train.id == id)
            .cloned()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.read().trains.len()
    }

    /// Whether the collection holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.read().trains.is_empty()
    }

    /// Replace the record with the same id, recording changed fields.
    pub fn update(&self, train: Train) -> Result<(), UpdateError> {
        let mut inner = self.inner.write();
        let Some(index) = inner.trains.iter().position(|existing| existing.id == train.id) else {
            return Err(UpdateError::NotFound(train.id));
        };

        let changes = diff(&inner.trains[index], &train, Utc::now());
        debug!(train = %train.id, changes = changes.len(), "Train updated");
        if !changes.is_empty() {
            inner
                .history
                .entry(train.id.clone())
                .or_default()
                .extend(changes);
        }
        inner.trains[index] = train;
        Ok(())
    }

    /// Recorded changes for `id`, newest first.
    pub fn history(&self, id: &str) -> Vec<ChangeRecord> {
        self.inner
            .read()
            .history
            .get(id)
            .map(|records| records.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Filtered and sorted view of the collection.
    pub fn query(&self, params: &FilterParams) -> Vec<Train> {
        let inner = self.inner.read();
        filter::filter_trains(&inner.trains, params)
    }

    /// Apply `field = value` to every selected id through [`TrainStore::update`].
    pub fn batch_update(&self, selected: &[String], field: EditableField, value: &str) -> BatchReport {
        let snapshot = self.all();
        batch::batch_update(&snapshot, selected, field, value, |train| self.update(train))
    }

    /// Distinct countries present, in display order.
    pub fn countries(&self) -> Vec<Country> {
        let inner = self.inner.read();
        let set: BTreeSet<Country> = inner.trains.iter().map(|train| train.country).collect();
        set.into_iter().collect()
    }

    /// Distinct station names from `from` and `to`, in collation order.
    pub fn stations(&self) -> Vec<String> {
        let inner = self.inner.read();
        let set: BTreeSet<&str> = inner
            .trains
            .iter()
            .flat_map(|train| [train.from.as_deref(), train.to.as_deref()])
            .flatten()
            .collect();
        let mut stations: Vec<String> = set.into_iter().map(str::to_string).collect();
        stations.sort_by(|a, b| filter::collate(a, b));
        stations
    }

    /// Completion and pending-change counts.
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read();
        let completed = inner.trains.iter().filter(|train| train.completed).count();
        StoreStats {
            total: inner.trains.len(),
            completed,
            pending: inner.trains.len() - completed,
            with_changes: inner
                .trains
                .iter()
                .filter(|train| train.has_pending_changes())
                .count(),
        }
    }
}

fn diff(before: &Train, after: &Train, at: DateTime<Utc>) -> Vec<ChangeRecord> {
    let fields: [(&str, Option<String>, Option<String>); 15] = [
        ("operator", Some(before.operator.clone()), Some(after.operator.clone())),
        ("country", Some(before.country.to_string()), Some(after.country.to_string())),
        ("from", before.from.clone(), after.from.clone()),
        ("to", before.to.clone(), after.to.clone()),
        ("arrivalTime", before.arrival_time.clone(), after.arrival_time.clone()),
        ("track", before.track.clone(), after.track.clone()),
        ("otn", before.otn.clone(), after.otn.clone()),
        ("notes", before.notes.clone(), after.notes.clone()),
        (
            "announcedTrainNumber",
            before.announced_train_number.clone(),
            after.announced_train_number.clone(),
        ),
        ("newTime", before.new_time.clone(), after.new_time.clone()),
        ("newTrack", before.new_track.clone(), after.new_track.clone()),
        ("newOperator", before.new_operator.clone(), after.new_operator.clone()),
        ("newNotes", before.new_notes.clone(), after.new_notes.clone()),
        (
            "completed",
            Some(before.completed.to_string()),
            Some(after.completed.to_string()),
        ),
        (
            "highlighted",
            Some(before.highlighted.to_string()),
            Some(after.highlighted.to_string()),
        ),
    ];

    fields
        .into_iter()
        .filter(|(_, old, new)| old != new)
        .map(|(field, old, new)| ChangeRecord {
            field: field.to_string(),
            old,
            new,
            at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::StatusFilter;

    fn store() -> TrainStore {
        let mut a = Train::new("1", "SJ", Country::SE);
        a.from = Some("Uppsala C".to_string());
        a.to = Some("Stockholm C".to_string());
        let mut b = Train::new("2", "VY", Country::NO);
        b.from = Some("Oslo S".to_string());
        b.completed = true;
        let mut c = Train::new("3", "DSB", Country::DK);
        c.to = Some("Örebro C".to_string());
        c.new_track = Some("7".to_string());
        TrainStore::new(vec![a, b, c]).expect("unique ids")
    }

    #[test]
    fn rejects_duplicate_ids() {
        let trains = vec![
            Train::new("1", "SJ", Country::SE),
            Train::new("1", "VY", Country::NO),
        ];
        assert_eq!(
            TrainStore::new(trains).err(),
            Some(StoreError::DuplicateId("1".to_string()))
        );
    }

    #[test]
    fn update_replaces_record_and_records_history() {
        let store = store();
        let mut train = store.get("1").expect("train exists");
        train.track = Some("3".to_string());
        train.completed = true;
        store.update(train).expect("update succeeds");

        let stored = store.get("1").expect("train exists");
        assert_eq!(stored.track.as_deref(), Some("3"));
        assert!(stored.completed);

        let history = store.history("1");
        assert_eq!(history.len(), 2);
        let fields: Vec<&str> = history.iter().map(|record| record.field.as_str()).collect();
        assert!(fields.contains(&"track"));
        assert!(fields.contains(&"completed"));
        assert!(store.history("2").is_empty());
    }

    #[test]
    fn unchanged_update_records_nothing() {
        let store = store();
        let train = store.get("2").expect("train exists");
        store.update(train).expect("update succeeds");
        assert!(store.history("2").is_empty());
    }

    #[test]
    fn update_unknown_id_fails() {
        let store = store();
        let result = store.update(Train::new("99", "SJ", Country::SE));
        assert_eq!(result, Err(UpdateError::NotFound("99".to_string())));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn batch_update_goes_through_store() {
        let store = store();
        let selected = vec!["1".to_string(), "3".to_string(), "missing".to_string()];
        let report = store.batch_update(&selected, EditableField::Track, "5");

        assert_eq!(report.updated(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(store.get("1").and_then(|t| t.track), Some("5".to_string()));
        assert_eq!(store.get("3").and_then(|t| t.track), Some("5".to_string()));
        assert_eq!(store.get("2").and_then(|t| t.track), None);
        assert_eq!(store.history("3")[0].field, "track");
    }

    #[test]
    fn query_and_lookups() {
        let store = store();
        let pending = store.query(&FilterParams::default().with_status(StatusFilter::Pending));
        assert_eq!(pending.len(), 2);

        assert_eq!(store.countries(), vec![Country::SE, Country::NO, Country::DK]);
        assert_eq!(store.stations(), vec!["Örebro C", "Oslo S", "Stockholm C", "Uppsala C"]);

        let stats = store.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.with_changes, 1);
    }

    #[test]
    fn clones_share_state() {
        let store = store();
        let handle = store.clone();
        let mut train = handle.get("2").expect("train exists");
        train.notes = Some("Signal fault".to_string());
        handle.update(train).expect("update succeeds");
        assert_eq!(
            store.get("2").and_then(|t| t.notes),
            Some("Signal fault".to_string())
        );
    }
}
