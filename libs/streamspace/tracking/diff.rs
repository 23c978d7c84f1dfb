//! Snapshot diffing
//!
//! Servers push full replacement collections, not deltas. The tracker
//! remembers the last discriminant seen per entity and turns successive
//! snapshots into discrete transitions. The first sighting of an entity only
//! seeds the map, so mounting against a populated collection is silent.

use super::severity::{classify, Priority, Severity};
use crate::feeds::Session;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

/// An entity whose lifecycle can be tracked across snapshots
pub trait Tracked {
    /// Stable identity across snapshots
    fn entity_id(&self) -> &str;

    /// The field whose changes are worth announcing
    fn discriminant(&self) -> &str;

    /// Human-readable name for notifications
    fn label(&self) -> &str {
        self.entity_id()
    }
}

impl Tracked for Session {
    fn entity_id(&self) -> &str {
        &self.name
    }

    fn discriminant(&self) -> &str {
        &self.state
    }
}

/// One observed change of discriminant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub entity_id: String,
    pub label: String,
    pub previous: String,
    pub next: String,
    /// When the snapshot carrying the change was taken
    pub timestamp: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn severity(&self) -> Severity {
        classify(&self.next).0
    }

    pub fn priority(&self) -> Priority {
        classify(&self.next).1
    }
}

#[derive(Debug, Clone)]
struct Entry {
    discriminant: String,
    /// Consecutive snapshots this entity was absent from
    missing: u32,
}

/// Per-consumer diff state over one entity collection
#[derive(Debug)]
pub struct StateDiffTracker<T> {
    entries: HashMap<String, Entry>,
    evict_after_missing: Option<u32>,
    _entity: PhantomData<fn(&T)>,
}

impl<T: Tracked> StateDiffTracker<T> {
    /// Tracker that never evicts
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            evict_after_missing: None,
            _entity: PhantomData,
        }
    }

    /// Tracker that forgets an entity after it is absent from `snapshots`
    /// consecutive snapshots (`None` or `0` disables eviction)
    pub fn with_eviction(snapshots: Option<u32>) -> Self {
        Self {
            entries: HashMap::new(),
            evict_after_missing: snapshots.filter(|n| *n > 0),
            _entity: PhantomData,
        }
    }

    /// Diff one snapshot against the recorded state
    ///
    /// Entities are processed in snapshot order. When an id appears twice in
    /// one snapshot the later occurrence is compared against the earlier one.
    pub fn observe(&mut self, snapshot: &[T]) -> Vec<TransitionEvent> {
        self.observe_at(snapshot, Utc::now())
    }

    /// [`observe`](Self::observe) for a snapshot taken at `taken_at`
    pub fn observe_at(&mut self, snapshot: &[T], taken_at: DateTime<Utc>) -> Vec<TransitionEvent> {
        let mut events = Vec::new();
        let mut seen: HashSet<&str> = HashSet::with_capacity(snapshot.len());

        for entity in snapshot {
            let id = entity.entity_id();
            let current = entity.discriminant();
            seen.insert(id);

            match self.entries.get_mut(id) {
                None => {
                    self.entries.insert(
                        id.to_string(),
                        Entry {
                            discriminant: current.to_string(),
                            missing: 0,
                        },
                    );
                }
                Some(entry) => {
                    entry.missing = 0;
                    if entry.discriminant != current {
                        events.push(TransitionEvent {
                            entity_id: id.to_string(),
                            label: entity.label().to_string(),
                            previous: std::mem::replace(&mut entry.discriminant, current.to_string()),
                            next: current.to_string(),
                            timestamp: taken_at,
                        });
                    }
                }
            }
        }

        if let Some(limit) = self.evict_after_missing {
            self.entries.retain(|id, entry| {
                if seen.contains(id.as_str()) {
                    return true;
                }
                entry.missing += 1;
                entry.missing < limit
            });
        }

        events
    }

    /// Last recorded discriminant for `id`
    pub fn previous(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(|entry| entry.discriminant.as_str())
    }

    /// Drop `id`; if it reappears it is seeded silently
    pub fn forget(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Tracked> Default for StateDiffTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}
