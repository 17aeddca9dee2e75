//! Instance bookkeeping for the reconciler.
//!
//! Instances live in an ordered arena keyed by a monotonically increasing
//! sequence number, so iteration follows construction order. Each type
//! keeps an index from relation identity to sequence number.
//!
//! ```text
//! entries: BTreeMap<seq, Entry>        construction order
//! types[i]: TypeIndex
//!   ├── singleton: Option<seq>
//!   ├── by_relation: HashMap<Relation, seq>
//!   └── failed: HashSet<Relation>      not retried while still listed
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tessera_component::{Component, PendingComponent};
use tessera_types::Relation;

/// Instance state inside one registry slot.
pub(crate) enum Slot {
    /// Constructed asynchronously; not awaited yet.
    Pending(PendingComponent),
    /// Being awaited by a pass.
    Resolving,
    /// Usable instance.
    Live(Arc<dyn Component>),
}

pub(crate) struct Entry {
    pub(crate) type_idx: usize,
    pub(crate) relation: Option<Relation>,
    pub(crate) slot: Slot,
    pub(crate) initialized: bool,
}

impl Entry {
    pub(crate) fn live(&self) -> Option<&Arc<dyn Component>> {
        match &self.slot {
            Slot::Live(component) => Some(component),
            _ => None,
        }
    }
}

#[derive(Default)]
struct TypeIndex {
    singleton: Option<u64>,
    singleton_failed: bool,
    by_relation: HashMap<Relation, u64>,
    failed: HashSet<Relation>,
}

/// Result of comparing a type's instances with its current relation list.
pub(crate) struct Diff {
    /// Entries whose relation disappeared, already unregistered.
    pub(crate) stale: Vec<Entry>,
    /// Listed relations with neither an instance nor a failure record.
    pub(crate) missing: Vec<Relation>,
}

#[derive(Default)]
pub(crate) struct Registry {
    entries: BTreeMap<u64, Entry>,
    types: Vec<TypeIndex>,
    next_seq: u64,
}

impl Registry {
    pub(crate) fn new(type_count: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            types: (0..type_count).map(|_| TypeIndex::default()).collect(),
            next_seq: 0,
        }
    }

    pub(crate) fn insert(&mut self, type_idx: usize, relation: Option<Relation>, slot: Slot) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        let index = &mut self.types[type_idx];
        match &relation {
            Some(r) => {
                index.by_relation.insert(r.clone(), seq);
            }
            None => index.singleton = Some(seq),
        }

        self.entries.insert(
            seq,
            Entry {
                type_idx,
                relation,
                slot,
                initialized: false,
            },
        );
        seq
    }

    /// Unregisters an entry and returns it.
    pub(crate) fn remove(&mut self, seq: u64) -> Option<Entry> {
        let entry = self.entries.remove(&seq)?;
        let index = &mut self.types[entry.type_idx];
        match &entry.relation {
            Some(r) => {
                index.by_relation.remove(r);
            }
            None => index.singleton = None,
        }
        Some(entry)
    }

    /// Records a construction failure so the relation is not retried
    /// while it stays listed.
    pub(crate) fn mark_failed(&mut self, type_idx: usize, relation: Option<&Relation>) {
        let index = &mut self.types[type_idx];
        match relation {
            Some(r) => {
                index.failed.insert(r.clone());
            }
            None => index.singleton_failed = true,
        }
    }

    pub(crate) fn has_singleton(&self, type_idx: usize) -> bool {
        let index = &self.types[type_idx];
        index.singleton.is_some() || index.singleton_failed
    }

    /// Compares a type's instances with `listed` and unregisters the stale
    /// ones.
    ///
    /// Failure records of relations no longer listed are dropped, which
    /// makes them eligible again when they come back.
    pub(crate) fn diff(&mut self, type_idx: usize, listed: &[Relation]) -> Diff {
        let wanted: HashSet<&Relation> = listed.iter().collect();
        let index = &mut self.types[type_idx];

        index.failed.retain(|r| wanted.contains(r));

        let stale_seqs: Vec<u64> = index
            .by_relation
            .iter()
            .filter(|(r, _)| !wanted.contains(r))
            .map(|(_, seq)| *seq)
            .collect();

        let mut seen = HashSet::new();
        let missing = listed
            .iter()
            .filter(|r| seen.insert(*r))
            .filter(|r| !index.by_relation.contains_key(*r) && !index.failed.contains(*r))
            .cloned()
            .collect();

        let mut stale: Vec<(u64, Entry)> = stale_seqs
            .into_iter()
            .filter_map(|seq| self.remove(seq).map(|e| (seq, e)))
            .collect();
        stale.sort_by_key(|(seq, _)| *seq);

        Diff {
            stale: stale.into_iter().map(|(_, e)| e).collect(),
            missing,
        }
    }

    /// Sequence numbers of entries not yet initialized, in order.
    pub(crate) fn uninitialized(&self) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.initialized)
            .map(|(seq, _)| *seq)
            .collect()
    }

    pub(crate) fn get_mut(&mut self, seq: u64) -> Option<&mut Entry> {
        self.entries.get_mut(&seq)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Empties the registry, returning every entry in order.
    pub(crate) fn drain(&mut self) -> Vec<Entry> {
        for index in &mut self.types {
            *index = TypeIndex::default();
        }
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
