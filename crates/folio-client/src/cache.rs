//! Optimistic mutation cache.
//!
//! Every mutation is an explicit state machine: staged against the local
//! cache with a snapshot of what it replaced, then resolved exactly once to
//! committed (server accepted) or rolled back (server rejected, snapshot
//! restored). No ad hoc snapshot juggling at call sites.

use std::collections::HashMap;
use std::hash::Hash;

/// Handle for one staged mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationTicket(u64);

/// Lifecycle of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("no cached entry for that key")]
    UnknownKey,

    #[error("unknown mutation ticket")]
    UnknownMutation,

    #[error("mutation already resolved as {0:?}")]
    AlreadyResolved(MutationState),
}

/// What a rollback needs to undo, per mutation kind.
#[derive(Debug, Clone)]
enum Staged<K, V> {
    Insert { key: K },
    Update { key: K, snapshot: V },
    Delete { key: K, snapshot: V },
}

/// A local cache of server entities supporting optimistic writes.
///
/// This is a UI responsiveness tool, not a consistency mechanism: the
/// server response always decides whether a staged change survives.
pub struct OptimisticCache<K, V> {
    entries: HashMap<K, V>,
    pending: HashMap<u64, Staged<K, V>>,
    resolved: HashMap<u64, MutationState>,
    next_ticket: u64,
}

impl<K, V> Default for OptimisticCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OptimisticCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            pending: HashMap::new(),
            resolved: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Replace the cache contents with server-confirmed data.
    pub fn populate(&mut self, items: impl IntoIterator<Item = (K, V)>) {
        self.entries = items.into_iter().collect();
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// State of a mutation: pending, resolved, or unknown.
    pub fn state(&self, ticket: MutationTicket) -> Option<MutationState> {
        if self.pending.contains_key(&ticket.0) {
            return Some(MutationState::Pending);
        }
        self.resolved.get(&ticket.0).copied()
    }

    fn stage(&mut self, staged: Staged<K, V>) -> MutationTicket {
        let ticket = MutationTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.insert(ticket.0, staged);
        ticket
    }

    /// Optimistically insert a new entry.
    pub fn stage_insert(&mut self, key: K, value: V) -> MutationTicket {
        self.entries.insert(key.clone(), value);
        self.stage(Staged::Insert { key })
    }

    /// Optimistically overwrite an existing entry, snapshotting the old
    /// value for rollback.
    pub fn stage_update(&mut self, key: K, value: V) -> Result<MutationTicket, CacheError> {
        let snapshot = self
            .entries
            .insert(key.clone(), value)
            .ok_or(CacheError::UnknownKey)?;
        Ok(self.stage(Staged::Update { key, snapshot }))
    }

    /// Optimistically remove an entry, snapshotting it for rollback.
    pub fn stage_delete(&mut self, key: &K) -> Result<MutationTicket, CacheError> {
        let snapshot = self.entries.remove(key).ok_or(CacheError::UnknownKey)?;
        Ok(self.stage(Staged::Delete {
            key: key.clone(),
            snapshot,
        }))
    }

    /// Resolve a mutation as accepted. The optimistic value stays; an
    /// optional server echo replaces it (ids, timestamps).
    pub fn commit(
        &mut self,
        ticket: MutationTicket,
        server_value: Option<V>,
    ) -> Result<(), CacheError> {
        let staged = self.take_pending(ticket)?;
        if let Some(value) = server_value {
            let key = match &staged {
                Staged::Insert { key } | Staged::Update { key, .. } => key.clone(),
                Staged::Delete { .. } => {
                    // A confirmed delete has nothing to write back.
                    self.resolved.insert(ticket.0, MutationState::Committed);
                    return Ok(());
                }
            };
            self.entries.insert(key, value);
        }
        self.resolved.insert(ticket.0, MutationState::Committed);
        Ok(())
    }

    /// Resolve a mutation as rejected, restoring the exact pre-mutation
    /// snapshot.
    pub fn rollback(&mut self, ticket: MutationTicket) -> Result<(), CacheError> {
        let staged = self.take_pending(ticket)?;
        match staged {
            Staged::Insert { key } => {
                self.entries.remove(&key);
            }
            Staged::Update { key, snapshot } | Staged::Delete { key, snapshot } => {
                self.entries.insert(key, snapshot);
            }
        }
        self.resolved.insert(ticket.0, MutationState::RolledBack);
        Ok(())
    }

    fn take_pending(&mut self, ticket: MutationTicket) -> Result<Staged<K, V>, CacheError> {
        if let Some(state) = self.resolved.get(&ticket.0) {
            return Err(CacheError::AlreadyResolved(*state));
        }
        self.pending
            .remove(&ticket.0)
            .ok_or(CacheError::UnknownMutation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> OptimisticCache<u32, String> {
        let mut cache = OptimisticCache::new();
        cache.populate([(1, "one".to_string()), (2, "two".to_string())]);
        cache
    }

    #[test]
    fn update_commit_keeps_new_value() {
        let mut cache = seeded();
        let ticket = cache.stage_update(1, "uno".into()).unwrap();
        assert_eq!(cache.get(&1), Some(&"uno".to_string()));
        assert_eq!(cache.state(ticket), Some(MutationState::Pending));

        cache.commit(ticket, None).unwrap();
        assert_eq!(cache.get(&1), Some(&"uno".to_string()));
        assert_eq!(cache.state(ticket), Some(MutationState::Committed));
    }

    #[test]
    fn update_rollback_restores_exact_snapshot() {
        let mut cache = seeded();
        let ticket = cache.stage_update(1, "uno".into()).unwrap();
        cache.rollback(ticket).unwrap();
        assert_eq!(cache.get(&1), Some(&"one".to_string()));
        assert_eq!(cache.state(ticket), Some(MutationState::RolledBack));
    }

    #[test]
    fn delete_rollback_reinserts() {
        let mut cache = seeded();
        let ticket = cache.stage_delete(&2).unwrap();
        assert!(cache.get(&2).is_none());
        cache.rollback(ticket).unwrap();
        assert_eq!(cache.get(&2), Some(&"two".to_string()));
    }

    #[test]
    fn insert_rollback_removes() {
        let mut cache = seeded();
        let ticket = cache.stage_insert(3, "three".into());
        assert_eq!(cache.len(), 3);
        cache.rollback(ticket).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn commit_can_apply_the_server_echo() {
        let mut cache = seeded();
        let ticket = cache.stage_insert(3, "provisional".into());
        cache.commit(ticket, Some("authoritative".into())).unwrap();
        assert_eq!(cache.get(&3), Some(&"authoritative".to_string()));
    }

    #[test]
    fn mutations_resolve_exactly_once() {
        let mut cache = seeded();
        let ticket = cache.stage_update(1, "uno".into()).unwrap();
        cache.commit(ticket, None).unwrap();
        assert_eq!(
            cache.rollback(ticket),
            Err(CacheError::AlreadyResolved(MutationState::Committed))
        );
        assert_eq!(
            cache.commit(ticket, None),
            Err(CacheError::AlreadyResolved(MutationState::Committed))
        );
    }

    #[test]
    fn unknown_key_and_ticket_are_errors() {
        let mut cache = seeded();
        assert_eq!(
            cache.stage_update(99, "x".into()).unwrap_err(),
            CacheError::UnknownKey
        );
        assert_eq!(
            cache.commit(MutationTicket(42), None).unwrap_err(),
            CacheError::UnknownMutation
        );
    }
}
