//! Poll store
//!
//! Keyed collection of live polls. The store's lock is the single exclusion
//! point for every read-check-write sequence on polls, including the expiry
//! fire-check.

use super::error::VotingError;
use super::poll::{Poll, PollKey};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared, cloneable handle to the poll map
#[derive(Debug, Clone, Default)]
pub struct PollStore {
    polls: Arc<RwLock<HashMap<PollKey, Poll>>>,
}

impl PollStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new poll. Fails if its key is taken.
    pub fn insert(&self, poll: Poll) -> Result<(), VotingError> {
        let mut polls = self.polls.write();
        if polls.contains_key(poll.key()) {
            return Err(VotingError::DuplicateId(poll.id().to_string()));
        }
        polls.insert(poll.key().clone(), poll);
        Ok(())
    }

    /// Snapshot of a stored poll
    pub fn get(&self, key: &PollKey) -> Result<Poll, VotingError> {
        self.polls
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| VotingError::NotFound(key.id.clone()))
    }

    /// Whether a poll is stored under `key`
    pub fn contains(&self, key: &PollKey) -> bool {
        self.polls.read().contains_key(key)
    }

    /// Run `f` against a stored poll while holding the write lock
    pub fn update<T>(
        &self,
        key: &PollKey,
        f: impl FnOnce(&mut Poll) -> Result<T, VotingError>,
    ) -> Result<T, VotingError> {
        let mut polls = self.polls.write();
        let poll = polls
            .get_mut(key)
            .ok_or_else(|| VotingError::NotFound(key.id.clone()))?;
        f(poll)
    }

    /// Remove a poll. Absent keys are ignored.
    pub fn remove(&self, key: &PollKey) -> Option<Poll> {
        self.polls.write().remove(key)
    }

    /// Remove a poll once `check` accepts it, checked under the same lock
    pub fn remove_checked(
        &self,
        key: &PollKey,
        check: impl FnOnce(&Poll) -> Result<(), VotingError>,
    ) -> Result<Poll, VotingError> {
        let mut polls = self.polls.write();
        match polls.entry(key.clone()) {
            Entry::Occupied(entry) => {
                check(entry.get())?;
                Ok(entry.remove())
            }
            Entry::Vacant(_) => Err(VotingError::NotFound(key.id.clone())),
        }
    }

    /// Remove the entry under `key` only if `pred` holds, checked under the
    /// same lock. `pred` is also called when nothing is stored under `key`.
    pub fn remove_if(
        &self,
        key: &PollKey,
        pred: impl FnOnce(Option<&Poll>) -> bool,
    ) -> Option<Poll> {
        let mut polls = self.polls.write();
        if pred(polls.get(key)) {
            polls.remove(key)
        } else {
            None
        }
    }

    /// IDs of the polls stored for a scope, sorted
    pub fn ids_in_scope(&self, scope: &str) -> Vec<String> {
        let polls = self.polls.read();
        let mut ids: Vec<String> = polls
            .keys()
            .filter(|k| k.scope == scope)
            .map(|k| k.id.clone())
            .collect();
        drop(polls);
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.polls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(id: &str, scope: &str) -> Poll {
        Poll::new(
            PollKey::new(id, scope),
            "owner",
            "Question?",
            vec!["A".to_string(), "B".to_string()],
        )
    }

    #[test]
    fn test_insert_and_get() {
        let store = PollStore::new();
        store.insert(poll("p1", "g1")).unwrap();

        let fetched = store.get(&PollKey::new("p1", "g1")).unwrap();
        assert_eq!(fetched.question(), "Question?");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let store = PollStore::new();
        store.insert(poll("p1", "g1")).unwrap();
        assert_eq!(
            store.insert(poll("p1", "g1")),
            Err(VotingError::DuplicateId("p1".to_string()))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_same_id_different_scope() {
        let store = PollStore::new();
        store.insert(poll("p1", "g1")).unwrap();
        store.insert(poll("p1", "g2")).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_missing() {
        let store = PollStore::new();
        assert_eq!(
            store.get(&PollKey::new("nope", "g1")).unwrap_err(),
            VotingError::NotFound("nope".to_string())
        );
    }

    #[test]
    fn test_update() {
        let store = PollStore::new();
        store.insert(poll("p1", "g1")).unwrap();
        let key = PollKey::new("p1", "g1");

        store.update(&key, |p| p.cast_vote("bob", 1)).unwrap();
        assert_eq!(store.get(&key).unwrap().vote_of("bob"), Some(1));

        let missing = PollKey::new("p2", "g1");
        assert!(store.update(&missing, |p| p.cast_vote("bob", 1)).is_err());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = PollStore::new();
        store.insert(poll("p1", "g1")).unwrap();
        let key = PollKey::new("p1", "g1");

        assert!(store.remove(&key).is_some());
        assert!(store.remove(&key).is_none());
        assert!(store.is_empty());

        // Key can be reused once removed
        store.insert(poll("p1", "g1")).unwrap();
        assert!(store.contains(&key));
    }

    #[test]
    fn test_remove_if() {
        let store = PollStore::new();
        store.insert(poll("p1", "g1")).unwrap();
        let key = PollKey::new("p1", "g1");

        fn evaluated(p: Option<&Poll>) -> bool {
            p.is_some_and(|p| !p.is_active())
        }

        assert!(store.remove_if(&key, evaluated).is_none());
        assert!(store.contains(&key));

        store.update(&key, |p| p.evaluate()).unwrap();
        assert!(store.remove_if(&key, evaluated).is_some());
        assert!(!store.contains(&key));

        let mut seen_missing = false;
        assert!(store
            .remove_if(&key, |p| {
                seen_missing = p.is_none();
                false
            })
            .is_none());
        assert!(seen_missing);
    }

    #[test]
    fn test_remove_checked() {
        let store = PollStore::new();
        store.insert(poll("p1", "g1")).unwrap();
        let key = PollKey::new("p1", "g1");

        let refused = store.remove_checked(&key, |_| Err(VotingError::AlreadyVoted));
        assert_eq!(refused.unwrap_err(), VotingError::AlreadyVoted);
        assert!(store.contains(&key));

        assert!(store.remove_checked(&key, |_| Ok(())).is_ok());
        assert_eq!(
            store.remove_checked(&key, |_| Ok(())).unwrap_err(),
            VotingError::NotFound("p1".to_string())
        );
    }

    #[test]
    fn test_ids_in_scope() {
        let store = PollStore::new();
        store.insert(poll("b", "g1")).unwrap();
        store.insert(poll("a", "g1")).unwrap();
        store.insert(poll("c", "g2")).unwrap();

        assert_eq!(store.ids_in_scope("g1"), vec!["a", "b"]);
        assert!(store.ids_in_scope("g3").is_empty());
    }
}
