//! Voting service
//!
//! The operations the command layer calls with already-parsed arguments:
//! create, vote, evaluate, describe, delete. Every mutation runs inside the
//! store's lock, so duplicate IDs and double votes cannot race. Scheduling and
//! cancelling expiry happen under the same lock as the change they follow.

use super::error::VotingError;
use super::expiry::{ExpiryScheduler, Timer, TokioTimer, DEFAULT_EXPIRY_DELAY};
use super::poll::{EvaluationSummary, Poll, PollKey, PollView};
use super::store::PollStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Tunables for the voting service
#[derive(Debug, Clone)]
pub struct VotingSettings {
    /// How long an evaluated poll stays readable before it is removed
    pub expiry_delay: Duration,
    /// Prefix shown in voting instructions, e.g. `!`
    pub command_prefix: String,
}

impl Default for VotingSettings {
    fn default() -> Self {
        Self {
            expiry_delay: DEFAULT_EXPIRY_DELAY,
            command_prefix: "!".to_string(),
        }
    }
}

/// Poll operations over a shared store
#[derive(Debug)]
pub struct VotingService {
    store: PollStore,
    expiry: ExpiryScheduler,
    settings: VotingSettings,
}

impl Default for VotingService {
    fn default() -> Self {
        Self::new(VotingSettings::default())
    }
}

impl VotingService {
    /// Create a service with its own store and a Tokio-clocked scheduler
    pub fn new(settings: VotingSettings) -> Self {
        Self::with_timer(settings, Arc::new(TokioTimer))
    }

    /// Create a service whose expiry delays go through `timer`
    pub fn with_timer(settings: VotingSettings, timer: Arc<dyn Timer>) -> Self {
        let store = PollStore::new();
        let expiry = ExpiryScheduler::with_timer(store.clone(), timer);
        Self {
            store,
            expiry,
            settings,
        }
    }

    pub fn store(&self) -> &PollStore {
        &self.store
    }

    pub fn expiry(&self) -> &ExpiryScheduler {
        &self.expiry
    }

    pub fn settings(&self) -> &VotingSettings {
        &self.settings
    }

    /// Create a new active poll
    pub fn create_poll(
        &self,
        owner: &str,
        scope: &str,
        id: &str,
        question: &str,
        answers: Vec<String>,
    ) -> Result<(), VotingError> {
        Poll::validate(id, &answers)?;

        let poll = Poll::new(PollKey::new(id, scope), owner, question, answers);
        self.store.insert(poll)?;

        info!(owner = %owner, poll_id = %id, scope = %scope, "Created poll");
        Ok(())
    }

    /// Record `voter`'s choice of answer `answer`
    pub fn cast_vote(
        &self,
        voter: &str,
        scope: &str,
        id: &str,
        answer: usize,
    ) -> Result<(), VotingError> {
        let key = PollKey::new(id, scope);
        self.store
            .update(&key, |poll| poll.cast_vote(voter, answer))?;

        info!(voter = %voter, poll_id = %id, scope = %scope, answer, "Added vote");
        Ok(())
    }

    /// Close a poll and return its results. Only the owner may evaluate.
    ///
    /// The poll is removed after the configured expiry delay. Without a
    /// runtime to run that removal the poll is left open.
    pub fn evaluate(
        &self,
        requester: &str,
        scope: &str,
        id: &str,
    ) -> Result<EvaluationSummary, VotingError> {
        let key = PollKey::new(id, scope);
        let summary = self.store.update(&key, |poll| {
            ensure_owner(poll, requester)?;
            if !poll.is_active() {
                return Err(VotingError::AlreadyEvaluated);
            }
            let runtime = self.expiry.runtime()?;
            let summary = poll.evaluate()?;
            let delay = self.settings.expiry_delay;
            self.expiry.schedule_on(&runtime, key.clone(), delay);
            Ok(summary)
        })?;

        info!(
            poll_id = %id,
            scope = %scope,
            total_votes = summary.total_votes,
            "Evaluated poll"
        );
        Ok(summary)
    }

    /// Show a poll: its answers while open, its results once evaluated
    pub fn describe_poll(&self, scope: &str, id: &str) -> Result<PollView, VotingError> {
        let poll = self.store.get(&PollKey::new(id, scope))?;
        Ok(poll.describe(&self.settings.command_prefix))
    }

    /// Remove a poll before it expires. Only the owner may delete.
    pub fn delete_poll(&self, requester: &str, scope: &str, id: &str) -> Result<(), VotingError> {
        let key = PollKey::new(id, scope);
        let mut cancelled = false;
        self.store.remove_checked(&key, |poll| {
            ensure_owner(poll, requester)?;
            cancelled = self.expiry.cancel(&key);
            Ok(())
        })?;

        if cancelled {
            debug!(poll_id = %id, scope = %scope, "Dropped pending expiry of deleted poll");
        }
        info!(poll_id = %id, scope = %scope, "Deleted poll");
        Ok(())
    }

    /// IDs of the polls currently stored for `scope`
    pub fn list_polls(&self, scope: &str) -> Vec<String> {
        self.store.ids_in_scope(scope)
    }
}

fn ensure_owner(poll: &Poll, requester: &str) -> Result<(), VotingError> {
    if poll.owner() != requester {
        return Err(VotingError::NotOwner {
            owner: poll.owner().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn answers(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn service_with_poll() -> VotingService {
        let service = VotingService::default();
        service
            .create_poll("alice", "g1", "poll", "Color?", answers(&["Red", "Blue"]))
            .unwrap();
        service
    }

    #[test]
    fn test_create_poll() {
        let service = service_with_poll();
        let poll = service.store().get(&PollKey::new("poll", "g1")).unwrap();
        assert!(poll.is_active());
        assert_eq!(poll.tally().total, 0);
        assert_eq!(poll.owner(), "alice");
    }

    #[test]
    fn test_create_poll_rejections() {
        let service = service_with_poll();

        assert_eq!(
            service.create_poll("alice", "g1", "", "Q?", answers(&["a", "b"])),
            Err(VotingError::InvalidId(String::new()))
        );
        assert_eq!(
            service.create_poll("alice", "g1", "toolong", "Q?", answers(&["a", "b"])),
            Err(VotingError::InvalidId("toolong".to_string()))
        );
        assert_eq!(
            service.create_poll("alice", "g1", "p2", "Q?", answers(&["a"])),
            Err(VotingError::InsufficientAnswers(1))
        );
        assert_eq!(
            service.create_poll("bob", "g1", "poll", "Other?", answers(&["a", "b"])),
            Err(VotingError::DuplicateId("poll".to_string()))
        );

        assert_eq!(service.list_polls("g1"), vec!["poll"]);
        // The duplicate attempt left the original alone
        let poll = service.store().get(&PollKey::new("poll", "g1")).unwrap();
        assert_eq!(poll.question(), "Color?");
    }

    #[test]
    fn test_same_id_in_other_scope() {
        let service = service_with_poll();
        assert_ok!(service.create_poll("bob", "g2", "poll", "Q?", answers(&["a", "b"])));
        assert_eq!(service.store().len(), 2);
    }

    #[test]
    fn test_cast_vote() {
        let service = service_with_poll();
        assert_ok!(service.cast_vote("bob", "g1", "poll", 0));
        assert_ok!(service.cast_vote("carol", "g1", "poll", 1));

        assert_eq!(
            service.cast_vote("bob", "g1", "poll", 1),
            Err(VotingError::AlreadyVoted)
        );
        assert_eq!(
            service.cast_vote("dave", "g1", "poll", 2),
            Err(VotingError::InvalidAnswer(2))
        );
        assert_eq!(
            service.cast_vote("dave", "g2", "poll", 0),
            Err(VotingError::NotFound("poll".to_string()))
        );

        let tally = service.store().get(&PollKey::new("poll", "g1")).unwrap().tally();
        assert_eq!(tally.counts, vec![1, 1]);
    }

    #[tokio::test]
    async fn test_evaluate_owner_only() {
        let service = service_with_poll();
        service.cast_vote("bob", "g1", "poll", 0).unwrap();

        assert_eq!(
            service.evaluate("bob", "g1", "poll"),
            Err(VotingError::NotOwner {
                owner: "alice".to_string()
            })
        );
        let poll = service.store().get(&PollKey::new("poll", "g1")).unwrap();
        assert!(poll.is_active());
        assert_eq!(poll.tally().total, 1);
        assert_eq!(service.expiry().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_evaluate_once_and_schedules_expiry() {
        let service = service_with_poll();
        let key = PollKey::new("poll", "g1");

        let summary = service.evaluate("alice", "g1", "poll").unwrap();
        assert_eq!(summary.id, "poll");
        assert!(service.expiry().is_pending(&key));

        assert_err!(service.evaluate("alice", "g1", "poll"));
        assert_eq!(
            service.evaluate("alice", "g1", "poll"),
            Err(VotingError::AlreadyEvaluated)
        );
        assert_eq!(
            service.cast_vote("bob", "g1", "poll", 0),
            Err(VotingError::PollInactive)
        );
    }

    #[tokio::test]
    async fn test_describe_poll() {
        let service = service_with_poll();
        match service.describe_poll("g1", "poll").unwrap() {
            PollView::Description(desc) => {
                assert_eq!(desc.instructions, "To vote, type !vote poll <answer>");
            }
            other => panic!("expected description, got {:?}", other),
        }

        let summary = service.evaluate("alice", "g1", "poll").unwrap();
        assert_eq!(
            service.describe_poll("g1", "poll").unwrap(),
            PollView::Evaluated(summary)
        );
        assert_eq!(
            service.describe_poll("g1", "nope"),
            Err(VotingError::NotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_custom_command_prefix() {
        let service = VotingService::new(VotingSettings {
            command_prefix: "?".to_string(),
            ..Default::default()
        });
        service
            .create_poll("alice", "g1", "p", "Q?", answers(&["a", "b"]))
            .unwrap();
        match service.describe_poll("g1", "p").unwrap() {
            PollView::Description(desc) => {
                assert_eq!(desc.instructions, "To vote, type ?vote p <answer>")
            }
            other => panic!("expected description, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_poll() {
        let service = service_with_poll();
        let key = PollKey::new("poll", "g1");
        service.evaluate("alice", "g1", "poll").unwrap();

        assert_eq!(
            service.delete_poll("bob", "g1", "poll"),
            Err(VotingError::NotOwner {
                owner: "alice".to_string()
            })
        );
        assert_ok!(service.delete_poll("alice", "g1", "poll"));
        assert!(!service.store().contains(&key));
        assert!(!service.expiry().is_pending(&key));

        // The ID is free again
        assert_ok!(service.create_poll("bob", "g1", "poll", "Q?", answers(&["a", "b"])));
    }

    /// Timer that never waits
    struct ImmediateTimer;

    #[async_trait::async_trait]
    impl Timer for ImmediateTimer {
        async fn sleep(&self, _delay: Duration) {}
    }

    #[tokio::test]
    async fn test_with_timer_drives_expiry() {
        let service =
            VotingService::with_timer(VotingSettings::default(), Arc::new(ImmediateTimer));
        service
            .create_poll("alice", "g1", "poll", "Color?", answers(&["Red", "Blue"]))
            .unwrap();
        service.evaluate("alice", "g1", "poll").unwrap();

        let key = PollKey::new("poll", "g1");
        tokio::time::timeout(Duration::from_secs(5), async {
            while service.store().contains(&key) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(service.expiry().pending_count(), 0);
    }

    #[test]
    fn test_evaluate_without_runtime_is_an_error() {
        let service = service_with_poll();
        assert_eq!(
            service.evaluate("alice", "g1", "poll"),
            Err(VotingError::SchedulerUnavailable)
        );
        // Ownership is still checked first
        assert_eq!(
            service.evaluate("bob", "g1", "poll"),
            Err(VotingError::NotOwner {
                owner: "alice".to_string()
            })
        );
        assert!(service.store().get(&PollKey::new("poll", "g1")).unwrap().is_active());
    }
}
