//! Polling Module
//!
//! Scoped polls for chat channels: one vote per user, owner-only evaluation,
//! and removal of evaluated polls after a grace period.

pub mod engine;
pub mod error;
pub mod expiry;
pub mod poll;
pub mod store;

pub use engine::{VotingService, VotingSettings};
pub use error::VotingError;
pub use expiry::{
    ExpiryHandle, ExpiryOutcome, ExpiryScheduler, Timer, TokioTimer, DEFAULT_EXPIRY_DELAY,
};
pub use poll::{
    AnswerResult, EvaluationSummary, Poll, PollDescription, PollKey, PollView, Tally, MAX_ID_LEN,
    MIN_ANSWERS,
};
pub use store::PollStore;
