//! Poll error kinds
//!
//! Every failing poll operation returns one of these. The display text is the
//! reply shown to the user after the "Oops, " prefix.

use super::poll::{MAX_ID_LEN, MIN_ANSWERS};

/// Typed failure of a poll operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VotingError {
    #[error("the voting ID must be between 1 and {} characters long, got {:?}", MAX_ID_LEN, .0)]
    InvalidId(String),

    #[error("you have to provide at least {} answers, got {}", MIN_ANSWERS, .0)]
    InsufficientAnswers(usize),

    #[error("a voting with the ID {0} already exists")]
    DuplicateId(String),

    #[error("a voting with the ID {0} does not exist")]
    NotFound(String),

    #[error("you have already voted on this voting")]
    AlreadyVoted,

    #[error("the voting has already been evaluated")]
    PollInactive,

    #[error("[{0}] is not a valid answer to this question")]
    InvalidAnswer(usize),

    #[error("only the author ({owner}) is allowed to do this")]
    NotOwner { owner: String },

    #[error("this vote has already been evaluated")]
    AlreadyEvaluated,

    #[error("votings cannot be evaluated right now, please try again later")]
    SchedulerUnavailable,
}

impl VotingError {
    /// Stable snake_case name of the error kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidId(_) => "invalid_id",
            Self::InsufficientAnswers(_) => "insufficient_answers",
            Self::DuplicateId(_) => "duplicate_id",
            Self::NotFound(_) => "not_found",
            Self::AlreadyVoted => "already_voted",
            Self::PollInactive => "poll_inactive",
            Self::InvalidAnswer(_) => "invalid_answer",
            Self::NotOwner { .. } => "not_owner",
            Self::AlreadyEvaluated => "already_evaluated",
            Self::SchedulerUnavailable => "scheduler_unavailable",
        }
    }
}
