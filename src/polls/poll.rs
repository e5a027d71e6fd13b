//! Poll entity
//!
//! A single vote: its identity, fixed answer set, the votes cast so far and
//! whether it is still accepting votes.

use super::error::VotingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Maximum poll ID length in characters
pub const MAX_ID_LEN: usize = 4;

/// Minimum number of answers a poll must offer
pub const MIN_ANSWERS: usize = 2;

/// Unique key of a stored poll: the short ID plus the scope it was created in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PollKey {
    /// Short poll ID (1-4 characters)
    pub id: String,
    /// Originating context, e.g. a guild ID
    pub scope: String,
}

impl PollKey {
    /// Create a new poll key
    pub fn new(id: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scope: scope.into(),
        }
    }
}

impl fmt::Display for PollKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.scope)
    }
}

/// A poll and its votes
#[derive(Debug, Clone, Serialize)]
pub struct Poll {
    key: PollKey,
    owner: String,
    question: String,
    answers: Vec<String>,
    /// voter ID -> answer index
    votes: HashMap<String, usize>,
    active: bool,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluated_at: Option<DateTime<Utc>>,
}

impl Poll {
    /// Create an active poll with no votes.
    ///
    /// Callers are expected to have validated the ID and answer count; see
    /// [`Poll::validate`].
    pub fn new(
        key: PollKey,
        owner: impl Into<String>,
        question: impl Into<String>,
        answers: Vec<String>,
    ) -> Self {
        Self {
            key,
            owner: owner.into(),
            question: question.into(),
            answers,
            votes: HashMap::new(),
            active: true,
            created_at: Utc::now(),
            evaluated_at: None,
        }
    }

    /// Check the creation constraints on an ID and an answer set
    pub fn validate(id: &str, answers: &[String]) -> Result<(), VotingError> {
        let len = id.chars().count();
        if len == 0 || len > MAX_ID_LEN {
            return Err(VotingError::InvalidId(id.to_string()));
        }
        if answers.len() < MIN_ANSWERS {
            return Err(VotingError::InsufficientAnswers(answers.len()));
        }
        Ok(())
    }

    pub fn key(&self) -> &PollKey {
        &self.key
    }

    pub fn id(&self) -> &str {
        &self.key.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn evaluated_at(&self) -> Option<DateTime<Utc>> {
        self.evaluated_at
    }

    /// The answer index a voter picked, if they voted
    pub fn vote_of(&self, voter: &str) -> Option<usize> {
        self.votes.get(voter).copied()
    }

    /// Record a vote.
    ///
    /// A repeated voter is reported before the poll state or the answer index
    /// are looked at.
    pub fn cast_vote(&mut self, voter: &str, answer: usize) -> Result<(), VotingError> {
        if self.votes.contains_key(voter) {
            return Err(VotingError::AlreadyVoted);
        }
        if !self.active {
            return Err(VotingError::PollInactive);
        }
        if answer >= self.answers.len() {
            return Err(VotingError::InvalidAnswer(answer));
        }
        self.votes.insert(voter.to_string(), answer);
        Ok(())
    }

    /// Count votes per answer
    pub fn tally(&self) -> Tally {
        let mut counts = vec![0u32; self.answers.len()];
        for &answer in self.votes.values() {
            if let Some(count) = counts.get_mut(answer) {
                *count += 1;
            }
        }
        let total = counts.iter().sum();
        Tally { counts, total }
    }

    /// Close the poll and return its results. Can only succeed once.
    pub fn evaluate(&mut self) -> Result<EvaluationSummary, VotingError> {
        if !self.active {
            return Err(VotingError::AlreadyEvaluated);
        }
        self.active = false;
        self.evaluated_at = Some(Utc::now());
        Ok(self.summary())
    }

    /// Results ordered by vote count, most votes first
    pub fn summary(&self) -> EvaluationSummary {
        let tally = self.tally();
        let mut results: Vec<AnswerResult> = self
            .answers
            .iter()
            .zip(&tally.counts)
            .map(|(answer, &votes)| AnswerResult {
                answer: answer.clone(),
                votes,
                percentage: percentage(votes, tally.total),
            })
            .collect();
        // Stable: equal counts keep their original answer order.
        results.sort_by(|a, b| b.votes.cmp(&a.votes));

        EvaluationSummary {
            id: self.key.id.clone(),
            question: self.question.clone(),
            total_votes: tally.total,
            results,
            evaluated_at: self.evaluated_at,
        }
    }

    /// Describe the poll for display. Evaluated polls show their results.
    pub fn describe(&self, command_prefix: &str) -> PollView {
        if !self.active {
            return PollView::Evaluated(self.summary());
        }
        PollView::Description(PollDescription {
            id: self.key.id.clone(),
            owner: self.owner.clone(),
            question: self.question.clone(),
            answers: self.answers.iter().cloned().enumerate().collect(),
            instructions: format!(
                "To vote, type {}vote {} <answer>",
                command_prefix, self.key.id
            ),
        })
    }
}

/// Two-decimal percentage of `count` in `total`; zero when nobody voted
fn percentage(count: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// Vote counts per answer index
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    /// Count for each answer, indexed like the poll's answers
    pub counts: Vec<u32>,
    /// Number of votes cast
    pub total: u32,
}

impl Tally {
    pub fn count(&self, answer: usize) -> u32 {
        self.counts.get(answer).copied().unwrap_or(0)
    }
}

/// One answer's share of an evaluated poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub votes: u32,
    /// Percent of all votes, rounded to two decimals
    pub percentage: f64,
}

/// Results of an evaluated poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub id: String,
    pub question: String,
    pub total_votes: u32,
    /// Answers sorted by votes, descending
    pub results: Vec<AnswerResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluated_at: Option<DateTime<Utc>>,
}

impl EvaluationSummary {
    /// `(answer, percentage)` pairs in result order
    pub fn percentages(&self) -> Vec<(&str, f64)> {
        self.results
            .iter()
            .map(|r| (r.answer.as_str(), r.percentage))
            .collect()
    }
}

/// What an open poll looks like to voters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDescription {
    pub id: String,
    pub owner: String,
    pub question: String,
    /// `(index, answer)` pairs; the index is what voters send
    pub answers: Vec<(usize, String)>,
    pub instructions: String,
}

/// Result of describing a poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PollView {
    /// The poll is still open
    Description(PollDescription),
    /// The poll was evaluated; these are its results
    Evaluated(EvaluationSummary),
}
