//! Scenario runner
//!
//! Replays a JSON5 list of already-parsed poll operations against a
//! [`VotingService`] and collects the reply each one would post.
//!
//! ```json5
//! {
//!   scope: "guild-1",
//!   steps: [
//!     { op: "create", user: "alice", id: "poll", question: "Color?", answers: ["Red", "Blue"] },
//!     { op: "vote", user: "bob", id: "poll", answer: 0 },
//!     { op: "evaluate", user: "alice", id: "poll" },
//!     { op: "wait", seconds: 301 },
//!     { op: "show", id: "poll" },
//!   ],
//! }
//! ```

use crate::messages::{render_error, render_evaluation, render_view};
use crate::polls::{VotingError, VotingService};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Scenario loading errors
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse scenario {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// A scripted sequence of poll operations in one scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_scope")]
    pub scope: String,
    pub steps: Vec<Step>,
}

fn default_scope() -> String {
    "default".to_string()
}

/// One pre-parsed poll operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Create {
        user: String,
        id: String,
        question: String,
        answers: Vec<String>,
    },
    Vote {
        user: String,
        id: String,
        answer: usize,
    },
    Evaluate {
        user: String,
        id: String,
    },
    Show {
        id: String,
    },
    Delete {
        user: String,
        id: String,
    },
    List,
    Wait {
        seconds: u64,
    },
}

/// Reply produced by one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReply {
    /// Zero-based step index
    pub step: usize,
    pub ok: bool,
    pub text: String,
}

/// Load a scenario file
pub fn load_scenario(path: &Path) -> Result<Scenario, ScenarioError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    json5::from_str(&raw).map_err(|e| ScenarioError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Run every step in order. Failed steps produce an error reply and the run
/// continues.
pub async fn run_scenario(service: &VotingService, scenario: &Scenario) -> Vec<StepReply> {
    let mut replies = Vec::with_capacity(scenario.steps.len());
    for (step, op) in scenario.steps.iter().enumerate() {
        let (ok, text) = match run_step(service, &scenario.scope, op).await {
            Ok(text) => (true, text),
            Err(err) => {
                tracing::debug!(step, kind = err.kind(), "Scenario step failed");
                (false, render_error(&err))
            }
        };
        replies.push(StepReply { step, ok, text });
    }
    replies
}

async fn run_step(service: &VotingService, scope: &str, op: &Step) -> Result<String, VotingError> {
    match op {
        Step::Create {
            user,
            id,
            question,
            answers,
        } => {
            service.create_poll(user, scope, id, question, answers.clone())?;
            Ok(render_view(&service.describe_poll(scope, id)?))
        }
        Step::Vote { user, id, answer } => {
            service.cast_vote(user, scope, id, *answer)?;
            Ok(format!("{} voted on [{}]", user, id))
        }
        Step::Evaluate { user, id } => {
            let summary = service.evaluate(user, scope, id)?;
            Ok(render_evaluation(&summary))
        }
        Step::Show { id } => Ok(render_view(&service.describe_poll(scope, id)?)),
        Step::Delete { user, id } => {
            service.delete_poll(user, scope, id)?;
            Ok(format!("Deleted voting [{}]", id))
        }
        Step::List => {
            let ids = service.list_polls(scope);
            if ids.is_empty() {
                Ok("There are no votings right now".to_string())
            } else {
                Ok(format!("Current votings: {}", ids.join(", ")))
            }
        }
        Step::Wait { seconds } => {
            tokio::time::sleep(Duration::from_secs(*seconds)).await;
            Ok(format!("(waited {}s)", seconds))
        }
    }
}
