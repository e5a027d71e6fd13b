//! Reply rendering
//!
//! Turns poll results and failures into chat text.

use crate::polls::{EvaluationSummary, PollDescription, PollView, VotingError};
use std::fmt::Write;
use tracing::warn;

/// Number of cells in a result bar
pub const BAR_WIDTH: usize = 25;

/// Reply used when an error has no user-facing message
pub const GENERIC_APOLOGY: &str = "Sorry, something went wrong while handling that command.";

/// Render the results of an evaluated poll
pub fn render_evaluation(summary: &EvaluationSummary) -> String {
    let mut msg = format!(
        "Hello there. Here is your evaluation on the vote:\n\n[{}] **{}**\n\n",
        summary.id, summary.question
    );
    for result in &summary.results {
        let _ = writeln!(
            msg,
            "{}:\n     `[{}]` {:.2}%",
            result.answer,
            bar(result.percentage),
            result.percentage
        );
    }
    msg
}

/// Render an open poll with its answers and voting instructions
pub fn render_description(desc: &PollDescription) -> String {
    let mut msg = format!(
        "{} created the following voting:\n[{}] **{}**",
        desc.owner, desc.id, desc.question
    );
    for (index, answer) in &desc.answers {
        let _ = write!(msg, "\n[{}] {}", index, answer);
    }
    let _ = write!(msg, "\n\n{}", desc.instructions);
    msg
}

/// Render whatever describing a poll produced
pub fn render_view(view: &PollView) -> String {
    match view {
        PollView::Description(desc) => render_description(desc),
        PollView::Evaluated(summary) => format!(
            "This vote has already been evaluated:\n\n{}",
            render_evaluation(summary)
        ),
    }
}

/// Render a failed command.
///
/// Poll errors become "Oops, ..." replies. Anything else is logged and
/// answered with [`GENERIC_APOLOGY`].
pub fn render_error(err: &(dyn std::error::Error + 'static)) -> String {
    match err.downcast_ref::<VotingError>() {
        Some(err) => format!("Oops, {}", err),
        None => {
            warn!(error = %err, "Unexpected error while handling a poll command");
            GENERIC_APOLOGY.to_string()
        }
    }
}

fn bar(percentage: f64) -> String {
    let filled = ((percentage / 100.0) * BAR_WIDTH as f64) as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("{}{}", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled))
}
