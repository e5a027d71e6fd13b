//! Chat replies for poll commands

pub mod render;

pub use render::{
    render_description, render_error, render_evaluation, render_view, BAR_WIDTH, GENERIC_APOLOGY,
};
