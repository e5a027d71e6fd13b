//! votebot library
//!
//! Scoped chat polls: creation with a fixed answer set, one vote per user,
//! owner-only evaluation, and removal of evaluated polls after a grace
//! period. Connecting to a chat platform and parsing command text are left to
//! the caller; this crate takes already-parsed arguments.

pub mod cli;
pub mod config;
pub mod logging;
pub mod messages;
pub mod polls;
