#![warn(clippy::all, clippy::pedantic)]

//! Library behind the `clean_history` binary: parsing of the zsh
//! extended history format and its exit-code side-file, similarity-based
//! classification of likely typos, and the backup-then-rewrite pass that
//! applies the result.

pub mod cleaner;
pub mod cli;
pub mod display;
pub mod exits;
pub mod history;
pub mod shell;
pub mod similarity;

#[cfg(test)]
mod tests;

pub use cleaner::{
    BACKUP_SUFFIX, CleanOutcome, CleanPlan, CleanStats, DEFAULT_RARE_THRESHOLD,
    DEFAULT_SIMILARITY_THRESHOLD, RemovalReason, Settings, base_command, plan, run,
};
pub use exits::ExitLog;
pub use history::{HistoryEntry, HistoryFile};
