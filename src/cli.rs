#![warn(clippy::all, clippy::pedantic)]

use clap::{Parser, Subcommand};

/// Cleans your zsh history: drops duplicates, failed typos with a
/// successful sibling, and (optionally) rare variants of common
/// commands. Without a subcommand, runs a clean.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Similarity threshold, 0.0-1.0 (default 0.8, or
    /// ZSH_CLEAN_HISTORY_SIMILARITY)
    #[arg(long, value_parser = parse_similarity)]
    pub similarity: Option<f64>,

    /// Max occurrences for a command to count as rare (default 3, or
    /// ZSH_CLEAN_HISTORY_RARE_THRESHOLD)
    #[arg(long, value_parser = parse_positive)]
    pub rare_threshold: Option<usize>,

    /// Also remove rare variants of much more common commands
    #[arg(long)]
    pub remove_rare: bool,

    /// Report what would be removed without touching the history file
    #[arg(long)]
    pub dry_run: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze the history without modifying anything
    Stats {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show resolved paths, thresholds, and shell integration state
    Info,
    /// Install the zsh shell integration
    Install,
    /// Uninstall the zsh shell integration
    Uninstall,
}

fn parse_similarity(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (0.0..=1.0).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!(
            "similarity must be between 0.0 and 1.0, got {parsed}"
        ))
    }
}

fn parse_positive(value: &str) -> Result<usize, String> {
    let parsed: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a positive integer"))?;
    if parsed == 0 {
        Err("rare threshold must be at least 1".to_string())
    } else {
        Ok(parsed)
    }
}
